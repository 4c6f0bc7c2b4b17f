//! Command-line surface for `reportobello`.

#![deny(clippy::all, clippy::pedantic)]

use std::fmt;
use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use reportobello::config::ConfigArgs;
use reportobello::domain::build::OutputFormat;

#[derive(Parser, Debug)]
#[command(
    name = "reportobello",
    version,
    about = "Push templates to Reportobello and build reports",
    long_about = None
)]
pub struct Cli {
    #[command(flatten)]
    pub config: ConfigArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List templates, or every version of one template
    Ls {
        template: Option<String>,
        /// Include the template content
        #[arg(short = 'a', long = "all", default_value_t = false)]
        all: bool,
        #[arg(long, default_value_t = ListFormat::Pretty)]
        format: ListFormat,
    },
    /// Upload a template file (created or updated only when it changed)
    Push {
        file: PathBuf,
        /// Template name; defaults to the file stem
        template: Option<String>,
        /// JSON object describing the template variables
        #[arg(long)]
        schema: Option<PathBuf>,
        /// Data file the template reads at build time (repeatable)
        #[arg(long = "file", value_name = "PATH")]
        files: Vec<PathBuf>,
    },
    /// Download the latest version of a template
    Pull {
        template: String,
        /// Destination; defaults to `<template>.typ`
        file: Option<PathBuf>,
    },
    /// Delete a template
    Rm { template: String },
    /// Build a report and save or print its location
    Build {
        template: String,
        /// Variable as `key=value`; values that parse as JSON are sent as JSON
        #[arg(long = "var", value_name = "KEY=VALUE")]
        vars: Vec<String>,
        /// JSON object file with variables; `--var` entries override it
        #[arg(long)]
        data: Option<PathBuf>,
        #[arg(long, value_enum)]
        format: Option<DocumentFormat>,
        /// Write the document here instead of printing its URL
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },
    /// Keep waiting on a build that timed out
    Resume {
        job: String,
        #[arg(long)]
        template: String,
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },
    /// Show recent builds of a template
    Recent {
        template: String,
        /// Only builds started before this RFC 3339 timestamp
        #[arg(long)]
        before: Option<String>,
        #[arg(long, default_value_t = ListFormat::Pretty)]
        format: ListFormat,
    },
    /// Environment variables available to every template
    Env(EnvArgs),
}

#[derive(Parser, Debug)]
pub struct EnvArgs {
    #[command(subcommand)]
    pub action: EnvCmd,
}

#[derive(Subcommand, Debug)]
pub enum EnvCmd {
    Ls,
    /// Set one or more `KEY=VALUE` pairs
    Set {
        #[arg(required = true, value_name = "KEY=VALUE")]
        pairs: Vec<String>,
    },
    /// Remove variables by key
    Rm {
        #[arg(required = true, value_name = "KEY")]
        keys: Vec<String>,
    },
}

#[derive(Copy, Clone, Debug, Default, ValueEnum, PartialEq, Eq)]
pub enum ListFormat {
    #[default]
    Pretty,
    Json,
}

impl fmt::Display for ListFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ListFormat::Pretty => "pretty",
            ListFormat::Json => "json",
        };
        f.write_str(s)
    }
}

#[derive(Copy, Clone, Debug, ValueEnum, PartialEq, Eq)]
pub enum DocumentFormat {
    Pdf,
    Png,
    Svg,
}

impl From<DocumentFormat> for OutputFormat {
    fn from(value: DocumentFormat) -> Self {
        match value {
            DocumentFormat::Pdf => OutputFormat::Pdf,
            DocumentFormat::Png => OutputFormat::Png,
            DocumentFormat::Svg => OutputFormat::Svg,
        }
    }
}
