use std::path::PathBuf;

use clap::{Args, builder::BoolishValueParser};

/// Flags that override file and environment configuration.
#[derive(Debug, Args, Default, Clone)]
pub struct ConfigArgs {
    /// Optional path to a configuration file.
    #[arg(
        long = "config-file",
        env = "REPORTOBELLO_CONFIG_FILE",
        value_name = "PATH",
        global = true
    )]
    pub config_file: Option<PathBuf>,

    /// Service host, e.g. <https://reportobello.com>.
    #[arg(long = "host", value_name = "URL", global = true)]
    pub host: Option<String>,

    /// Path to a file containing the API key (takes precedence over env).
    #[arg(
        long = "api-key-file",
        env = "REPORTOBELLO_API_KEY_FILE",
        value_name = "PATH",
        global = true
    )]
    pub api_key_file: Option<PathBuf>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new(),
        global = true
    )]
    pub log_json: Option<bool>,

    /// Override how long a build may take before giving up.
    #[arg(long = "timeout-seconds", value_name = "SECONDS", global = true)]
    pub timeout_seconds: Option<u64>,
}
