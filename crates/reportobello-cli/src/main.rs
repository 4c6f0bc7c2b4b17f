//! reportobello: push templates and build reports from the command line.
#![deny(clippy::all, clippy::pedantic)]

mod args;
mod client;
mod handlers;
mod io;
mod print;


use std::process;

use clap::Parser;
use reportobello::config;
use reportobello::infra::telemetry;

use args::{Cli, Commands};
use client::{CliError, Ctx};
use handlers::{builds, env, templates};

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    if let Err(err) = run(cli).await {
        eprintln!("error: {err}");
        process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let settings = config::load(&cli.config)?;
    telemetry::init(&settings.logging)?;
    let ctx = Ctx::from_settings(&settings)?;

    dispatch(&ctx, cli.command).await
}

async fn dispatch(ctx: &Ctx, command: Commands) -> Result<(), CliError> {
    match command {
        Commands::Ls {
            template,
            all,
            format,
        } => templates::ls(ctx, template.as_deref(), all, format).await,
        Commands::Push {
            file,
            template,
            schema,
            files,
        } => templates::push(ctx, file, template, schema.as_deref(), &files).await,
        Commands::Pull { template, file } => templates::pull(ctx, &template, file).await,
        Commands::Rm { template } => templates::rm(ctx, &template).await,
        Commands::Build {
            template,
            vars,
            data,
            format,
            output,
        } => {
            builds::build(
                ctx,
                &template,
                &vars,
                data.as_deref(),
                format.map(Into::into),
                output,
            )
            .await
        }
        Commands::Resume {
            job,
            template,
            output,
        } => builds::resume(ctx, job, &template, output).await,
        Commands::Recent {
            template,
            before,
            format,
        } => builds::recent(ctx, &template, before.as_deref(), format).await,
        Commands::Env(cmd) => env::handle(ctx, cmd.action).await,
    }
}
