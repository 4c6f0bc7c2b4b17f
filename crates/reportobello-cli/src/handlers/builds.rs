#![deny(clippy::all, clippy::pedantic)]

use std::path::{Path, PathBuf};

use reportobello::application::artifact::ArtifactHandle;
use reportobello::application::error::ApiError;
use reportobello::domain::build::{BuildOptions, JobToken, OutputFormat};
use reportobello::domain::template::Template;

use crate::args::ListFormat;
use crate::client::{CliError, Ctx};
use crate::io::{collect_variables, parse_time_opt};
use crate::print::{print_json, reports_table};

/// Build against the latest remote version of `template`.
///
/// The payload is checked against the remote schema before submitting.
pub async fn build(
    ctx: &Ctx,
    template: &str,
    vars: &[String],
    data: Option<&Path>,
    format: Option<OutputFormat>,
    output: Option<PathBuf>,
) -> Result<(), CliError> {
    let record = ctx
        .api()
        .lookup_template(template)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("template `{template}`")))?;
    let template = Template::from_record(record)?;
    let variables = collect_variables(data, vars)?;

    let mut options = BuildOptions::default();
    if let Some(format) = format {
        options = options.with_format(format);
    }

    let handle = ctx.client.build(&template, variables, options).await?;
    deliver(&handle, output).await
}

pub async fn resume(
    ctx: &Ctx,
    job: String,
    template: &str,
    output: Option<PathBuf>,
) -> Result<(), CliError> {
    let handle = ctx
        .client
        .builds()
        .resume(template, JobToken::new(job), None)
        .await?;
    deliver(&handle, output).await
}

pub async fn recent(
    ctx: &Ctx,
    template: &str,
    before: Option<&str>,
    format: ListFormat,
) -> Result<(), CliError> {
    let before = parse_time_opt(before)?;
    let records = ctx.api().recent_builds(template, before).await?;
    match format {
        ListFormat::Json => print_json(&records),
        ListFormat::Pretty => {
            print!("{}", reports_table(&records));
            Ok(())
        }
    }
}

async fn deliver(handle: &ArtifactHandle, output: Option<PathBuf>) -> Result<(), CliError> {
    match output {
        Some(path) => {
            handle.save_to(&path).await?;
            println!("{}", path.display());
        }
        None => println!("{}", handle.url()),
    }
    Ok(())
}
