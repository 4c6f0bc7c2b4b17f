#![deny(clippy::all, clippy::pedantic)]

use std::path::{Path, PathBuf};

use reportobello::application::error::ApiError;
use reportobello::domain::template::Template;

use crate::args::ListFormat;
use crate::client::{CliError, Ctx, default_template_path};
use crate::io::{read_data_files, read_schema};
use crate::print::{print_json, templates_json, templates_table};

pub async fn ls(
    ctx: &Ctx,
    template: Option<&str>,
    show_content: bool,
    format: ListFormat,
) -> Result<(), CliError> {
    let records = match template {
        None => ctx.api().list_templates().await?,
        Some(name) => ctx.api().template_versions(name).await?,
    };

    match format {
        ListFormat::Json => print_json(&templates_json(&records, show_content)?),
        ListFormat::Pretty => {
            print!("{}", templates_table(&records, show_content));
            Ok(())
        }
    }
}

pub async fn push(
    ctx: &Ctx,
    file: PathBuf,
    template: Option<String>,
    schema: Option<&Path>,
    data_files: &[PathBuf],
) -> Result<(), CliError> {
    let name = match template {
        Some(name) => name,
        None => name_from_path(&file)?,
    };
    let mut builder = Template::builder(name).file(file);
    if let Some(schema) = schema {
        builder = builder.variables(read_schema(schema)?);
    }
    let template = builder.build()?;
    let uploads = read_data_files(data_files)?;

    let outcome = ctx.client.ensure_remote(&template).await?;
    let record = outcome.record();
    println!(
        "{} {} (version {})",
        outcome.label(),
        record.name,
        record.version
    );

    if !uploads.is_empty() {
        let count = uploads.len();
        ctx.api()
            .upload_data_files(template.name(), uploads)
            .await?;
        println!("uploaded {count} data file(s)");
    }
    Ok(())
}

pub async fn pull(ctx: &Ctx, template: &str, file: Option<PathBuf>) -> Result<(), CliError> {
    let record = ctx
        .api()
        .lookup_template(template)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("template `{template}`")))?;

    let path = file.unwrap_or_else(|| default_template_path(template));
    tokio::fs::write(&path, record.content.as_bytes())
        .await
        .map_err(|e| CliError::output_file(&path, e))?;
    println!("{}", path.display());
    Ok(())
}

pub async fn rm(ctx: &Ctx, template: &str) -> Result<(), CliError> {
    ctx.api().delete_template(template).await?;
    println!("deleted {template}");
    Ok(())
}

fn name_from_path(path: &Path) -> Result<String, CliError> {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .filter(|stem| !stem.is_empty())
        .map(str::to_string)
        .ok_or_else(|| {
            CliError::InvalidInput(format!(
                "cannot derive a template name from {}",
                path.display()
            ))
        })
}
