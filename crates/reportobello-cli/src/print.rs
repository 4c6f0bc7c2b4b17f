#![deny(clippy::all, clippy::pedantic)]

use std::collections::BTreeMap;

use reportobello_api_types::{ReportRecord, TemplateRecord};
use serde::Serialize;
use serde_json::Value;
use time::format_description::well_known::Rfc3339;

use crate::client::CliError;

pub fn print_json<T: Serialize>(value: &T) -> Result<(), CliError> {
    let out = serde_json::to_string_pretty(value).map_err(|e| CliError::Render(e.to_string()))?;
    println!("{out}");
    Ok(())
}

/// Records as JSON; content is dropped unless `show_content` is set.
pub fn templates_json(
    records: &[TemplateRecord],
    show_content: bool,
) -> Result<Vec<Value>, CliError> {
    records
        .iter()
        .map(|record| {
            let mut value =
                serde_json::to_value(record).map_err(|e| CliError::Render(e.to_string()))?;
            if let Some(map) = value.as_object_mut().filter(|_| !show_content) {
                map.remove("template");
            }
            Ok(value)
        })
        .collect()
}

pub fn templates_table(records: &[TemplateRecord], show_content: bool) -> String {
    let width = records
        .iter()
        .map(|record| record.name.len())
        .max()
        .unwrap_or(0)
        .max("NAME".len());

    let mut out = format!("{:<width$}  VERSION  VARIABLES\n", "NAME");
    for record in records {
        let variables = record
            .variables
            .iter()
            .map(|(name, def)| format!("{name}:{}", def.kind.as_str()))
            .collect::<Vec<_>>()
            .join(", ");
        out.push_str(&format!(
            "{:<width$}  {:>7}  {}\n",
            record.name, record.version, variables
        ));
        if show_content {
            for line in record.content.lines() {
                out.push_str("    ");
                out.push_str(line);
                out.push('\n');
            }
        }
    }
    out
}

pub fn reports_table(records: &[ReportRecord]) -> String {
    let mut out = String::from("STARTED                    VERSION  STATUS  FILE\n");
    for record in records {
        let started = record
            .started_at
            .format(&Rfc3339)
            .unwrap_or_else(|_| record.started_at.to_string());
        let (status, detail) = if record.was_successful() {
            ("ok", record.filename.as_deref().unwrap_or("-"))
        } else {
            ("failed", record.error_message.as_deref().unwrap_or("-"))
        };
        out.push_str(&format!(
            "{started:<25}  {:>7}  {status:<6}  {detail}\n",
            record.actual_version
        ));
    }
    out
}

pub fn env_lines(vars: &BTreeMap<String, String>) -> String {
    vars.iter().map(|(key, value)| format!("{key}={value}\n")).collect()
}
