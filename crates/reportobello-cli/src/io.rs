#![deny(clippy::all, clippy::pedantic)]

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use reportobello::domain::schema::VariableSchema;
use reportobello::infra::transport::FilePart;
use reportobello_api_types::{VariableDefinition, VariableKind, VariableMap};
use serde_json::{Map, Value};

use crate::client::CliError;

pub fn read_text(path: &Path) -> Result<String, CliError> {
    fs::read_to_string(path).map_err(|source| CliError::input_file(path, source))
}

/// Load data files for upload, each under its own file name.
pub fn read_data_files(paths: &[PathBuf]) -> Result<Vec<FilePart>, CliError> {
    paths
        .iter()
        .map(|path| {
            let name = path
                .file_name()
                .and_then(|name| name.to_str())
                .ok_or_else(|| {
                    CliError::InvalidInput(format!("{} has no file name", path.display()))
                })?;
            let bytes = fs::read(path).map_err(|source| CliError::input_file(path, source))?;
            Ok(FilePart::new(name, bytes))
        })
        .collect()
}

fn read_json_object(path: &Path) -> Result<Map<String, Value>, CliError> {
    let raw = read_text(path)?;
    match serde_json::from_str::<Value>(&raw) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(CliError::InvalidInput(format!(
            "{} must contain a JSON object",
            path.display()
        ))),
        Err(e) => Err(CliError::InvalidInput(format!(
            "{} is not valid JSON: {e}",
            path.display()
        ))),
    }
}

/// Read a variable schema file.
///
/// Each entry is either a bare kind (`"amount": "number"`) or a definition
/// object (`"currency": {"kind": "string", "default": "EUR"}`).
pub fn read_schema(path: &Path) -> Result<VariableSchema, CliError> {
    let mut variables = VariableMap::new();
    for (name, entry) in read_json_object(path)? {
        let definition = match entry {
            Value::String(kind) => VariableDefinition {
                kind: parse_kind(&name, &kind)?,
                default: None,
            },
            other => serde_json::from_value::<VariableDefinition>(other).map_err(|e| {
                CliError::InvalidInput(format!("variable `{name}` is malformed: {e}"))
            })?,
        };
        variables.insert(name, definition);
    }
    Ok(VariableSchema::from(variables))
}

fn parse_kind(name: &str, kind: &str) -> Result<VariableKind, CliError> {
    VariableKind::try_from(kind)
        .map_err(|()| CliError::InvalidInput(format!("variable `{name}` has unknown kind `{kind}`")))
}

/// Split `KEY=VALUE`. The key must be non-empty; the value may be.
pub fn parse_pair(raw: &str) -> Result<(String, String), CliError> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(CliError::InvalidInput(format!(
            "expected KEY=VALUE, got `{raw}`"
        ))),
    }
}

/// Merge the optional data file with `--var` overrides.
pub fn collect_variables(
    data: Option<&Path>,
    vars: &[String],
) -> Result<Map<String, Value>, CliError> {
    let mut values = match data {
        Some(path) => read_json_object(path)?,
        None => Map::new(),
    };
    for raw in vars {
        let (key, value) = parse_pair(raw)?;
        let value = serde_json::from_str(&value).unwrap_or(Value::String(value));
        values.insert(key, value);
    }
    Ok(values)
}

pub fn parse_env_pairs(pairs: &[String]) -> Result<BTreeMap<String, String>, CliError> {
    pairs.iter().map(|raw| parse_pair(raw)).collect()
}

pub fn parse_time_opt(val: Option<&str>) -> Result<Option<time::OffsetDateTime>, CliError> {
    if let Some(v) = val {
        let parsed = time::OffsetDateTime::parse(v, &time::format_description::well_known::Rfc3339)
            .map_err(|e| CliError::InvalidInput(format!("invalid timestamp `{v}`: {e}")))?;
        Ok(Some(parsed))
    } else {
        Ok(None)
    }
}
