//! Content fingerprints used to decide whether a remote template is stale.

use std::collections::BTreeMap;
use std::fmt;

use serde_json::Value;
use sha2::{Digest, Sha256};

use super::schema::VariableSchema;

const PREFIX: &str = "sha256:";

/// SHA-256 digest over template content and its variable schema.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Accept a fingerprint echoed by the service. Values in another format
    /// are kept verbatim and simply never compare equal to a local digest.
    pub fn from_remote(value: impl Into<String>) -> Self {
        Self(value.into())
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Fingerprint resolved content plus schema.
///
/// Declaration order of variables does not contribute; names, kinds and
/// defaults do.
pub fn fingerprint(content: &str, variables: &VariableSchema) -> Fingerprint {
    let mut hasher = Sha256::new();
    hasher.update((content.len() as u64).to_le_bytes());
    hasher.update(content.as_bytes());
    hasher.update(canonical_schema(variables).as_bytes());
    Fingerprint(format!("{PREFIX}{}", hex::encode(hasher.finalize())))
}

fn canonical_schema(variables: &VariableSchema) -> String {
    let mut sorted = BTreeMap::new();
    for (name, definition) in variables.iter() {
        let mut entry = serde_json::Map::new();
        entry.insert("kind".into(), Value::String(definition.kind.as_str().into()));
        if let Some(default) = &definition.default {
            entry.insert("default".into(), default.clone());
        }
        sorted.insert(name.as_str(), Value::Object(entry));
    }

    let mut out = String::from("{");
    for (index, (name, entry)) in sorted.into_iter().enumerate() {
        if index > 0 {
            out.push(',');
        }
        out.push_str(&Value::String(name.to_string()).to_string());
        out.push(':');
        write_canonical(&entry, &mut out);
    }
    out.push('}');
    out
}

/// Compact JSON with object keys sorted at every depth.
pub fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Array(items) => {
            out.push('[');
            for (index, item) in items.iter().enumerate() {
                if index > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        Value::Object(map) => {
            let sorted: BTreeMap<&String, &Value> = map.iter().collect();
            out.push('{');
            for (index, (key, item)) in sorted.into_iter().enumerate() {
                if index > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                write_canonical(item, out);
            }
            out.push('}');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}
