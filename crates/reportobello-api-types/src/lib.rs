//! Wire shapes exchanged with the Reportobello HTTP API.
//!
//! These types carry no behaviour beyond serde; validation and comparison
//! live in the `reportobello` crate.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use time::OffsetDateTime;

/// Content type sent with build payloads.
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Declared shape of a template variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariableKind {
    String,
    Number,
    Integer,
    Boolean,
    Array,
    Object,
    Any,
}

impl VariableKind {
    pub fn as_str(self) -> &'static str {
        match self {
            VariableKind::String => "string",
            VariableKind::Number => "number",
            VariableKind::Integer => "integer",
            VariableKind::Boolean => "boolean",
            VariableKind::Array => "array",
            VariableKind::Object => "object",
            VariableKind::Any => "any",
        }
    }
}

impl TryFrom<&str> for VariableKind {
    type Error = ();

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "string" | "str" => Ok(VariableKind::String),
            "number" | "float" => Ok(VariableKind::Number),
            "integer" | "int" => Ok(VariableKind::Integer),
            "boolean" | "bool" => Ok(VariableKind::Boolean),
            "array" | "list" => Ok(VariableKind::Array),
            "object" | "map" => Ok(VariableKind::Object),
            "any" => Ok(VariableKind::Any),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableDefinition {
    pub kind: VariableKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

/// Variable name → definition, in declaration order.
pub type VariableMap = IndexMap<String, VariableDefinition>;

/// One stored version of a template as reported by the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateRecord {
    pub name: String,
    #[serde(rename = "template", default)]
    pub content: String,
    #[serde(default)]
    pub version: i64,
    #[serde(default)]
    pub variables: VariableMap,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
}

/// Body of the create and update template calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpsertTemplateRequest {
    pub template: String,
    #[serde(default)]
    pub variables: VariableMap,
    pub fingerprint: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildRequestBody {
    pub data: Map<String, Value>,
    pub content_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub options: Map<String, Value>,
}

/// Build state returned by both the submit and the poll endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BuildStatusResponse {
    Pending {
        job: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        retry_after_ms: Option<u64>,
    },
    Ready {
        url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        filename: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        content_type: Option<String>,
    },
    ValidationError {
        message: String,
    },
    RenderError {
        message: String,
    },
}

/// A past build of a template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRecord {
    pub filename: Option<String>,
    pub requested_version: i64,
    pub actual_version: i64,
    pub template_name: String,
    #[serde(with = "time::serde::rfc3339")]
    pub started_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub finished_at: OffsetDateTime,
    #[serde(default)]
    pub error_message: Option<String>,
}

impl ReportRecord {
    pub fn was_successful(&self) -> bool {
        self.error_message.is_none()
    }
}
