//! Variable schemas and local payload validation.

use std::fmt;

use reportobello_api_types::{VariableDefinition, VariableKind, VariableMap};
use serde_json::{Map, Value};
use thiserror::Error;

use super::error::SchemaError;

/// Ordered declaration of the variables a template expects.
///
/// A variable without a default is required in every build payload.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VariableSchema {
    variables: VariableMap,
}

impl VariableSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a required variable.
    pub fn with(mut self, name: impl Into<String>, kind: VariableKind) -> Self {
        self.variables
            .insert(name.into(), VariableDefinition { kind, default: None });
        self
    }

    /// Declare an optional variable with a fallback value.
    pub fn with_default(
        mut self,
        name: impl Into<String>,
        kind: VariableKind,
        default: Value,
    ) -> Self {
        self.variables.insert(
            name.into(),
            VariableDefinition {
                kind,
                default: Some(default),
            },
        );
        self
    }

    pub fn get(&self, name: &str) -> Option<&VariableDefinition> {
        self.variables.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &VariableDefinition)> {
        self.variables.iter()
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    pub fn as_map(&self) -> &VariableMap {
        &self.variables
    }

    pub fn into_map(self) -> VariableMap {
        self.variables
    }

    /// Check names and defaults of every declaration.
    pub fn validate(&self) -> Result<(), SchemaError> {
        for (name, definition) in &self.variables {
            if name.trim().is_empty() {
                return Err(SchemaError::variable(name, "name must not be empty"));
            }
            if let Some(default) = &definition.default {
                if !kind_matches(definition.kind, default) {
                    return Err(SchemaError::variable(
                        name,
                        format!(
                            "default {} does not match declared kind {}",
                            json_type_name(default),
                            definition.kind.as_str()
                        ),
                    ));
                }
            }
        }
        Ok(())
    }

    /// Validate a build payload and return it with defaults filled in.
    ///
    /// Every violation is collected. Keys the schema does not declare are
    /// passed through untouched.
    pub fn check(&self, values: &Map<String, Value>) -> Result<Map<String, Value>, InputError> {
        let mut violations = Vec::new();
        let mut payload = values.clone();

        for (name, definition) in &self.variables {
            match values.get(name) {
                Some(value) if kind_matches(definition.kind, value) => {}
                Some(value) => violations.push(Violation::Mismatch {
                    name: name.clone(),
                    expected: definition.kind,
                    found: json_type_name(value),
                }),
                None => match &definition.default {
                    Some(default) => {
                        payload.insert(name.clone(), default.clone());
                    }
                    None => violations.push(Violation::Missing { name: name.clone() }),
                },
            }
        }

        if violations.is_empty() {
            Ok(payload)
        } else {
            Err(InputError { violations })
        }
    }
}

impl From<VariableMap> for VariableSchema {
    fn from(variables: VariableMap) -> Self {
        Self { variables }
    }
}

/// A single problem found in a build payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    Missing {
        name: String,
    },
    Mismatch {
        name: String,
        expected: VariableKind,
        found: &'static str,
    },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::Missing { name } => write!(f, "missing required variable `{name}`"),
            Violation::Mismatch {
                name,
                expected,
                found,
            } => write!(
                f,
                "variable `{name}` expects {}, got {found}",
                expected.as_str()
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", render_violations(.violations))]
pub struct InputError {
    pub violations: Vec<Violation>,
}

fn render_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

pub fn kind_matches(kind: VariableKind, value: &Value) -> bool {
    match kind {
        VariableKind::Any => true,
        VariableKind::String => value.is_string(),
        VariableKind::Number => value.is_number(),
        VariableKind::Integer => {
            value.is_i64()
                || value.is_u64()
                || value
                    .as_f64()
                    .is_some_and(|number| number.is_finite() && number.fract() == 0.0)
        }
        VariableKind::Boolean => value.is_boolean(),
        VariableKind::Array => value.is_array(),
        VariableKind::Object => value.is_object(),
    }
}

pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn invoice_schema() -> VariableSchema {
        VariableSchema::new()
            .with("amount", VariableKind::Number)
            .with_default("currency", VariableKind::String, json!("EUR"))
    }

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn fills_defaults_and_keeps_extra_keys() {
        let payload = invoice_schema()
            .check(&object(json!({"amount": 42, "note": "thanks"})))
            .expect("valid payload");

        assert_eq!(payload.get("currency"), Some(&json!("EUR")));
        assert_eq!(payload.get("note"), Some(&json!("thanks")));
    }

    #[test]
    fn reports_every_violation() {
        let schema = invoice_schema().with("customer", VariableKind::Object);
        let err = schema
            .check(&object(json!({"currency": 7})))
            .expect_err("invalid payload");

        assert_eq!(err.violations.len(), 3);
        assert!(err.violations.contains(&Violation::Missing {
            name: "amount".into()
        }));
        assert!(err.to_string().contains("variable `currency` expects string, got number"));
    }

    #[test]
    fn integer_accepts_whole_floats_only() {
        assert!(kind_matches(VariableKind::Integer, &json!(3)));
        assert!(kind_matches(VariableKind::Integer, &json!(3.0)));
        assert!(!kind_matches(VariableKind::Integer, &json!(3.5)));
        assert!(!kind_matches(VariableKind::Integer, &json!("3")));
    }

    #[test]
    fn null_only_matches_any() {
        assert!(kind_matches(VariableKind::Any, &Value::Null));
        assert!(!kind_matches(VariableKind::Object, &Value::Null));
    }

    #[test]
    fn validate_rejects_mistyped_default() {
        let schema = VariableSchema::new().with_default("paid", VariableKind::Boolean, json!("no"));
        assert!(matches!(
            schema.validate(),
            Err(SchemaError::Variable { variable, .. }) if variable == "paid"
        ));
    }
}
