use std::path::PathBuf;

use thiserror::Error;

/// A malformed local template definition. Never sent over the wire.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("template name must not be empty")]
    EmptyName,
    #[error("template `{name}` sets both inline content and a file source")]
    ConflictingSource { name: String },
    #[error("template `{name}` needs either inline content or a file source")]
    MissingSource { name: String },
    #[error("template `{name}` resolved to empty content")]
    EmptyContent { name: String },
    #[error("failed to read template file {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid variable `{variable}`: {message}")]
    Variable { variable: String, message: String },
}

impl SchemaError {
    pub fn variable(variable: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Variable {
            variable: variable.into(),
            message: message.into(),
        }
    }
}
