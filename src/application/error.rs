use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::domain::build::JobToken;
use crate::domain::error::SchemaError;
use crate::domain::schema::InputError;
use crate::infra::transport::TransportError;

/// Failures talking to the service.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
    #[error("service rejected the request: {0}")]
    Rejected(String),
    #[error("{0} was not found")]
    NotFound(String),
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("payload too large: {0}")]
    TooLarge(String),
    #[error("server error (status {status}): {message}")]
    Server { status: u16, message: String },
    #[error("unexpected response from service: {0}")]
    Protocol(String),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl ApiError {
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol(message.into())
    }

    pub fn rejected(details: impl Into<String>) -> Self {
        Self::Rejected(details.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }
}

#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error(transparent)]
    Api(#[from] ApiError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionKind {
    Validation,
    Render,
}

/// Diagnostic returned by the service for a build it refused or failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub kind: RejectionKind,
    pub template: String,
    pub details: String,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            RejectionKind::Validation => write!(
                f,
                "template `{}` rejected the build input: {}",
                self.template, self.details
            ),
            RejectionKind::Render => write!(
                f,
                "template `{}` failed to render: {}",
                self.template, self.details
            ),
        }
    }
}

#[derive(Debug, Error)]
pub enum BuildError {
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error("invalid build input: {0}")]
    InvalidInput(#[from] InputError),
    #[error("{0}")]
    Rejected(Rejection),
    #[error("build job `{job}` still pending after {}ms", .elapsed.as_millis())]
    Timeout { job: JobToken, elapsed: Duration },
    #[error(transparent)]
    Api(#[from] ApiError),
}

#[derive(Debug, Error)]
pub enum SaveError {
    #[error("failed to fetch artifact: {0}")]
    Fetch(#[from] ApiError),
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
