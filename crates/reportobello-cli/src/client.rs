#![deny(clippy::all, clippy::pedantic)]

use std::path::PathBuf;

use reportobello::Reportobello;
use reportobello::application::api::ApiClient;
use reportobello::application::error::{ApiError, BuildError, SaveError, SyncError};
use reportobello::config::{LoadError, Settings};
use reportobello::domain::error::SchemaError;
use reportobello::infra::error::InfraError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] LoadError),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error(transparent)]
    Sync(#[from] SyncError),
    #[error(transparent)]
    Build(#[from] BuildError),
    #[error(transparent)]
    Save(#[from] SaveError),
    #[error("failed to read input file {path}: {source}")]
    InputFile {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to write {path}: {source}")]
    OutputFile {
        path: String,
        source: std::io::Error,
    },
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("failed to render output: {0}")]
    Render(String),
}

impl CliError {
    pub fn input_file(path: &std::path::Path, source: std::io::Error) -> Self {
        Self::InputFile {
            path: path.display().to_string(),
            source,
        }
    }

    pub fn output_file(path: &std::path::Path, source: std::io::Error) -> Self {
        Self::OutputFile {
            path: path.display().to_string(),
            source,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Ctx {
    pub client: Reportobello,
}

impl Ctx {
    /// Context against an arbitrary host with an explicit polling schedule.
    #[cfg(test)]
    pub fn new(
        host: &str,
        key: impl Into<String>,
        policy: reportobello::application::build::PollPolicy,
    ) -> Result<Self, CliError> {
        use std::sync::Arc;
        use std::time::Duration;

        use reportobello::infra::transport::HttpTransport;
        use url::Url;

        let base = Url::parse(host)
            .map_err(|e| CliError::InvalidInput(format!("invalid host `{host}`: {e}")))?;
        let transport = HttpTransport::new(&base, Duration::from_secs(5))?;
        Ok(Self {
            client: Reportobello::new(Arc::new(transport), key, policy),
        })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, CliError> {
        Ok(Self {
            client: Reportobello::from_settings(settings)?,
        })
    }

    pub fn api(&self) -> &ApiClient {
        self.client.api()
    }
}

/// Default destination for `pull`.
pub fn default_template_path(template: &str) -> PathBuf {
    PathBuf::from(format!("{template}.typ"))
}
