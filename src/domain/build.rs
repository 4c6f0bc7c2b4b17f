//! Build requests and the states a build moves through.

use std::fmt;
use std::time::Duration;

use reportobello_api_types::BuildStatusResponse;
use serde_json::{Map, Value};

/// Opaque identifier of an in-progress build.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JobToken(String);

impl JobToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Pdf,
    Png,
    Svg,
}

impl OutputFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            OutputFormat::Pdf => "pdf",
            OutputFormat::Png => "png",
            OutputFormat::Svg => "svg",
        }
    }
}

/// Per-build knobs. `timeout` overrides the orchestrator's polling budget.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BuildOptions {
    pub format: Option<OutputFormat>,
    pub options: Map<String, Value>,
    pub timeout: Option<Duration>,
}

impl BuildOptions {
    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = Some(format);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_option(mut self, key: impl Into<String>, value: Value) -> Self {
        self.options.insert(key.into(), value);
        self
    }
}

/// Where a finished document can be fetched from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactRef {
    pub url: String,
    pub filename: Option<String>,
    pub content_type: Option<String>,
}

impl ArtifactRef {
    pub fn from_url(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            filename: None,
            content_type: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildResult {
    Pending {
        job: JobToken,
        retry_after: Option<Duration>,
    },
    Ready(ArtifactRef),
    ValidationError(String),
    RenderError(String),
}

impl From<BuildStatusResponse> for BuildResult {
    fn from(response: BuildStatusResponse) -> Self {
        match response {
            BuildStatusResponse::Pending {
                job,
                retry_after_ms,
            } => BuildResult::Pending {
                job: JobToken::new(job),
                retry_after: retry_after_ms.map(Duration::from_millis),
            },
            BuildStatusResponse::Ready {
                url,
                filename,
                content_type,
            } => BuildResult::Ready(ArtifactRef {
                url,
                filename,
                content_type,
            }),
            BuildStatusResponse::ValidationError { message } => {
                BuildResult::ValidationError(message)
            }
            BuildStatusResponse::RenderError { message } => BuildResult::RenderError(message),
        }
    }
}
