use std::io::{self, Write};
use std::path::{Path, PathBuf};

use bytes::Bytes;
use tokio::time::Instant;
use tracing::info;

use crate::application::api::ApiClient;
use crate::application::error::{ApiError, SaveError};
use crate::domain::build::{ArtifactRef, JobToken};

/// A finished document on the service. Bytes are fetched on demand.
#[derive(Debug, Clone)]
pub struct ArtifactHandle {
    api: ApiClient,
    reference: ArtifactRef,
    template: String,
    job: Option<JobToken>,
}

impl ArtifactHandle {
    pub fn new(
        api: ApiClient,
        reference: ArtifactRef,
        template: impl Into<String>,
        job: Option<JobToken>,
    ) -> Self {
        Self {
            api,
            reference,
            template: template.into(),
            job,
        }
    }

    pub fn url(&self) -> &str {
        &self.reference.url
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    /// Job the artifact came from, when the build went through polling.
    pub fn job(&self) -> Option<&JobToken> {
        self.job.as_ref()
    }

    /// Suggested file name: the one the service reported, else the last URL
    /// segment.
    pub fn filename(&self) -> Option<&str> {
        self.reference.filename.as_deref().or_else(|| {
            self.reference
                .url
                .split(['?', '#'])
                .next()
                .and_then(|path| path.rsplit('/').next())
                .filter(|segment| !segment.is_empty())
        })
    }

    /// Download the document. Every call goes to the service.
    pub async fn fetch_bytes(&self) -> Result<Bytes, ApiError> {
        self.api.fetch_artifact(&self.reference.url).await
    }

    /// Download and write to `path` atomically.
    ///
    /// The bytes land in a sibling temporary file that is renamed over
    /// `path`; on any failure the temporary file is removed and `path` is
    /// left as it was.
    pub async fn save_to(&self, path: impl AsRef<Path>) -> Result<(), SaveError> {
        let started_at = Instant::now();
        let path = path.as_ref().to_path_buf();
        let bytes = self.fetch_bytes().await?;
        let len = bytes.len();

        let target = path.clone();
        tokio::task::spawn_blocking(move || write_atomically(&target, &bytes))
            .await
            .map_err(io::Error::other)
            .and_then(|result| result)
            .map_err(|source| SaveError::Io {
                path: path.clone(),
                source,
            })?;

        info!(
            target = "application::artifact",
            op = "artifact::save_to",
            result = "ok",
            template = %self.template,
            path = %path.display(),
            bytes = len as u64,
            elapsed_ms = started_at.elapsed().as_millis() as u64,
            "artifact saved"
        );
        Ok(())
    }
}

fn write_atomically(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };

    // Dropping the temp file on an early return deletes it.
    let mut tmp = tempfile::Builder::new()
        .prefix(".reportobello-")
        .suffix(".part")
        .tempfile_in(&parent)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|err| err.error)?;
    Ok(())
}
