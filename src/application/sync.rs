//! Keep the remote copy of a template in step with the local definition.

use metrics::counter;
use reportobello_api_types::TemplateRecord;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::application::api::ApiClient;
use crate::application::error::SyncError;
use crate::domain::fingerprint::{Fingerprint, fingerprint};
use crate::domain::schema::VariableSchema;
use crate::domain::template::Template;

const METRIC_SYNC_TOTAL: &str = "reportobello_sync_total";

/// What `ensure_remote` had to do.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncOutcome {
    Created(TemplateRecord),
    Updated(TemplateRecord),
    Unchanged(TemplateRecord),
}

impl SyncOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            SyncOutcome::Created(_) => "created",
            SyncOutcome::Updated(_) => "updated",
            SyncOutcome::Unchanged(_) => "unchanged",
        }
    }

    pub fn record(&self) -> &TemplateRecord {
        match self {
            SyncOutcome::Created(record)
            | SyncOutcome::Updated(record)
            | SyncOutcome::Unchanged(record) => record,
        }
    }

    pub fn into_record(self) -> TemplateRecord {
        match self {
            SyncOutcome::Created(record)
            | SyncOutcome::Updated(record)
            | SyncOutcome::Unchanged(record) => record,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SyncEngine {
    api: ApiClient,
}

impl SyncEngine {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// Make the service hold exactly the local definition.
    ///
    /// At most one lookup and one mutating call. Nothing is retried.
    pub async fn ensure_remote(&self, template: &Template) -> Result<SyncOutcome, SyncError> {
        let started_at = Instant::now();

        template.validate()?;
        let resolved = template.resolve().await?;
        let local = resolved.fingerprint();

        let outcome = match self.api.lookup_template(&resolved.name).await? {
            None => SyncOutcome::Created(self.api.create_template(&resolved).await?),
            Some(remote) => {
                let remote_fp = remote_fingerprint(&remote);
                debug!(
                    target = "application::sync",
                    op = "sync::compare",
                    template = %resolved.name,
                    local = %local,
                    remote = %remote_fp,
                    remote_version = remote.version,
                    "comparing fingerprints"
                );
                if remote_fp == local {
                    SyncOutcome::Unchanged(remote)
                } else {
                    SyncOutcome::Updated(self.api.update_template(&resolved).await?)
                }
            }
        };

        counter!(METRIC_SYNC_TOTAL, "outcome" => outcome.label()).increment(1);
        info!(
            target = "application::sync",
            op = "sync::ensure_remote",
            result = outcome.label(),
            template = %resolved.name,
            version = outcome.record().version,
            elapsed_ms = started_at.elapsed().as_millis() as u64,
            "template synced"
        );

        Ok(outcome)
    }
}

/// Prefer the digest the service echoes back; recompute when it is absent.
fn remote_fingerprint(record: &TemplateRecord) -> Fingerprint {
    match record.fingerprint.as_deref() {
        Some(echoed) if !echoed.trim().is_empty() => Fingerprint::from_remote(echoed),
        _ => fingerprint(
            &record.content,
            &VariableSchema::from(record.variables.clone()),
        ),
    }
}
