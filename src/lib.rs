//! Client for the Reportobello report-building service.
//!
//! Templates are declared locally, synced to the service by content
//! fingerprint, and built into documents by submitting variable payloads and
//! polling until the build finishes.

pub mod application;
pub mod config;
pub mod domain;
pub mod infra;

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::application::api::ApiClient;
use crate::application::artifact::ArtifactHandle;
use crate::application::build::{BuildOrchestrator, PollPolicy};
use crate::application::error::{BuildError, SyncError};
use crate::application::sync::{SyncEngine, SyncOutcome};
use crate::config::Settings;
use crate::domain::build::BuildOptions;
use crate::domain::template::Template;
use crate::infra::error::InfraError;
use crate::infra::transport::Transport;

/// Sync engine and build orchestrator sharing one credentialed client.
#[derive(Debug, Clone)]
pub struct Reportobello {
    api: ApiClient,
    sync: SyncEngine,
    builds: BuildOrchestrator,
}

impl Reportobello {
    pub fn new(
        transport: Arc<dyn Transport>,
        api_key: impl Into<String>,
        policy: PollPolicy,
    ) -> Self {
        Self::from_client(ApiClient::new(transport, api_key), policy)
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, InfraError> {
        let api = ApiClient::from_settings(&settings.api)?;
        Ok(Self::from_client(api, PollPolicy::from(&settings.polling)))
    }

    fn from_client(api: ApiClient, policy: PollPolicy) -> Self {
        Self {
            sync: SyncEngine::new(api.clone()),
            builds: BuildOrchestrator::new(api.clone(), policy),
            api,
        }
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn builds(&self) -> &BuildOrchestrator {
        &self.builds
    }

    pub async fn ensure_remote(&self, template: &Template) -> Result<SyncOutcome, SyncError> {
        self.sync.ensure_remote(template).await
    }

    pub async fn build(
        &self,
        template: &Template,
        variables: Map<String, Value>,
        options: BuildOptions,
    ) -> Result<ArtifactHandle, BuildError> {
        self.builds.submit(template, variables, options).await
    }
}
