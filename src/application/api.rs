//! Credential-carrying client for the Reportobello HTTP API.
//!
//! Every call goes through [`ApiClient::send`], which attaches the bearer
//! credential and maps the status codes shared by all endpoints. Endpoint
//! methods only interpret what is specific to them.

use std::collections::BTreeMap;
use std::fmt;
use std::fmt::Write as _;
use std::sync::Arc;

use bytes::Bytes;
use reportobello_api_types::{
    BuildRequestBody, BuildStatusResponse, ReportRecord, TemplateRecord, UpsertTemplateRequest,
};
use reqwest::header::{AUTHORIZATION, HeaderValue};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::application::error::ApiError;
use crate::config::ApiSettings;
use crate::domain::build::{ArtifactRef, BuildResult, JobToken};
use crate::domain::template::ResolvedTemplate;
use crate::infra::error::InfraError;
use crate::infra::transport::{
    FilePart, HttpTransport, Transport, TransportRequest, TransportResponse,
};

const JSON: &str = "application/json";

#[derive(Clone)]
pub struct ApiClient {
    transport: Arc<dyn Transport>,
    api_key: Arc<str>,
}

impl fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiClient")
            .field("api_key", &"<redacted>")
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    pub fn new(transport: Arc<dyn Transport>, api_key: impl Into<String>) -> Self {
        Self {
            transport,
            api_key: Arc::from(api_key.into()),
        }
    }

    /// Client over the default `reqwest` transport.
    pub fn from_settings(settings: &ApiSettings) -> Result<Self, InfraError> {
        let transport = HttpTransport::new(&settings.host, settings.request_timeout)?;
        Ok(Self::new(Arc::new(transport), settings.api_key.clone()))
    }

    pub fn auth_header(&self) -> Result<HeaderValue, ApiError> {
        HeaderValue::from_str(&format!("Bearer {}", self.api_key))
            .map_err(|e| ApiError::InvalidRequest(format!("api key is not a valid header: {e}")))
    }

    /// Send with credentials attached; 401 and 5xx are mapped here.
    pub async fn send(&self, mut request: TransportRequest) -> Result<TransportResponse, ApiError> {
        request.headers.insert(AUTHORIZATION, self.auth_header()?);

        let started_at = Instant::now();
        let method = request.method.clone();
        let path = request.path.clone();
        let resp = self.transport.send(request).await.map_err(|err| {
            warn!(
                target = "application::api",
                op = "api::send",
                result = "transport_error",
                method = %method,
                path = %path,
                elapsed_ms = started_at.elapsed().as_millis() as u64,
                error = %err,
                "request failed before a response arrived"
            );
            ApiError::Transport(err)
        })?;

        debug!(
            target = "application::api",
            op = "api::send",
            method = %method,
            path = %path,
            status = resp.status.as_u16(),
            elapsed_ms = started_at.elapsed().as_millis() as u64,
            "response received"
        );

        handle_common_status(&resp)?;
        Ok(resp)
    }

    pub async fn list_templates(&self) -> Result<Vec<TemplateRecord>, ApiError> {
        let resp = self
            .send(TransportRequest::new(Method::GET, "api/v1/templates"))
            .await?;
        expect_success(&resp)?;
        decode_json(&resp)
    }

    /// All stored versions of a template.
    pub async fn template_versions(&self, name: &str) -> Result<Vec<TemplateRecord>, ApiError> {
        let resp = self
            .send(TransportRequest::new(Method::GET, template_path(name)))
            .await?;
        if resp.status == StatusCode::NOT_FOUND {
            return Err(ApiError::not_found(format!("template `{name}`")));
        }
        expect_success(&resp)?;
        decode_json(&resp)
    }

    /// Latest remote version, or `None` when the service has never seen it.
    pub async fn lookup_template(&self, name: &str) -> Result<Option<TemplateRecord>, ApiError> {
        match self.template_versions(name).await {
            Ok(versions) => Ok(versions.into_iter().max_by_key(|record| record.version)),
            Err(ApiError::NotFound(_)) => Ok(None),
            Err(err) => Err(err),
        }
    }

    pub async fn create_template(
        &self,
        template: &ResolvedTemplate,
    ) -> Result<TemplateRecord, ApiError> {
        self.upsert_template(Method::POST, template).await
    }

    pub async fn update_template(
        &self,
        template: &ResolvedTemplate,
    ) -> Result<TemplateRecord, ApiError> {
        self.upsert_template(Method::PUT, template).await
    }

    async fn upsert_template(
        &self,
        method: Method,
        template: &ResolvedTemplate,
    ) -> Result<TemplateRecord, ApiError> {
        let body = UpsertTemplateRequest {
            template: template.content.clone(),
            variables: template.variables.as_map().clone(),
            fingerprint: template.fingerprint().to_string(),
        };
        let resp = self
            .send(
                TransportRequest::new(method, template_path(&template.name))
                    .with_body(JSON, encode_json(&body)?),
            )
            .await?;

        match resp.status {
            StatusCode::BAD_REQUEST | StatusCode::CONFLICT | StatusCode::UNPROCESSABLE_ENTITY => {
                Err(ApiError::rejected(resp.text()))
            }
            StatusCode::NOT_FOUND => Err(ApiError::not_found(format!(
                "template `{}`",
                template.name
            ))),
            _ => {
                expect_success(&resp)?;
                decode_json(&resp)
            }
        }
    }

    pub async fn delete_template(&self, name: &str) -> Result<(), ApiError> {
        let resp = self
            .send(TransportRequest::new(Method::DELETE, template_path(name)))
            .await?;
        if resp.status == StatusCode::NOT_FOUND {
            return Err(ApiError::not_found(format!("template `{name}`")));
        }
        expect_success(&resp)
    }

    pub async fn submit_build(
        &self,
        name: &str,
        body: &BuildRequestBody,
    ) -> Result<BuildResult, ApiError> {
        let path = format!("{}/build?justUrl", template_path(name));
        let resp = self
            .send(TransportRequest::new(Method::POST, path).with_body(JSON, encode_json(body)?))
            .await?;
        if resp.status == StatusCode::NOT_FOUND {
            return Err(ApiError::not_found(format!("template `{name}`")));
        }
        decode_build_status(&resp)
    }

    pub async fn poll_build(&self, job: &JobToken) -> Result<BuildResult, ApiError> {
        let path = format!("api/v1/build/{}", encode_segment(job.as_str()));
        let resp = self.send(TransportRequest::new(Method::GET, path)).await?;
        if resp.status == StatusCode::NOT_FOUND {
            return Err(ApiError::not_found(format!("build job `{job}`")));
        }
        decode_build_status(&resp)
    }

    /// Download a finished document. `url` may be absolute or host-relative.
    pub async fn fetch_artifact(&self, url: &str) -> Result<Bytes, ApiError> {
        let resp = self.send(TransportRequest::new(Method::GET, url)).await?;
        if resp.status == StatusCode::NOT_FOUND {
            return Err(ApiError::not_found(format!("artifact `{url}`")));
        }
        expect_success(&resp)?;
        Ok(resp.body)
    }

    /// Attach data files (CSV, images, ...) that templates can read at build
    /// time. Nothing is sent when `files` is empty.
    pub async fn upload_data_files(
        &self,
        name: &str,
        files: Vec<FilePart>,
    ) -> Result<(), ApiError> {
        if files.is_empty() {
            return Ok(());
        }
        let path = format!("{}/files", template_path(name));
        let resp = self
            .send(TransportRequest::new(Method::POST, path).with_files(files))
            .await?;
        match resp.status {
            StatusCode::BAD_REQUEST => Err(ApiError::rejected(resp.text())),
            StatusCode::NOT_FOUND => Err(ApiError::not_found(format!("template `{name}`"))),
            _ => expect_success(&resp),
        }
    }

    pub async fn recent_builds(
        &self,
        name: &str,
        before: Option<OffsetDateTime>,
    ) -> Result<Vec<ReportRecord>, ApiError> {
        let mut path = format!("{}/recent", template_path(name));
        if let Some(before) = before {
            let stamp = before
                .format(&Rfc3339)
                .map_err(|e| ApiError::InvalidRequest(format!("invalid timestamp: {e}")))?;
            path.push_str("?before=");
            path.push_str(&encode_segment(&stamp));
        }

        let resp = self.send(TransportRequest::new(Method::GET, path)).await?;
        if resp.status == StatusCode::NOT_FOUND {
            return Err(ApiError::not_found(format!("template `{name}`")));
        }
        expect_success(&resp)?;
        decode_json(&resp)
    }

    pub async fn env_vars(&self) -> Result<BTreeMap<String, String>, ApiError> {
        let resp = self
            .send(TransportRequest::new(Method::GET, "api/v1/env"))
            .await?;
        expect_success(&resp)?;
        decode_json(&resp)
    }

    pub async fn update_env_vars(&self, vars: &BTreeMap<String, String>) -> Result<(), ApiError> {
        let resp = self
            .send(
                TransportRequest::new(Method::POST, "api/v1/env")
                    .with_body(JSON, encode_json(vars)?),
            )
            .await?;
        expect_success(&resp)
    }

    pub async fn delete_env_vars(&self, keys: &[String]) -> Result<(), ApiError> {
        if keys.is_empty() {
            return Ok(());
        }
        let joined = keys
            .iter()
            .map(|key| encode_segment(key))
            .collect::<Vec<_>>()
            .join(",");
        let resp = self
            .send(TransportRequest::new(
                Method::DELETE,
                format!("api/v1/env?keys={joined}"),
            ))
            .await?;
        expect_success(&resp)
    }
}

fn handle_common_status(resp: &TransportResponse) -> Result<(), ApiError> {
    if resp.status == StatusCode::UNAUTHORIZED {
        return Err(ApiError::Unauthorized(resp.text()));
    }
    if resp.status == StatusCode::PAYLOAD_TOO_LARGE {
        return Err(ApiError::TooLarge(resp.text()));
    }
    if resp.status.is_server_error() {
        let reason = resp.status.canonical_reason().unwrap_or("server error");
        let text = resp.text();
        let message = if text.trim().is_empty() {
            reason.to_string()
        } else {
            format!("{reason}: {}", text.trim())
        };
        return Err(ApiError::Server {
            status: resp.status.as_u16(),
            message,
        });
    }
    Ok(())
}

fn expect_success(resp: &TransportResponse) -> Result<(), ApiError> {
    if resp.status.is_success() {
        Ok(())
    } else {
        Err(ApiError::protocol(format!(
            "status {} body {}",
            resp.status,
            resp.text()
        )))
    }
}

fn decode_json<T: DeserializeOwned>(resp: &TransportResponse) -> Result<T, ApiError> {
    serde_json::from_slice(&resp.body)
        .map_err(|e| ApiError::protocol(format!("failed to parse body: {e}")))
}

fn encode_json<T: serde::Serialize>(value: &T) -> Result<Bytes, ApiError> {
    serde_json::to_vec(value)
        .map(Bytes::from)
        .map_err(|e| ApiError::InvalidRequest(format!("failed to encode body: {e}")))
}

/// Interpret the submit/poll response.
///
/// JSON bodies carry a `status` tag. Plain-text bodies are the older
/// `justUrl` contract: 200 is the artifact URL, 400 a render failure and
/// 422 a validation failure.
fn decode_build_status(resp: &TransportResponse) -> Result<BuildResult, ApiError> {
    let looks_json = resp.is_json()
        || resp.body.iter().find(|b| !b.is_ascii_whitespace()) == Some(&b'{');

    if looks_json {
        match serde_json::from_slice::<BuildStatusResponse>(&resp.body) {
            Ok(status) if tag_fits_status(&status, resp.status) => {
                return Ok(BuildResult::from(status));
            }
            Ok(_) => {
                return Err(ApiError::protocol(format!(
                    "build status tag does not match status code {}",
                    resp.status
                )));
            }
            Err(e) if resp.status.is_success() => {
                return Err(ApiError::protocol(format!("unrecognized build status: {e}")));
            }
            // Untagged error bodies still carry a diagnostic worth surfacing.
            Err(_) => {}
        }
    }

    let text = resp.text();
    match resp.status {
        StatusCode::OK if !looks_json => {
            let url = text.trim();
            if url.is_empty() {
                Err(ApiError::protocol("build succeeded without an artifact url"))
            } else {
                Ok(BuildResult::Ready(ArtifactRef::from_url(url)))
            }
        }
        StatusCode::BAD_REQUEST => Ok(BuildResult::RenderError(text)),
        StatusCode::UNPROCESSABLE_ENTITY => Ok(BuildResult::ValidationError(text)),
        other => Err(ApiError::protocol(format!(
            "unexpected build status code {other}"
        ))),
    }
}

/// Success tags only on 2xx, rejection tags only on 400/422.
fn tag_fits_status(tag: &BuildStatusResponse, status: StatusCode) -> bool {
    match tag {
        BuildStatusResponse::Pending { .. } | BuildStatusResponse::Ready { .. } => {
            status.is_success()
        }
        BuildStatusResponse::ValidationError { .. } | BuildStatusResponse::RenderError { .. } => {
            matches!(
                status,
                StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY
            )
        }
    }
}

fn template_path(name: &str) -> String {
    format!("api/v1/template/{}", encode_segment(name))
}

/// Percent-encode everything outside the RFC 3986 unreserved set.
pub fn encode_segment(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for byte in raw.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'.' | b'_' | b'~') {
            out.push(char::from(byte));
        } else {
            let _ = write!(out, "%{byte:02X}");
        }
    }
    out
}
