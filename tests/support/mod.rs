//! In-memory stand-in for the Reportobello service.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use reportobello::Reportobello;
use reportobello::application::build::PollPolicy;
use reportobello::infra::transport::{
    Transport, TransportError, TransportRequest, TransportResponse,
};
use reportobello_api_types::{BuildRequestBody, TemplateRecord, UpsertTemplateRequest};
use reqwest::header::AUTHORIZATION;
use reqwest::{Method, StatusCode};
use serde_json::json;
use tokio::sync::Mutex;

pub const API_KEY: &str = "test-key";
const JSON: &str = "application/json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recorded {
    pub method: Method,
    pub path: String,
    pub authorized: bool,
}

#[derive(Default)]
struct State {
    templates: HashMap<String, Vec<TemplateRecord>>,
    artifacts: HashMap<String, Bytes>,
    build_script: VecDeque<TransportResponse>,
    last_build: Option<BuildRequestBody>,
    requests: Vec<Recorded>,
    reject_upserts: Option<String>,
    omit_fingerprint: bool,
    offline: bool,
}

#[derive(Default)]
pub struct FakeService {
    state: Mutex<State>,
}

impl FakeService {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn client(self: &Arc<Self>, policy: PollPolicy) -> Reportobello {
        Reportobello::new(self.clone(), API_KEY, policy)
    }

    /// Build responses served in order to the submit call and each poll.
    /// The last entry repeats once the script is exhausted.
    pub async fn script_builds(&self, responses: Vec<TransportResponse>) {
        self.state.lock().await.build_script = responses.into();
    }

    pub async fn add_artifact(&self, path: &str, bytes: &'static [u8]) {
        self.state
            .lock()
            .await
            .artifacts
            .insert(path.trim_start_matches('/').to_string(), Bytes::from_static(bytes));
    }

    pub async fn reject_upserts(&self, message: &str) {
        self.state.lock().await.reject_upserts = Some(message.to_string());
    }

    /// Store templates without the fingerprint the client sent.
    pub async fn omit_fingerprints(&self) {
        self.state.lock().await.omit_fingerprint = true;
    }

    pub async fn go_offline(&self) {
        self.state.lock().await.offline = true;
    }

    pub async fn requests(&self) -> Vec<Recorded> {
        self.state.lock().await.requests.clone()
    }

    pub async fn count(&self, method: Method, prefix: &str) -> usize {
        self.state
            .lock()
            .await
            .requests
            .iter()
            .filter(|r| r.method == method && r.path.starts_with(prefix))
            .count()
    }

    pub async fn poll_count(&self) -> usize {
        self.count(Method::GET, "api/v1/build/").await
    }

    pub async fn last_build(&self) -> Option<BuildRequestBody> {
        self.state.lock().await.last_build.clone()
    }

    pub async fn versions(&self, name: &str) -> Vec<TemplateRecord> {
        self.state
            .lock()
            .await
            .templates
            .get(name)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl Transport for FakeService {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
        let mut state = self.state.lock().await;
        state.requests.push(Recorded {
            method: request.method.clone(),
            path: request.path.clone(),
            authorized: request
                .headers
                .get(AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .is_some_and(|v| v == format!("Bearer {API_KEY}")),
        });

        if state.offline {
            return Err(TransportError::Timeout);
        }

        let path = request.path.trim_start_matches('/').to_string();
        let response = if let Some(rest) = path.strip_prefix("api/v1/template/") {
            handle_template(&mut state, &request, rest)
        } else if path.starts_with("api/v1/build/") {
            next_build(&mut state)
        } else {
            match state.artifacts.get(&path) {
                Some(bytes) => TransportResponse::new(StatusCode::OK, bytes.clone()),
                None => TransportResponse::new(StatusCode::NOT_FOUND, "no such file"),
            }
        };
        Ok(response)
    }
}

fn handle_template(state: &mut State, request: &TransportRequest, rest: &str) -> TransportResponse {
    let (name, action) = match rest.split_once('/') {
        Some((name, action)) => (name.to_string(), Some(action)),
        None => (rest.to_string(), None),
    };

    let method = &request.method;
    match action {
        None if method == Method::GET => match state.templates.get(&name) {
            Some(versions) => json_response(StatusCode::OK, &versions),
            None => TransportResponse::new(StatusCode::NOT_FOUND, "template not found"),
        },
        None if method == Method::POST || method == Method::PUT => {
            if let Some(message) = state.reject_upserts.clone() {
                return TransportResponse::new(StatusCode::UNPROCESSABLE_ENTITY, message);
            }
            let body: UpsertTemplateRequest = match request
                .body
                .as_ref()
                .and_then(|b| serde_json::from_slice(b).ok())
            {
                Some(body) => body,
                None => return TransportResponse::new(StatusCode::BAD_REQUEST, "bad body"),
            };
            let omit = state.omit_fingerprint;
            let versions = state.templates.entry(name.clone()).or_default();
            let record = TemplateRecord {
                name,
                content: body.template,
                version: versions.len() as i64 + 1,
                variables: body.variables,
                fingerprint: (!omit).then_some(body.fingerprint),
            };
            versions.push(record.clone());
            json_response(StatusCode::CREATED, &record)
        }
        Some(action) if method == Method::POST && action.starts_with("build") => {
            state.last_build = request
                .body
                .as_ref()
                .and_then(|b| serde_json::from_slice(b).ok());
            next_build(state)
        }
        _ => TransportResponse::new(StatusCode::NOT_FOUND, "no route"),
    }
}

fn next_build(state: &mut State) -> TransportResponse {
    if state.build_script.len() > 1 {
        state.build_script.pop_front().unwrap_or_else(|| ready("/files/out.pdf"))
    } else {
        state
            .build_script
            .front()
            .cloned()
            .unwrap_or_else(|| ready("/files/out.pdf"))
    }
}

fn json_response<T: serde::Serialize>(status: StatusCode, value: &T) -> TransportResponse {
    TransportResponse::new(status, serde_json::to_vec(value).expect("serialize"))
        .with_content_type(JSON)
}

pub fn pending(job: &str) -> TransportResponse {
    json_response(StatusCode::ACCEPTED, &json!({"status": "pending", "job": job}))
}

pub fn pending_with_hint(job: &str, retry_after_ms: u64) -> TransportResponse {
    json_response(
        StatusCode::ACCEPTED,
        &json!({"status": "pending", "job": job, "retry_after_ms": retry_after_ms}),
    )
}

pub fn ready(url: &str) -> TransportResponse {
    json_response(StatusCode::OK, &json!({"status": "ready", "url": url}))
}

pub fn render_error(message: &str) -> TransportResponse {
    json_response(
        StatusCode::BAD_REQUEST,
        &json!({"status": "render_error", "message": message}),
    )
}

pub fn validation_error(message: &str) -> TransportResponse {
    json_response(
        StatusCode::UNPROCESSABLE_ENTITY,
        &json!({"status": "validation_error", "message": message}),
    )
}

pub fn raw(status: StatusCode, body: &'static str) -> TransportResponse {
    TransportResponse::new(status, body).with_content_type(JSON)
}

/// Fast schedule for tests that run on the real clock.
pub fn quick_policy() -> PollPolicy {
    PollPolicy {
        initial_delay: std::time::Duration::from_millis(5),
        max_delay: std::time::Duration::from_millis(20),
        multiplier: 2,
        timeout: std::time::Duration::from_secs(5),
    }
}
