//! The request/response capability the client is built on.
//!
//! Implementations must be safe to share between concurrent builds; the
//! client never mutates transport state.

mod http;

pub use http::HttpTransport;

use std::error::Error as StdError;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Method, StatusCode};
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub method: Method,
    /// Host-relative path (`api/v1/...`) or an absolute URL.
    pub path: String,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
    /// Sent as `multipart/form-data` instead of `body` when non-empty.
    pub files: Vec<FilePart>,
}

/// One file of a multipart upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePart {
    pub file_name: String,
    pub bytes: Bytes,
}

impl FilePart {
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes: bytes.into(),
        }
    }
}

impl TransportRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: HeaderMap::new(),
            body: None,
            files: Vec::new(),
        }
    }

    pub fn with_body(mut self, content_type: &'static str, body: impl Into<Bytes>) -> Self {
        self.headers
            .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
        self.body = Some(body.into());
        self
    }

    pub fn with_files(mut self, files: Vec<FilePart>) -> Self {
        self.files = files;
        self
    }
}

#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl TransportResponse {
    pub fn new(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }

    pub fn with_content_type(mut self, content_type: &'static str) -> Self {
        self.headers
            .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
        self
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
    }

    pub fn is_json(&self) -> bool {
        self.content_type()
            .is_some_and(|value| value.trim_start().starts_with("application/json"))
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Connection-level failure: nothing usable came back from the service.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("invalid request url `{path}`: {source}")]
    InvalidUrl {
        path: String,
        #[source]
        source: url::ParseError,
    },
    #[error("connection failed: {0}")]
    Connect(#[source] Box<dyn StdError + Send + Sync>),
    #[error("request timed out")]
    Timeout,
    #[error("request failed: {0}")]
    Other(#[source] Box<dyn StdError + Send + Sync>),
}

impl TransportError {
    pub fn other(error: impl StdError + Send + Sync + 'static) -> Self {
        Self::Other(Box::new(error))
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError>;
}
