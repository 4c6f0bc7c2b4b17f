use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Url};
use tracing::debug;

use super::{FilePart, Transport, TransportError, TransportRequest, TransportResponse};
use crate::infra::error::InfraError;

/// `reqwest`-backed transport rooted at the service host.
#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: Client,
    base: Url,
}

impl HttpTransport {
    pub fn new(base: &Url, timeout: Duration) -> Result<Self, InfraError> {
        if base.cannot_be_a_base() {
            return Err(InfraError::configuration(format!("invalid host `{base}`")));
        }
        let mut base = base.clone();
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let client = Client::builder()
            .user_agent(Self::user_agent())
            .timeout(timeout)
            .build()
            .map_err(|err| InfraError::http_client(err.to_string()))?;
        Ok(Self { client, base })
    }

    pub fn user_agent() -> &'static str {
        concat!("reportobello-rs/", env!("CARGO_PKG_VERSION"))
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    fn url(&self, path: &str) -> Result<Url, TransportError> {
        self.base
            .join(path)
            .map_err(|source| TransportError::InvalidUrl {
                path: path.to_string(),
                source,
            })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
        let url = self.url(&request.path)?;
        debug!(
            target = "infra::transport::http",
            method = %request.method,
            url = %url,
            "sending request"
        );

        let mut builder = self
            .client
            .request(request.method, url)
            .headers(request.headers);
        if !request.files.is_empty() {
            builder = builder.multipart(multipart_form(request.files));
        } else if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let resp = builder.send().await.map_err(map_reqwest_error)?;
        let status = resp.status();
        let headers = resp.headers().clone();
        let body = resp.bytes().await.map_err(map_reqwest_error)?;

        Ok(TransportResponse {
            status,
            headers,
            body,
        })
    }
}

/// Each file goes in its own field, named after the file.
fn multipart_form(files: Vec<FilePart>) -> Form {
    files.into_iter().fold(Form::new(), |form, file| {
        let part = Part::bytes(Vec::from(file.bytes)).file_name(file.file_name.clone());
        form.part(file.file_name, part)
    })
}

fn map_reqwest_error(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout
    } else if err.is_connect() {
        TransportError::Connect(Box::new(err))
    } else {
        TransportError::other(err)
    }
}
