//! BackendClient - REST client for the document question-answering backend.
//!
//! Every query path collapses failures into the normalised outcomes of the
//! [`QueryBackend`] contract; the classified cause is only logged.
//! Artifact downloads and transcription return `Result` so the caller can
//! show what went wrong.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use ragchat_core::backend::{
    EventStream, HealthData, HealthReport, HealthStatus, QueryAnswer, QueryBackend, QueryRequest,
};
use ragchat_core::config::Settings;
use ragchat_core::{RagchatError, Result};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Deserialize;
use tokio::time::timeout;
use tracing::{debug, error};

use crate::sse::{decode_events, failed_stream};

/// Client for the backend REST API.
#[derive(Clone)]
pub struct BackendClient {
    client: Client,
    /// Client without a total deadline, for streamed answers.
    stream_client: Client,
    base_url: String,
    timeout: Duration,
}

impl BackendClient {
    /// Creates a client for `base_url` with the given request timeout.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| RagchatError::config(format!("Failed to build HTTP client: {err}")))?;
        let stream_client = Client::builder()
            .connect_timeout(timeout)
            .build()
            .map_err(|err| RagchatError::config(format!("Failed to build HTTP client: {err}")))?;

        Ok(Self {
            client,
            stream_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
        })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Self::new(settings.backend_url(), settings.timeout())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Download URL of the preparation PDF for a backend session.
    pub fn pdf_url(&self, session_id: &str) -> String {
        self.url(&format!("/api/pdf/download/{session_id}"))
    }

    /// Absolute URL for a `pdf_download_url` as sent by the backend, which
    /// may be either absolute or relative to the base URL.
    pub fn artifact_url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else if path.starts_with('/') {
            self.url(path)
        } else {
            self.url(&format!("/{path}"))
        }
    }

    /// Maps a reqwest failure onto the error taxonomy.
    fn classify(&self, err: &reqwest::Error) -> RagchatError {
        if err.is_timeout() {
            RagchatError::timeout(format!(
                "Request took longer than {} seconds",
                self.timeout.as_secs()
            ))
        } else if err.is_connect() {
            RagchatError::connection(format!("Failed to connect to {}", self.base_url))
        } else if err.is_decode() {
            RagchatError::Serialization {
                format: "JSON".to_string(),
                message: err.to_string(),
            }
        } else {
            RagchatError::internal(err.to_string())
        }
    }

    async fn send_query(&self, request: RequestBuilder) -> Result<QueryAnswer> {
        let response = request.send().await.map_err(|err| self.classify(&err))?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());
            return Err(RagchatError::server(status.as_u16(), body));
        }

        response
            .json::<QueryAnswer>()
            .await
            .map_err(|err| self.classify(&err))
    }

    /// Logs a failed query and collapses it to `None`.
    fn settle(&self, transport: &str, result: Result<QueryAnswer>) -> Option<QueryAnswer> {
        match result {
            Ok(answer) => Some(answer),
            Err(err) => {
                match &err {
                    RagchatError::Server { status, body } => {
                        error!(transport, status, body = %body, "Query failed");
                    }
                    RagchatError::Connection(_) => {
                        error!(transport, kind = "connection", "Cannot connect to backend: {err}");
                    }
                    RagchatError::Timeout(_) => {
                        error!(transport, kind = "timeout", "Query timed out: {err}");
                    }
                    _ => error!(transport, kind = "unexpected", "Query error: {err}"),
                }
                None
            }
        }
    }

    /// Downloads the preparation PDF for `session_id`.
    ///
    /// Returns `Ok(None)` while the backend has not generated it yet (404).
    pub async fn download_pdf(&self, session_id: &str) -> Result<Option<Bytes>> {
        self.download(&self.pdf_url(session_id)).await
    }

    /// Downloads an artifact referenced by a message's download URL.
    pub async fn fetch_artifact(&self, path: &str) -> Result<Option<Bytes>> {
        self.download(&self.artifact_url(path)).await
    }

    async fn download(&self, url: &str) -> Result<Option<Bytes>> {
        debug!(url, "Downloading artifact");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|err| self.classify(&err))?;

        match response.status() {
            StatusCode::OK => response
                .bytes()
                .await
                .map(Some)
                .map_err(|err| self.classify(&err)),
            StatusCode::NOT_FOUND => Ok(None),
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(RagchatError::server(status.as_u16(), body))
            }
        }
    }

    /// Sends recorded audio to the backend and returns the recognised text.
    pub async fn transcribe(&self, file_name: &str, audio: Vec<u8>) -> Result<String> {
        let part = Part::bytes(audio).file_name(file_name.to_string());
        let form = Form::new().part("file", part);

        let response = self
            .client
            .post(self.url("/api/transcribe"))
            .multipart(form)
            .send()
            .await
            .map_err(|err| self.classify(&err))?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(RagchatError::server(status.as_u16(), body));
        }

        let parsed: TranscriptionResponse =
            response.json().await.map_err(|err| self.classify(&err))?;
        let text = parsed.text.unwrap_or_default();
        if text.trim().is_empty() {
            return Err(RagchatError::TranscriptionEmpty);
        }
        Ok(text.trim().to_string())
    }
}

#[async_trait]
impl QueryBackend for BackendClient {
    async fn check_health(&self) -> HealthReport {
        let response = match self.client.get(self.url("/health")).send().await {
            Ok(response) => response,
            Err(err) if err.is_timeout() => {
                return HealthReport::failed(
                    HealthStatus::Timeout,
                    "Request timeout",
                    format!("Request took longer than {} seconds", self.timeout.as_secs()),
                );
            }
            Err(err) if err.is_connect() => {
                return HealthReport::failed(
                    HealthStatus::Unreachable,
                    "Cannot connect to backend",
                    format!("Failed to connect to {}", self.base_url),
                );
            }
            Err(err) => {
                return HealthReport::failed(
                    HealthStatus::Error,
                    err.to_string(),
                    "Unexpected error during health check",
                );
            }
        };

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return HealthReport::failed(
                HealthStatus::Unhealthy,
                format!("HTTP {}", status.as_u16()),
                body,
            );
        }

        match response.json::<HealthData>().await {
            Ok(data) => HealthReport::healthy(data),
            Err(err) => HealthReport::failed(
                HealthStatus::Error,
                err.to_string(),
                "Unexpected error during health check",
            ),
        }
    }

    async fn query(&self, request: &QueryRequest) -> Option<QueryAnswer> {
        debug!(mode = %request.mode, top_k = ?request.top_k, "POST query");
        let builder = self.client.post(self.url("/api/query")).json(request);
        let result = self.send_query(builder).await;
        self.settle("post", result)
    }

    async fn query_get(&self, request: &QueryRequest) -> Option<QueryAnswer> {
        debug!(mode = %request.mode, top_k = ?request.top_k, "GET query");
        let builder = self
            .client
            .get(self.url("/api/query"))
            .query(&request.to_query_pairs());
        let result = self.send_query(builder).await;
        self.settle("get", result)
    }

    async fn query_stream(&self, request: &QueryRequest) -> EventStream {
        debug!(mode = %request.mode, top_k = ?request.top_k, "Streaming query");
        let send = self
            .stream_client
            .post(self.url("/api/query/stream"))
            .header("accept", "text/event-stream")
            .json(request)
            .send();

        let response = match timeout(self.timeout, send).await {
            Ok(Ok(response)) => response,
            Ok(Err(err)) => {
                let err = self.classify(&err);
                error!(transport = "stream", "Streaming query failed: {err}");
                return failed_stream(err.to_string());
            }
            Err(_) => {
                let err = RagchatError::timeout(format!(
                    "Request took longer than {} seconds",
                    self.timeout.as_secs()
                ));
                error!(transport = "stream", "Streaming query failed: {err}");
                return failed_stream(err.to_string());
            }
        };

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            error!(transport = "stream", status = status.as_u16(), body = %body, "Query failed");
            return failed_stream(format!("Backend error: HTTP {}", status.as_u16()));
        }

        decode_events(response.bytes_stream(), self.timeout)
    }
}

#[derive(Deserialize)]
struct TranscriptionResponse {
    #[serde(default)]
    text: Option<String>,
}
