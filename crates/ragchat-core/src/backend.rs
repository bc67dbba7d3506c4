//! Backend contract shared by the session controller and the HTTP client.
//!
//! The controller only ever talks to a [`QueryBackend`]; the reqwest-based
//! implementation lives in `ragchat-interaction`, which keeps transport
//! concerns out of the session logic and lets tests script the backend.

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Deserializer, Serialize};

use crate::session::QueryMode;

/// Body of a question sent to the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryRequest {
    pub question: String,
    pub mode: QueryMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

impl QueryRequest {
    pub fn new(question: impl Into<String>, mode: QueryMode) -> Self {
        Self {
            question: question.into(),
            mode,
            top_k: None,
            session_id: None,
        }
    }

    pub fn with_top_k(mut self, top_k: u32) -> Self {
        self.top_k = Some(top_k);
        self
    }

    pub fn with_session_id(mut self, session_id: Option<String>) -> Self {
        self.session_id = session_id;
        self
    }

    /// Query-string form used by the GET transport.
    pub fn to_query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("question", self.question.clone()),
            ("mode", self.mode.as_str().to_string()),
        ];
        if let Some(top_k) = self.top_k {
            pairs.push(("top_k", top_k.to_string()));
        }
        if let Some(session_id) = &self.session_id {
            pairs.push(("session_id", session_id.clone()));
        }
        pairs
    }
}

/// Successful answer to a question.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryAnswer {
    pub answer: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub sources: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub document_count: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub retrieved_content: Vec<String>,
    #[serde(default)]
    pub session_id: Option<String>,
    /// Mode echoed by the backend; kept as text because older backends send
    /// values this client does not know.
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub pdf_available: bool,
    #[serde(default)]
    pub pdf_download_url: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub summary_pdf_available: bool,
    #[serde(default)]
    pub summary_pdf_download_url: Option<String>,
}

/// One event of a streamed answer.
///
/// `Complete` and `Error` are terminal: a stream ends right after either.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// Incremental answer text.
    Chunk { content: String },
    /// Final metadata for the answer.
    Complete {
        #[serde(default, alias = "sessionId")]
        session_id: Option<String>,
        #[serde(default, deserialize_with = "null_as_default")]
        sources: Vec<String>,
        #[serde(default, alias = "documentCount", deserialize_with = "null_as_default")]
        document_count: u32,
        #[serde(default, alias = "retrievedContent", deserialize_with = "null_as_default")]
        retrieved_content: Vec<String>,
        #[serde(default, alias = "pdfAvailable", deserialize_with = "null_as_default")]
        pdf_available: bool,
        #[serde(default, alias = "pdfDownloadUrl")]
        pdf_download_url: Option<String>,
        #[serde(default, alias = "summaryPdfAvailable", deserialize_with = "null_as_default")]
        summary_pdf_available: bool,
        #[serde(default, alias = "summaryPdfDownloadUrl")]
        summary_pdf_download_url: Option<String>,
    },
    /// Failure; `content` describes it.
    Error { content: String },
}

impl StreamEvent {
    pub fn error(content: impl Into<String>) -> Self {
        StreamEvent::Error {
            content: content.into(),
        }
    }

    pub fn chunk(content: impl Into<String>) -> Self {
        StreamEvent::Chunk {
            content: content.into(),
        }
    }

    /// A `Complete` event carrying only sources and a session id.
    pub fn complete(session_id: Option<String>, sources: Vec<String>) -> Self {
        let document_count = sources.len() as u32;
        StreamEvent::Complete {
            session_id,
            sources,
            document_count,
            retrieved_content: Vec::new(),
            pdf_available: false,
            pdf_download_url: None,
            summary_pdf_available: false,
            summary_pdf_download_url: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, StreamEvent::Chunk { .. })
    }
}

/// Lazy, single-pass sequence of stream events.
pub type EventStream = BoxStream<'static, StreamEvent>;

/// Outcome of a health probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
    Unreachable,
    Timeout,
    Error,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseInfo {
    #[serde(default, deserialize_with = "null_as_default")]
    pub document_count: u64,
    #[serde(default)]
    pub collection_name: Option<String>,
}

/// Payload of `GET /health`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthData {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub database: DatabaseInfo,
    #[serde(default)]
    pub environment: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub data: Option<HealthData>,
    /// Short error label, e.g. `HTTP 503`.
    pub error: Option<String>,
    /// Raw response body or failure description.
    pub details: Option<String>,
}

impl HealthReport {
    pub fn healthy(data: HealthData) -> Self {
        Self {
            status: HealthStatus::Healthy,
            data: Some(data),
            error: None,
            details: None,
        }
    }

    pub fn failed(
        status: HealthStatus,
        error: impl Into<String>,
        details: impl Into<String>,
    ) -> Self {
        Self {
            status,
            data: None,
            error: Some(error.into()),
            details: Some(details.into()),
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.status == HealthStatus::Healthy
    }

    pub fn document_count(&self) -> u64 {
        self.data
            .as_ref()
            .map(|data| data.database.document_count)
            .unwrap_or(0)
    }
}

/// The operations the session controller needs from the backend.
///
/// Implementations must never return transport errors to the caller:
/// failures collapse to `None` for [`query`](QueryBackend::query) and to a
/// single terminal [`StreamEvent::Error`] for
/// [`query_stream`](QueryBackend::query_stream).
#[async_trait]
pub trait QueryBackend: Send + Sync {
    async fn check_health(&self) -> HealthReport;

    async fn query(&self, request: &QueryRequest) -> Option<QueryAnswer>;

    /// Same contract as [`query`](QueryBackend::query) over `GET`.
    async fn query_get(&self, request: &QueryRequest) -> Option<QueryAnswer> {
        self.query(request).await
    }

    async fn query_stream(&self, request: &QueryRequest) -> EventStream;
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
