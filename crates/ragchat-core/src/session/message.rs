//! Conversation message types.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use super::mode::QueryMode;
use crate::backend::{QueryAnswer, StreamEvent};

/// Text shown when the backend could not answer a question.
pub const GENERIC_FAILURE: &str = "Sorry, I couldn't process your question.";

/// Represents the role of a message in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// Message from the user.
    User,
    /// Message from the assistant (answers, failures and welcome banners).
    Assistant,
}

/// One conversational turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    /// Markdown for assistant turns.
    pub content: String,
    pub timestamp: DateTime<Local>,
    pub mode: Option<QueryMode>,
    /// True if this message reports a failure instead of an answer.
    #[serde(default)]
    pub error: bool,
    /// Source identifiers in backend relevance order.
    #[serde(default)]
    pub sources: Vec<String>,
    #[serde(default)]
    pub document_count: u32,
    /// `retrieved_content[i]` is the excerpt for `sources[i]`.
    #[serde(default)]
    pub retrieved_content: Vec<String>,
    #[serde(default)]
    pub pdf_available: bool,
    pub pdf_download_url: Option<String>,
    #[serde(default)]
    pub summary_pdf_available: bool,
    pub summary_pdf_download_url: Option<String>,
    pub session_id: Option<String>,
    /// Set on synthetic welcome messages to the mode they introduce.
    pub welcome: Option<QueryMode>,
}

impl Message {
    fn base(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Local::now(),
            mode: None,
            error: false,
            sources: Vec::new(),
            document_count: 0,
            retrieved_content: Vec::new(),
            pdf_available: false,
            pdf_download_url: None,
            summary_pdf_available: false,
            summary_pdf_download_url: None,
            session_id: None,
            welcome: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::base(MessageRole::User, content)
    }

    /// Synthetic banner describing `mode`.
    pub fn welcome(mode: QueryMode) -> Self {
        let mut message = Self::base(MessageRole::Assistant, mode.welcome_text());
        message.mode = Some(mode);
        message.welcome = Some(mode);
        message
    }

    /// Assistant message built from a backend answer.
    ///
    /// The mode echoed by the backend wins over `mode` when it is one this
    /// client knows.
    pub fn from_answer(answer: QueryAnswer, mode: QueryMode) -> Self {
        let echoed = answer
            .mode
            .as_deref()
            .and_then(|value| value.parse::<QueryMode>().ok());
        let mut message = Self::base(MessageRole::Assistant, answer.answer);
        message.mode = Some(echoed.unwrap_or(mode));
        message.sources = answer.sources;
        message.document_count = answer.document_count;
        message.retrieved_content = answer.retrieved_content;
        message.pdf_available = answer.pdf_available;
        message.pdf_download_url = answer.pdf_download_url;
        message.summary_pdf_available = answer.summary_pdf_available;
        message.summary_pdf_download_url = answer.summary_pdf_download_url;
        message.session_id = answer.session_id;
        message
    }

    /// Assistant message reporting a failure.
    pub fn failure(content: impl Into<String>, mode: QueryMode) -> Self {
        let mut message = Self::base(MessageRole::Assistant, content);
        message.mode = Some(mode);
        message.error = true;
        message
    }

    /// Empty assistant message that streamed chunks are appended to.
    pub fn pending(mode: QueryMode) -> Self {
        let mut message = Self::base(MessageRole::Assistant, String::new());
        message.mode = Some(mode);
        message
    }

    /// Copies the metadata of a terminal `Complete` event onto this message.
    ///
    /// Other event kinds are ignored.
    pub fn apply_completion(&mut self, event: StreamEvent) {
        if let StreamEvent::Complete {
            session_id,
            sources,
            document_count,
            retrieved_content,
            pdf_available,
            pdf_download_url,
            summary_pdf_available,
            summary_pdf_download_url,
        } = event
        {
            self.session_id = session_id;
            self.sources = sources;
            self.document_count = document_count;
            self.retrieved_content = retrieved_content;
            self.pdf_available = pdf_available;
            self.pdf_download_url = pdf_download_url;
            self.summary_pdf_available = summary_pdf_available;
            self.summary_pdf_download_url = summary_pdf_download_url;
        }
    }

    pub fn is_user(&self) -> bool {
        self.role == MessageRole::User
    }

    pub fn is_welcome(&self) -> bool {
        self.welcome.is_some()
    }

    /// Excerpt for the source at `index`, if the backend sent one.
    pub fn excerpt(&self, index: usize) -> Option<&str> {
        self.retrieved_content.get(index).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_welcome_message() {
        let message = Message::welcome(QueryMode::Preparation);
        assert_eq!(message.role, MessageRole::Assistant);
        assert_eq!(message.welcome, Some(QueryMode::Preparation));
        assert_eq!(message.mode, Some(QueryMode::Preparation));
        assert!(message.content.contains("Preparation Mode"));
        assert!(!message.error);
    }

    #[test]
    fn test_from_answer_copies_metadata() {
        let answer = QueryAnswer {
            answer: "Wear a helmet.".to_string(),
            sources: vec!["safety.pdf".to_string(), "ppe.md".to_string()],
            document_count: 4,
            retrieved_content: vec!["Helmets are mandatory".to_string()],
            session_id: Some("s-42".to_string()),
            pdf_available: true,
            pdf_download_url: Some("/api/pdf/download/s-42".to_string()),
            ..Default::default()
        };

        let message = Message::from_answer(answer, QueryMode::Knowledge);
        assert_eq!(message.content, "Wear a helmet.");
        assert_eq!(message.mode, Some(QueryMode::Knowledge));
        assert_eq!(message.document_count, 4);
        assert_eq!(message.session_id.as_deref(), Some("s-42"));
        assert!(message.pdf_available);
        assert_eq!(message.excerpt(0), Some("Helmets are mandatory"));
        assert_eq!(message.excerpt(1), None);
        assert!(!message.is_welcome());
    }

    #[test]
    fn test_from_answer_prefers_known_echoed_mode() {
        let answer = QueryAnswer {
            answer: "Plan".to_string(),
            mode: Some("preparation".to_string()),
            ..Default::default()
        };
        let message = Message::from_answer(answer, QueryMode::Knowledge);
        assert_eq!(message.mode, Some(QueryMode::Preparation));

        let answer = QueryAnswer {
            answer: "Plan".to_string(),
            mode: Some("experimental".to_string()),
            ..Default::default()
        };
        let message = Message::from_answer(answer, QueryMode::Knowledge);
        assert_eq!(message.mode, Some(QueryMode::Knowledge));
    }

    #[test]
    fn test_apply_completion_ignores_non_terminal() {
        let mut message = Message::pending(QueryMode::Knowledge);
        message.apply_completion(StreamEvent::chunk("x"));
        assert!(message.sources.is_empty());

        message.apply_completion(StreamEvent::complete(
            Some("s".to_string()),
            vec!["doc1.pdf".to_string()],
        ));
        assert_eq!(message.sources, vec!["doc1.pdf".to_string()]);
        assert_eq!(message.document_count, 1);
    }
}
