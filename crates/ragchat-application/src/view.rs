//! Read-only projection of a [`Session`] into displayable pieces.
//!
//! Rendering never mutates state; front ends redraw from a fresh [`View`]
//! whenever the controller reports a change.

use chrono::{DateTime, Local};
use ragchat_core::format::{
    EXCERPT_LIMIT, format_answer_text, format_query_stats, format_source_name, format_timestamp,
    truncate_excerpt,
};
use ragchat_core::session::{Message, MessageRole, QuotaStatus, Session};
use serde::Serialize;

use crate::controller::{Artifact, ArtifactKind, message_artifacts};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct View {
    pub header: Header,
    pub messages: Vec<MessageView>,
    /// Present when the next question needs an email address first.
    pub email_prompt: Option<QuotaStatus>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Header {
    pub mode_label: &'static str,
    /// Free questions left; `None` once the limit is lifted.
    pub remaining_queries: Option<u32>,
    /// First 8 characters of the backend session id.
    pub session: Option<String>,
    pub user_email: Option<String>,
    pub top_k: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageView {
    pub role: MessageRole,
    pub timestamp: String,
    pub badge: Option<&'static str>,
    pub content: String,
    pub error: bool,
    /// Document and source counts under an answer.
    pub stats: Option<String>,
    pub sources: Option<SourcesPanel>,
    pub downloads: Vec<DownloadLink>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourcesPanel {
    pub document_count: u32,
    pub entries: Vec<SourceEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceEntry {
    /// 1-based position in relevance order.
    pub index: usize,
    pub name: String,
    pub excerpt: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DownloadLink {
    pub label: &'static str,
    pub path: String,
}

impl From<Artifact> for DownloadLink {
    fn from(artifact: Artifact) -> Self {
        let label = match artifact.kind {
            ArtifactKind::Preparation => "📄 Download preparation PDF",
            ArtifactKind::Summary => "📝 Download summary PDF",
        };
        Self {
            label,
            path: artifact.path,
        }
    }
}

/// Renders `session` relative to the current time.
pub fn render(session: &Session) -> View {
    render_at(session, Local::now())
}

/// Renders `session` with timestamps relative to `now`.
pub fn render_at(session: &Session, now: DateTime<Local>) -> View {
    let quota = QuotaStatus::new(session.query_count, session.quota_unlocked);

    let header = Header {
        mode_label: session.selected_mode.label(),
        remaining_queries: (!quota.unlocked).then(|| quota.remaining()),
        session: session.short_session_id(),
        user_email: session.user_email.clone(),
        top_k: session.top_k,
    };

    View {
        header,
        messages: session
            .messages
            .iter()
            .map(|message| render_message(message, now))
            .collect(),
        email_prompt: quota.is_blocked().then_some(quota),
    }
}

fn render_message(message: &Message, now: DateTime<Local>) -> MessageView {
    let content = if message.is_user() || message.error {
        message.content.clone()
    } else {
        format_answer_text(&message.content)
    };

    MessageView {
        role: message.role,
        timestamp: format_timestamp(message.timestamp, now),
        badge: message.mode.map(|mode| mode.label()),
        content,
        error: message.error,
        stats: Some(format_query_stats(message)).filter(|stats| !stats.is_empty()),
        sources: sources_panel(message),
        downloads: message_artifacts(message)
            .into_iter()
            .map(DownloadLink::from)
            .collect(),
    }
}

fn sources_panel(message: &Message) -> Option<SourcesPanel> {
    if message.sources.is_empty() {
        return None;
    }

    let entries = message
        .sources
        .iter()
        .enumerate()
        .map(|(i, source)| SourceEntry {
            index: i + 1,
            name: format_source_name(source),
            excerpt: message
                .excerpt(i)
                .filter(|text| !text.trim().is_empty())
                .map(|text| truncate_excerpt(text, EXCERPT_LIMIT)),
        })
        .collect();

    Some(SourcesPanel {
        document_count: message.document_count,
        entries,
    })
}
