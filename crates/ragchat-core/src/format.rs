//! Display formatting helpers.
//!
//! Pure string functions used by the renderer and the REPL. None of them
//! touch session state.

use chrono::{DateTime, Local};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::backend::HealthReport;
use crate::session::Message;

/// Longest excerpt shown under a source before it is cut.
pub const EXCERPT_LIMIT: usize = 500;

static DOC_EXTENSION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\.(pdf|txt|docx|doc|md)$").expect("valid extension regex"));
static CHUNK_LABEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Chunk (\d+)").expect("valid chunk regex"));
static BLANK_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n\s*\n").expect("valid blank regex"));
static LIST_ITEM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([^\n])\n(\d+\. |[-*] )").expect("valid list regex"));

/// Turns a raw source identifier into a readable title.
///
/// `"policy_doc_2024.pdf"` becomes `"Policy Doc 2024"`.
pub fn format_source_name(source: &str) -> String {
    if source.trim().is_empty() {
        return "Unknown Source".to_string();
    }

    let stem = DOC_EXTENSION.replace(source, "");
    let spaced = stem.replace(['_', '-'], " ");
    let titled = spaced
        .split_whitespace()
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(" ");

    CHUNK_LABEL.replace_all(&titled, "Section $1").into_owned()
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

/// Caps `text` at `limit` characters, appending `...` when cut.
pub fn truncate_excerpt(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((byte_index, _)) => format!("{}...", &text[..byte_index]),
        None => text.to_string(),
    }
}

/// Normalises answer markdown: trims, collapses blank-line runs and puts a
/// blank line in front of list items that directly follow prose.
pub fn format_answer_text(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return "No answer provided.".to_string();
    }

    let collapsed = BLANK_RUN.replace_all(trimmed, "\n\n");
    LIST_ITEM.replace_all(&collapsed, "$1\n\n$2").into_owned()
}

/// Relative time for recent messages, clock time otherwise.
pub fn format_timestamp(timestamp: DateTime<Local>, now: DateTime<Local>) -> String {
    let elapsed = now.signed_duration_since(timestamp);
    let seconds = elapsed.num_seconds().max(0);

    if seconds < 60 {
        "Just now".to_string()
    } else if seconds < 3600 {
        format!("{}m ago", seconds / 60)
    } else if timestamp.date_naive() == now.date_naive() {
        timestamp.format("%H:%M").to_string()
    } else {
        timestamp.format("%b %d, %H:%M").to_string()
    }
}

/// Categories of user-facing error text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Connection,
    Timeout,
    Server,
    Validation,
    NotFound,
    Unauthorized,
    Other,
}

pub fn format_error_message(kind: ErrorKind, details: &str) -> String {
    let base = match kind {
        ErrorKind::Connection => {
            "🔌 **Connection Error**: Cannot reach the backend server. Please check your internet connection or contact support."
        }
        ErrorKind::Timeout => {
            "⏱️ **Timeout Error**: The request took too long. The server might be busy - please try again."
        }
        ErrorKind::Server => {
            "🖥️ **Server Error**: Something went wrong on the server. Please try again or contact support."
        }
        ErrorKind::Validation => "⚠️ **Invalid Input**: Please check your input and try again.",
        ErrorKind::NotFound => "🔍 **Not Found**: The requested resource was not found.",
        ErrorKind::Unauthorized => {
            "🔒 **Access Denied**: You don't have permission to access this resource."
        }
        ErrorKind::Other => "❌ **Error**: Something went wrong.",
    };

    if details.is_empty() {
        base.to_string()
    } else {
        format!("{}\n\n*Details: {}*", base, details)
    }
}

/// Multi-line summary of a health probe.
pub fn format_health_status(report: &HealthReport) -> String {
    if !report.is_healthy() {
        let error = report.error.as_deref().unwrap_or("Unknown error");
        return format!("❌ **System Unhealthy**\nError: {}", error);
    }

    let mut lines = vec!["✅ **System Healthy**".to_string()];
    if let Some(data) = &report.data {
        if data.database.document_count > 0 {
            lines.push(format!("📊 Documents: {}", data.database.document_count));
        }
        if let Some(collection) = &data.database.collection_name {
            lines.push(format!("🗂️ Collection: {}", collection));
        }
        if let Some(environment) = &data.environment {
            lines.push(format!("🌍 Environment: {}", environment));
        }
    }
    lines.join("\n")
}

/// One-line document/source counts for an answer; empty when there is nothing to say.
pub fn format_query_stats(message: &Message) -> String {
    let mut stats = Vec::new();
    if message.document_count > 0 {
        stats.push(format!("📄 {} documents", message.document_count));
    }
    if !message.sources.is_empty() {
        stats.push(format!("🔗 {} sources", message.sources.len()));
    }
    stats.join(" • ")
}

/// Markdown transcript of a conversation.
pub fn format_chat_export(messages: &[Message], now: DateTime<Local>) -> String {
    if messages.is_empty() {
        return "No chat history to export.".to_string();
    }

    let mut lines = vec![
        "# Chat Export".to_string(),
        format!("Generated on: {}", now.format("%Y-%m-%d %H:%M:%S")),
        format!("Total messages: {}", messages.len()),
        "\n---\n".to_string(),
    ];

    for (i, message) in messages.iter().enumerate() {
        let role = if message.is_user() { "User" } else { "Assistant" };
        lines.push(format!("## Message {} - {}", i + 1, role));
        lines.push(format!("Time: {}", format_timestamp(message.timestamp, now)));
        lines.push(format!("\n{}\n", message.content));

        if !message.sources.is_empty() {
            lines.push("**Sources:**".to_string());
            for (j, source) in message.sources.iter().enumerate() {
                lines.push(format!("{}. {}", j + 1, format_source_name(source)));
            }
        }

        lines.push("\n---\n".to_string());
    }

    lines.join("\n")
}
