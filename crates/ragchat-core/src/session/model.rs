//! Session domain model.

use serde::{Deserialize, Serialize};

use super::message::Message;
use super::mode::QueryMode;

/// The full state of one user's conversation.
///
/// A session lives for as long as the front end runs; nothing is persisted.
/// It is mutated only by the session controller and read by the renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Conversation history, append-only except on clear.
    pub messages: Vec<Message>,
    /// Backend conversation token, sticky once assigned.
    pub session_id: Option<String>,
    /// Questions submitted so far.
    pub query_count: u32,
    /// True once a valid email was captured; lifts the query limit.
    pub quota_unlocked: bool,
    pub user_email: Option<String>,
    pub selected_mode: QueryMode,
    /// Documents requested per query.
    pub top_k: u32,
}

impl Session {
    /// Creates a fresh session seeded with the welcome message for `mode`.
    pub fn new(mode: QueryMode, top_k: u32) -> Self {
        Self {
            messages: vec![Message::welcome(mode)],
            session_id: None,
            query_count: 0,
            quota_unlocked: false,
            user_email: None,
            selected_mode: mode,
            top_k,
        }
    }

    /// Resets the conversation, keeping the selected mode and `top_k`.
    pub fn reset(&mut self) {
        self.messages = vec![Message::welcome(self.selected_mode)];
        self.session_id = None;
        self.query_count = 0;
        self.quota_unlocked = false;
        self.user_email = None;
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn last_message_mut(&mut self) -> Option<&mut Message> {
        self.messages.last_mut()
    }

    /// First 8 characters of the backend session id, for display.
    pub fn short_session_id(&self) -> Option<String> {
        self.session_id
            .as_deref()
            .map(|id| id.chars().take(8).collect())
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(QueryMode::default(), 5)
    }
}
