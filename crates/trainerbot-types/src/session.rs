//! Per-chat conversation state.
//!
//! Each chat identity owns exactly one [`ChatSession`]. The remote trainer
//! owns the durable conversation; locally we only remember whether a
//! dialogue is running and under which session id.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Chat identity on the chat platform.
pub type ChatId = i64;

/// Coarse conversation mode, as reported to logs and listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionMode {
    None,
    Dialog,
}

impl fmt::Display for SessionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionMode::None => write!(f, "none"),
            SessionMode::Dialog => write!(f, "dialog"),
        }
    }
}

/// Conversation state. A dialogue always carries its remote session id.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum SessionState {
    #[default]
    Idle,
    Dialog {
        sid: String,
    },
}

/// Local state for one chat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatSession {
    pub chat_id: ChatId,
    pub state: SessionState,
    pub created_at: DateTime<Utc>,
}

impl ChatSession {
    /// A fresh idle session for `chat_id`.
    pub fn new(chat_id: ChatId) -> Self {
        Self {
            chat_id,
            state: SessionState::Idle,
            created_at: Utc::now(),
        }
    }

    pub fn mode(&self) -> SessionMode {
        match self.state {
            SessionState::Idle => SessionMode::None,
            SessionState::Dialog { .. } => SessionMode::Dialog,
        }
    }

    /// Remote session id of the running dialogue, if any.
    pub fn active_sid(&self) -> Option<&str> {
        match &self.state {
            SessionState::Idle => None,
            SessionState::Dialog { sid } => Some(sid),
        }
    }

    /// Enter dialogue mode bound to `sid`.
    pub fn begin_dialog(&mut self, sid: impl Into<String>) {
        self.state = SessionState::Dialog { sid: sid.into() };
    }

    /// Drop back to idle, forgetting any session id.
    pub fn reset(&mut self) {
        self.state = SessionState::Idle;
    }
}
