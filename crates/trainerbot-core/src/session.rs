//! Per-chat session store.
//!
//! Owned by the update loop and passed to the router by `&mut`, so there is
//! exactly one writer and no locking. Entries are never evicted; a restart
//! clears them, and the remote trainer keeps the durable conversation.

use std::collections::HashMap;

use trainerbot_types::session::{ChatId, ChatSession};

#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: HashMap<ChatId, ChatSession>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The session for `chat_id`, created idle on first contact.
    ///
    /// This is the only place sessions are created.
    pub fn get(&mut self, chat_id: ChatId) -> &mut ChatSession {
        self.sessions
            .entry(chat_id)
            .or_insert_with(|| ChatSession::new(chat_id))
    }

    /// Replace the session stored for `chat_id`.
    pub fn set(&mut self, chat_id: ChatId, session: ChatSession) {
        self.sessions.insert(chat_id, session);
    }

    /// Read a session without creating it.
    pub fn peek(&self, chat_id: ChatId) -> Option<&ChatSession> {
        self.sessions.get(&chat_id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
