//! Update-feed and outbound message types.
//!
//! Modeled on the Telegram Bot API: a long-poll `getUpdates` call returns an
//! envelope holding a batch of [`Update`]s, and replies go out through
//! `sendMessage` as an [`OutboundMessage`]. Only the fields the dispatcher
//! reads are modeled; everything else is ignored.

use serde::{Deserialize, Serialize};

use crate::session::ChatId;

/// Standard Bot API response envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    #[serde(default)]
    pub description: Option<String>,
}

/// One event from the update feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<IncomingMessage>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncomingMessage {
    #[serde(default)]
    pub chat: Option<Chat>,
    #[serde(default)]
    pub from: Option<User>,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chat {
    pub id: ChatId,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

impl User {
    /// Username if set, otherwise "first last" trimmed.
    pub fn display_name(&self) -> String {
        if let Some(username) = self.username.as_deref().filter(|u| !u.is_empty()) {
            return username.to_string();
        }
        format!(
            "{} {}",
            self.first_name.as_deref().unwrap_or(""),
            self.last_name.as_deref().unwrap_or("")
        )
        .trim()
        .to_string()
    }
}

/// A routable text message extracted from an update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextMessage {
    pub chat_id: ChatId,
    pub sender: String,
    pub text: String,
}

impl Update {
    /// The chat id and trimmed, non-empty text of this update, if any.
    pub fn text_message(&self) -> Option<TextMessage> {
        let message = self.message.as_ref()?;
        let chat_id = message.chat.as_ref()?.id;
        let text = message.text.as_deref()?.trim();
        if text.is_empty() {
            return None;
        }
        Some(TextMessage {
            chat_id,
            sender: message.from.as_ref().map(User::display_name).unwrap_or_default(),
            text: text.to_string(),
        })
    }
}

/// A single text message to deliver to a chat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub chat_id: ChatId,
    pub text: String,
}

impl OutboundMessage {
    pub fn new(chat_id: ChatId, text: impl Into<String>) -> Self {
        Self {
            chat_id,
            text: text.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_update_batch_deserialize() {
        let envelope: ApiResponse<Vec<Update>> = serde_json::from_value(json!({
            "ok": true,
            "result": [
                {"update_id": 10, "message": {"chat": {"id": 5}, "text": " /start ", "from": {"username": "anna"}}},
                {"update_id": 11, "edited_message": {"chat": {"id": 5}}}
            ]
        }))
        .unwrap();

        let updates = envelope.result.unwrap();
        assert_eq!(updates.len(), 2);

        let msg = updates[0].text_message().unwrap();
        assert_eq!(msg.chat_id, 5);
        assert_eq!(msg.text, "/start");
        assert_eq!(msg.sender, "anna");

        assert!(updates[1].text_message().is_none());
    }

    #[test]
    fn test_blank_text_is_not_routable() {
        let update: Update = serde_json::from_value(json!({
            "update_id": 1,
            "message": {"chat": {"id": 5}, "text": "   "}
        }))
        .unwrap();
        assert!(update.text_message().is_none());
    }

    #[test]
    fn test_display_name_falls_back_to_full_name() {
        let user = User {
            username: None,
            first_name: Some("Ivan".to_string()),
            last_name: None,
        };
        assert_eq!(user.display_name(), "Ivan");
    }

    #[test]
    fn test_error_envelope() {
        let envelope: ApiResponse<Vec<Update>> = serde_json::from_value(json!({
            "ok": false,
            "description": "Unauthorized"
        }))
        .unwrap();
        assert!(!envelope.ok);
        assert!(envelope.result.is_none());
        assert_eq!(envelope.description.as_deref(), Some("Unauthorized"));
    }
}
