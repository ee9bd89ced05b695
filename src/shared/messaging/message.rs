//! Chat Message Data Structure
//!
//! Represents a message in a one-to-one conversation as the backend returns
//! it, with sender and receiver populated.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::conversation::ChatId;
use super::user::{UserId, UserRef};

/// Backend-assigned message identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(String);

impl MessageId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Represents a chat message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    /// Unique message ID
    #[serde(rename = "_id")]
    pub id: MessageId,
    /// Conversation this message belongs to
    pub chat_id: ChatId,
    /// User who sent the message
    pub sender: UserRef,
    /// User the message is addressed to
    pub receiver: UserRef,
    /// Text body
    pub content: String,
    /// Creation time
    pub timestamp: DateTime<Utc>,
    /// Whether the receiver has read the message.
    ///
    /// Only ever moves from `false` to `true`, see [`ChatMessage::mark_read`].
    #[serde(default)]
    read: bool,
}

impl ChatMessage {
    pub fn new(
        id: MessageId,
        chat_id: ChatId,
        sender: UserRef,
        receiver: UserRef,
        content: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            chat_id,
            sender,
            receiver,
            content: content.into(),
            timestamp,
            read: false,
        }
    }

    /// Same message with the read flag already set, as history fetches return it
    pub fn already_read(mut self) -> Self {
        self.read = true;
        self
    }

    pub fn is_read(&self) -> bool {
        self.read
    }

    /// Flag the message as read. Idempotent; there is no way back to unread.
    pub fn mark_read(&mut self) {
        self.read = true;
    }

    pub fn is_from(&self, user: &UserId) -> bool {
        &self.sender.id == user
    }

    /// Addressed to `user` and not read yet
    pub fn is_unread_for(&self, user: &UserId) -> bool {
        &self.receiver.id == user && !self.read
    }

    /// Get a preview of the message (first N characters)
    pub fn preview(&self, max_len: usize) -> String {
        if self.content.chars().count() <= max_len {
            self.content.clone()
        } else {
            let mut preview: String = self.content.chars().take(max_len.saturating_sub(3)).collect();
            preview.push_str("...");
            preview
        }
    }
}

/// Body of `POST /messages`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    pub chat_id: ChatId,
    pub receiver: UserId,
    pub content: String,
}
