//! Conversation Data Structure
//!
//! A conversation is the logical channel between exactly two users. The
//! client never creates one: the backend groups messages by `chatId` and
//! returns one entry per chat in `GET /messages/conversations`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::user::{UserId, UserRef};

/// Separator between the two sorted user ids of a chat id
const CHAT_ID_SEPARATOR: &str = "_";

/// Identifier of a one-to-one conversation
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChatId(String);

impl ChatId {
    /// Derive the chat id of the conversation between `a` and `b`.
    ///
    /// The ids are sorted before joining, so both participants compute the
    /// same value independently.
    pub fn for_pair(a: &UserId, b: &UserId) -> Self {
        let (first, second) = if a <= b { (a, b) } else { (b, a) };
        Self(format!("{}{}{}", first, CHAT_ID_SEPARATOR, second))
    }

    /// Wrap an id received from the backend
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Preview of the last message of a conversation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LastMessage {
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

/// Represents a conversation between two users
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub chat_id: ChatId,
    pub participants: Vec<UserRef>,
    #[serde(default)]
    pub last_message: Option<LastMessage>,
    /// Messages addressed to the current user that are still unread
    #[serde(default)]
    pub unread_count: u32,
}

impl Conversation {
    /// Get the other participant
    pub fn other_participant(&self, current_user_id: &UserId) -> Option<&UserRef> {
        self.participants.iter().find(|p| &p.id != current_user_id)
    }

    /// Preview text shown in the conversation list
    pub fn preview(&self) -> &str {
        self.last_message
            .as_ref()
            .map(|m| m.content.as_str())
            .unwrap_or("No messages yet...")
    }
}
