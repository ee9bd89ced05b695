//! Messaging Session State
//!
//! Everything a front-end renders: the conversation list, the open
//! conversation and the UI flags around it. Only the `MessagingClient`
//! mutates it; front-ends get a shared reference.

use crate::shared::messaging::{ChatId, ChatMessage, Conversation, UserId, UserRef};

/// Lifecycle of the open conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionPhase {
    /// A conversation is being opened; history not loaded yet
    #[default]
    Idle,
    /// Connected with history loaded; pushed events are applied
    Open,
    /// The conversation was closed or its connection was lost
    Closed,
}

/// The state for the messaging UI
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    /// Other party of the open conversation
    pub selected_recipient: Option<UserId>,
    /// Chat id of the open conversation
    pub chat_id: Option<ChatId>,
    /// Profile of the selected recipient, once fetched
    pub recipient: Option<UserRef>,
    /// Messages of the open conversation, in arrival order
    pub messages: Vec<ChatMessage>,
    /// Whether the recipient is typing
    pub is_typing: bool,
    pub is_chat_collapsed: bool,
    /// A message from the recipient arrived while collapsed
    pub has_new_message: bool,

    /// Conversations as last fetched
    pub conversations: Vec<Conversation>,
    /// Conversations matching `search_query`
    pub filtered_conversations: Vec<Conversation>,
    pub search_query: String,

    /// Compose field text
    pub draft: String,

    pub phase: SessionPhase,
    /// Error to show to the user
    pub error: Option<String>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_open_conversation(&self) -> bool {
        self.chat_id.is_some()
    }

    /// Find a message of the open conversation by id
    pub fn contains_message(&self, message: &ChatMessage) -> bool {
        self.messages.iter().any(|m| m.id == message.id)
    }

    /// Reset the open-conversation part of the state
    pub(crate) fn clear_conversation(&mut self) {
        self.selected_recipient = None;
        self.chat_id = None;
        self.recipient = None;
        self.messages.clear();
        self.is_typing = false;
        self.is_chat_collapsed = false;
        self.has_new_message = false;
    }

    /// One-line text rendering of the open conversation
    pub fn transcript(&self, me: &UserId) -> String {
        let name = self
            .recipient
            .as_ref()
            .map(|r| r.name.as_str())
            .unwrap_or_default();

        let body = if self.messages.is_empty() {
            format!("No conversation ongoing with {}.", name)
        } else {
            let lines = self
                .messages
                .iter()
                .map(|m| {
                    let author = if m.is_from(me) { "You" } else { m.sender.name.as_str() };
                    format!("{}: {}", author, m.content)
                })
                .collect::<Vec<_>>()
                .join(". ");
            format!("Conversation with {}: {}", name, lines)
        };

        format!("Chat with {}. {}", name, body)
    }
}
