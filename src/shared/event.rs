/**
 * Real-time Event Types
 *
 * Typed versions of the events exchanged over the realtime connection.
 * Payloads are validated here, at the boundary, so the session never sees a
 * loosely shaped object: anything that does not parse becomes a protocol
 * error and is dropped by the caller.
 *
 * Wire names follow the backend: `joinChat`, `typing`, `stopTyping` go out;
 * `message`, `typing`, `stopTyping` come in.
 */
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::shared::error::{ChatError, Result};
use crate::shared::messaging::{ChatId, ChatMessage, UserId};

/// Typing notification payload sent by the client
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
struct TypingPayload {
    chat_id: ChatId,
    user_id: UserId,
}

/// Typing notification payload relayed by the backend
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RelayedTyping {
    user_id: UserId,
}

/// Events the client emits
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundEvent {
    /// Subscribe to the room of a conversation
    JoinChat { chat_id: ChatId },
    /// The local user started typing
    Typing { chat_id: ChatId, user_id: UserId },
    /// The local user stopped typing
    StopTyping { chat_id: ChatId, user_id: UserId },
}

impl OutboundEvent {
    /// Wire name of the event
    pub fn name(&self) -> &'static str {
        match self {
            OutboundEvent::JoinChat { .. } => "joinChat",
            OutboundEvent::Typing { .. } => "typing",
            OutboundEvent::StopTyping { .. } => "stopTyping",
        }
    }

    /// Event arguments as JSON values
    pub fn args(&self) -> Vec<Value> {
        match self {
            OutboundEvent::JoinChat { chat_id } => vec![Value::String(chat_id.to_string())],
            OutboundEvent::Typing { chat_id, user_id }
            | OutboundEvent::StopTyping { chat_id, user_id } => {
                let payload = TypingPayload {
                    chat_id: chat_id.clone(),
                    user_id: user_id.clone(),
                };
                vec![serde_json::to_value(payload).unwrap_or(Value::Null)]
            }
        }
    }
}

/// Events pushed by the backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    /// A message was posted to a room the client joined
    Message(Box<ChatMessage>),
    /// A participant started typing
    Typing { user_id: UserId },
    /// A participant stopped typing
    StopTyping { user_id: UserId },
    /// An event this client does not handle
    Unknown(String),
}

impl InboundEvent {
    /// Parse an event from its wire name and arguments
    pub fn parse(name: &str, args: Vec<Value>) -> Result<Self> {
        let first = args.into_iter().next();
        let payload = |name: &str| {
            first
                .clone()
                .ok_or_else(|| ChatError::protocol(format!("'{}' event without payload", name)))
        };

        match name {
            "message" => {
                let message: ChatMessage = serde_json::from_value(payload(name)?)?;
                Ok(InboundEvent::Message(Box::new(message)))
            }
            "typing" => {
                let typing: RelayedTyping = serde_json::from_value(payload(name)?)?;
                Ok(InboundEvent::Typing {
                    user_id: typing.user_id,
                })
            }
            "stopTyping" => {
                let typing: RelayedTyping = serde_json::from_value(payload(name)?)?;
                Ok(InboundEvent::StopTyping {
                    user_id: typing.user_id,
                })
            }
            other => Ok(InboundEvent::Unknown(other.to_string())),
        }
    }

    /// User that triggered a typing event
    pub fn typing_user(&self) -> Option<&UserId> {
        match self {
            InboundEvent::Typing { user_id } | InboundEvent::StopTyping { user_id } => Some(user_id),
            _ => None,
        }
    }
}

/// What a realtime connection yields
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// A parsed inbound event
    Inbound(InboundEvent),
    /// The connection ended; no further events follow
    Closed { reason: Option<String> },
}
