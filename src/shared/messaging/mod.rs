//! Messaging Module
//!
//! Data structures exchanged with the messaging backend:
//!
//! - `UserRef` - populated sender/receiver/participant projection
//! - `ChatMessage` - a message in a conversation
//! - `Conversation` - an entry of the conversation list
//!
//! # Usage
//!
//! ```rust
//! use sustainafood_chat::shared::messaging::{ChatId, UserId};
//!
//! let a = UserId::from("alice");
//! let b = UserId::from("bob");
//! assert_eq!(ChatId::for_pair(&a, &b), ChatId::for_pair(&b, &a));
//! ```

pub mod conversation;
pub mod message;
pub mod user;

// Re-export all types
pub use conversation::{ChatId, Conversation, LastMessage};
pub use message::{ChatMessage, MessageId, SendMessageRequest};
pub use user::{UserId, UserRef};
