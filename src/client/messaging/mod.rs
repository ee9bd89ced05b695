//! Messaging Module
//!
//! The messaging client state machine and the pieces it is built from.
//!
//! - `session` - [`MessagingClient`], connection lifecycle and event handling
//! - `state` - [`SessionState`] rendered by front-ends
//! - `typing` - typing indicator debouncing
//! - `read_receipts` - unread bookkeeping for mark-as-read
//! - `search` - conversation list filtering

pub mod read_receipts;
pub mod search;
pub mod session;
pub mod state;
pub mod typing;

pub use search::{filter_conversations, total_unread};
pub use session::{MessagingClient, SessionUpdate};
pub use state::{SessionPhase, SessionState};
pub use typing::{TypingDebouncer, TypingSignal};
