//! Shared Error Types
//!
//! Every fallible operation in the chat client reports one of these variants.
//! The messaging client never lets them escape to the caller's render loop:
//! they are caught at the boundary of each async operation, logged, and turned
//! into the session's visible error string.
//!
//! # Error Categories
//!
//! - `Unauthenticated` - no current user is configured
//! - `Http` / `Network` - REST requests that failed or returned a non-2xx status
//! - `Connection` - the realtime transport could not connect or was lost
//! - `Protocol` - a packet or event payload could not be understood
//! - `Serialization` - JSON encoding or decoding failures
//! - `Config` - invalid configuration
//! - `Validation` - invalid local input
//!
//! # Usage
//!
//! ```rust
//! use sustainafood_chat::shared::error::ChatError;
//!
//! let error = ChatError::validation("content", "Message text cannot be empty");
//! assert!(error.to_string().contains("content"));
//! ```
use crate::shared::config::ConfigError;
use thiserror::Error;

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, ChatError>;

/// Errors raised by the chat client
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChatError {
    /// No logged-in user is available
    #[error("You must be logged in to access messaging.")]
    Unauthenticated,

    /// The backend answered with a non-success status
    #[error("HTTP {status}: {message}")]
    Http {
        /// HTTP status code
        status: u16,
        /// Error text taken from the response body when present
        message: String,
    },

    /// The request never produced a response
    #[error("Network error: {0}")]
    Network(String),

    /// Realtime connection failure
    #[error("Connection error: {0}")]
    Connection(String),

    /// Malformed packet or event payload
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// JSON serialization or deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Data validation error
    #[error("Validation error in field '{field}': {message}")]
    Validation {
        /// The field that failed validation
        field: String,
        /// Human-readable error message
        message: String,
    },
}

impl ChatError {
    /// Create an HTTP status error
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self::Http {
            status,
            message: message.into(),
        }
    }

    /// Create a network error
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network(message.into())
    }

    /// Create a connection error
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection(message.into())
    }

    /// Create a protocol error
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol(message.into())
    }

    /// Create a validation error
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for ChatError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(format!("JSON error: {}", err))
    }
}

impl From<reqwest::Error> for ChatError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => Self::http(status.as_u16(), err.to_string()),
            None => Self::network(err.to_string()),
        }
    }
}
