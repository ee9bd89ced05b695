//! User references
//!
//! The backend populates message senders, receivers and conversation
//! participants with a small `{_id, name, photo}` projection of the user.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Backend-assigned user identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for UserId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Lightweight user projection used across messages and conversations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRef {
    #[serde(rename = "_id")]
    pub id: UserId,
    #[serde(default)]
    pub name: String,
    /// Relative path of the profile photo on the backend, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo: Option<String>,
}

impl UserRef {
    pub fn new(id: impl Into<UserId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            photo: None,
        }
    }

    /// Absolute photo URL on the given backend
    pub fn photo_url(&self, server_url: &str) -> Option<String> {
        self.photo
            .as_deref()
            .filter(|p| !p.is_empty())
            .map(|p| format!("{}/{}", server_url.trim_end_matches('/'), p.trim_start_matches('/')))
    }
}
