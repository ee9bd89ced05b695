//! REST client for the messaging backend
//!
//! # Overview
//!
//! [`ChatApi`] is the seam between the messaging client and the backend's
//! HTTP endpoints. [`HttpChatApi`] implements it with `reqwest`:
//!
//! | Operation | Request |
//! |-----------|---------|
//! | `list_conversations` | `GET /messages/conversations` |
//! | `fetch_user` | `GET /users/details/{id}` |
//! | `fetch_messages` | `GET /messages/{chatId}/messages` |
//! | `mark_as_read` | `POST /messages/{chatId}/mark-as-read` |
//! | `send_message` | `POST /messages` |
//!
//! Every request carries `X-User-Id` and, when a token is configured,
//! `Authorization: Bearer`. Non-2xx answers become [`ChatError::Http`] with the
//! text of the backend's `{"error": "..."}` body when there is one.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::client::config::Config;
use crate::shared::error::{ChatError, Result};
use crate::shared::messaging::{
    ChatId, ChatMessage, Conversation, SendMessageRequest, UserId, UserRef,
};

/// REST operations the messaging client depends on
#[async_trait]
pub trait ChatApi: Send + Sync + 'static {
    /// Conversations the current user takes part in
    async fn list_conversations(&self) -> Result<Vec<Conversation>>;

    /// Profile of a user
    async fn fetch_user(&self, user_id: &UserId) -> Result<UserRef>;

    /// Full message history of a conversation, oldest first
    async fn fetch_messages(&self, chat_id: &ChatId) -> Result<Vec<ChatMessage>>;

    /// Mark every message addressed to the current user in `chat_id` as read
    async fn mark_as_read(&self, chat_id: &ChatId) -> Result<()>;

    /// Post a new message; the backend also pushes it on the socket
    async fn send_message(&self, request: &SendMessageRequest) -> Result<ChatMessage>;
}

/// Error body returned by the backend
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(alias = "message")]
    error: String,
}

/// `reqwest` implementation of [`ChatApi`]
#[derive(Debug, Clone)]
pub struct HttpChatApi {
    config: Config,
    client: Client,
}

impl HttpChatApi {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            client: Client::new(),
        }
    }

    fn with_headers(&self, mut request: RequestBuilder) -> RequestBuilder {
        if let Some(user_id) = self.config.user_id() {
            request = request.header("X-User-Id", user_id.as_str());
        }
        if let Some(token) = self.config.token() {
            request = request.header("Authorization", format!("Bearer {}", token));
        }
        request
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.config.api_url(path);
        debug!("[API] GET {}", url);
        let response = self.with_headers(self.client.get(&url)).send().await?;
        let response = check_status(response).await?;
        Ok(response.json::<T>().await?)
    }
}

/// Map a non-success response to `ChatError::Http`
async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&text)
        .map(|body| body.error)
        .unwrap_or_else(|_| {
            if text.trim().is_empty() {
                status.canonical_reason().unwrap_or("request failed").to_string()
            } else {
                text
            }
        });
    warn!("[API] request failed with {}: {}", status, message);
    Err(ChatError::http(status.as_u16(), message))
}

#[async_trait]
impl ChatApi for HttpChatApi {
    async fn list_conversations(&self) -> Result<Vec<Conversation>> {
        self.get_json("/messages/conversations").await
    }

    async fn fetch_user(&self, user_id: &UserId) -> Result<UserRef> {
        self.get_json(&format!("/users/details/{}", user_id)).await
    }

    async fn fetch_messages(&self, chat_id: &ChatId) -> Result<Vec<ChatMessage>> {
        self.get_json(&format!("/messages/{}/messages", chat_id)).await
    }

    async fn mark_as_read(&self, chat_id: &ChatId) -> Result<()> {
        let url = self.config.api_url(&format!("/messages/{}/mark-as-read", chat_id));
        debug!("[API] POST {}", url);
        let response = self.with_headers(self.client.post(&url)).send().await?;
        check_status(response).await?;
        Ok(())
    }

    async fn send_message(&self, request: &SendMessageRequest) -> Result<ChatMessage> {
        let url = self.config.api_url("/messages");
        debug!("[API] POST {} (chat {})", url, request.chat_id);
        let response = self
            .with_headers(self.client.post(&url))
            .json(request)
            .send()
            .await?;
        let response = check_status(response).await?;
        Ok(response.json::<ChatMessage>().await?)
    }
}
