//! SustainaFood Chat - Main Library
//!
//! Real-time one-to-one messaging client for the SustainaFood food-donation
//! platform. Donors, recipients and transporters exchange messages about a
//! donation through a conversation keyed by the two users' ids.
//!
//! # Overview
//!
//! This library provides:
//! - A Socket.IO connection to the messaging backend (HTTP long-polling)
//! - REST fetchers for conversations, profiles and message history
//! - A messaging client state machine that reconciles pushed events,
//!   read receipts and typing notifications into local session state
//!
//! # Module Structure
//!
//! - **`shared`** - Platform-agnostic types
//!   - Messages, conversations and user references
//!   - Realtime wire events
//!   - Configuration and error types
//!
//! - **`client`** - Everything that talks to the backend
//!   - `api` - REST client (`ChatApi`, `HttpChatApi`)
//!   - `transport` - realtime connection (`Transport`, `Connection`, `PollingTransport`)
//!   - `messaging` - the `MessagingClient` state machine
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use sustainafood_chat::client::{Config, HttpChatApi, MessagingClient, PollingTransport};
//! use sustainafood_chat::shared::messaging::UserId;
//!
//! # async fn example() -> sustainafood_chat::shared::Result<()> {
//! let config = Config::from_env(None)?;
//! let api = Arc::new(HttpChatApi::new(config.clone()));
//! let transport = Arc::new(PollingTransport::new(config.clone()));
//! let mut client = MessagingClient::new(config, api, transport)?;
//!
//! client.select_recipient(UserId::from("65f0a1"));
//! loop {
//!     let update = client.next_event().await;
//!     println!("{:?} -> {} messages", update, client.state().messages.len());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Thread Safety
//!
//! The `MessagingClient` is driven by a single caller through `&mut self`.
//! Network work runs in spawned tokio tasks that report back over a channel,
//! so no method blocks the caller's render loop.

/// Shared types and data structures
pub mod shared;

/// Backend client: REST, realtime transport and session state machine
pub mod client;
