//! Client Module
//!
//! Everything that talks to the messaging backend.
//!
//! # Overview
//!
//! - `config` - endpoint configuration and credentials
//! - `api` - REST requests ([`ChatApi`], [`HttpChatApi`])
//! - `transport` - realtime connection ([`Transport`], [`PollingTransport`])
//! - `messaging` - the [`MessagingClient`] state machine

pub mod api;
pub mod config;
pub mod messaging;
pub mod transport;

pub use api::{ChatApi, HttpChatApi};
pub use config::{Config, Credentials};
pub use messaging::{MessagingClient, SessionPhase, SessionState, SessionUpdate};
pub use transport::{Connection, PollingTransport, Transport};
