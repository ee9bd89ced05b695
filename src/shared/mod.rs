//! Shared Module
//!
//! This module contains the platform-agnostic types of the chat client: the
//! data model returned by the messaging backend, the realtime wire events,
//! configuration and errors.
//!
//! # Overview
//!
//! Nothing in here performs I/O. The types are designed for serialization
//! over the backend's REST API and Socket.IO events, and are consumed by the
//! `client` module.

/// Real-time event types
pub mod event;

/// Shared error types
pub mod error;

/// Application configuration
pub mod config;

/// Conversations, messages and user references
pub mod messaging;

/// Re-export commonly used types for convenience
pub use config::{AppConfig, AppConfigBuilder, ConfigError};
pub use error::{ChatError, Result};
pub use event::{ConnectionEvent, InboundEvent, OutboundEvent};
