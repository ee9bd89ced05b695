//! Realtime transport
//!
//! # Overview
//!
//! A [`Transport`] opens one [`Connection`] per call. The connection is a
//! pair of channels: typed [`OutboundEvent`]s go out through [`Connection::emit`],
//! typed [`ConnectionEvent`]s come back through [`Connection::recv`]. Whatever
//! drives the wire (the polling loop of [`PollingTransport`], or a test double)
//! holds the other end, a [`ConnectionPeer`].
//!
//! Dropping the `Connection` closes it: background workers are aborted and
//! the outbound channel closes, which the driver treats as a disconnect.

pub mod codec;
pub mod polling;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::client::config::Credentials;
use crate::shared::error::{ChatError, Result};
use crate::shared::event::{ConnectionEvent, OutboundEvent};

pub use polling::PollingTransport;

/// Opens realtime connections
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Connect and authenticate; resolves once the server accepted the connection
    async fn connect(&self, credentials: &Credentials) -> Result<Connection>;
}

/// Client side of an open realtime connection
#[derive(Debug)]
pub struct Connection {
    outbound: mpsc::UnboundedSender<OutboundEvent>,
    inbound: mpsc::UnboundedReceiver<ConnectionEvent>,
    workers: Vec<JoinHandle<()>>,
    closed: bool,
}

/// Driver side of a [`Connection`]
#[derive(Debug)]
pub struct ConnectionPeer {
    /// Events delivered to the connection owner
    pub events: mpsc::UnboundedSender<ConnectionEvent>,
    /// Events the owner emitted
    pub emitted: mpsc::UnboundedReceiver<OutboundEvent>,
}

impl ConnectionPeer {
    /// Deliver an event; false once the connection was dropped
    pub fn deliver(&self, event: ConnectionEvent) -> bool {
        self.events.send(event).is_ok()
    }

    /// Whether the owning `Connection` still exists
    pub fn is_open(&self) -> bool {
        !self.events.is_closed()
    }
}

/// Create a connected `Connection` / `ConnectionPeer` pair
pub fn channel() -> (Connection, ConnectionPeer) {
    let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
    let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
    let connection = Connection {
        outbound: outbound_tx,
        inbound: inbound_rx,
        workers: Vec::new(),
        closed: false,
    };
    let peer = ConnectionPeer {
        events: inbound_tx,
        emitted: outbound_rx,
    };
    (connection, peer)
}

impl Connection {
    /// Tie a background task to the connection's lifetime
    pub fn attach_worker(&mut self, handle: JoinHandle<()>) {
        self.workers.push(handle);
    }

    /// Queue an event for sending
    pub fn emit(&self, event: OutboundEvent) -> Result<()> {
        debug!("[SOCKET] emit {}", event.name());
        self.outbound
            .send(event)
            .map_err(|e| ChatError::connection(format!("connection closed, dropped '{}'", e.0.name())))
    }

    /// Next event; `None` once the driver is gone and everything was received.
    ///
    /// A `Closed` event is yielded at most once and ends the stream.
    pub async fn recv(&mut self) -> Option<ConnectionEvent> {
        if self.closed {
            return None;
        }
        let event = self.inbound.recv().await;
        self.note(event)
    }

    /// Non-blocking variant of [`Connection::recv`]
    pub fn try_recv(&mut self) -> Option<ConnectionEvent> {
        if self.closed {
            return None;
        }
        match self.inbound.try_recv() {
            Ok(event) => self.note(Some(event)),
            Err(mpsc::error::TryRecvError::Empty) => None,
            Err(mpsc::error::TryRecvError::Disconnected) => self.note(None),
        }
    }

    fn note(&mut self, event: Option<ConnectionEvent>) -> Option<ConnectionEvent> {
        match event {
            Some(ConnectionEvent::Closed { reason }) => {
                self.closed = true;
                Some(ConnectionEvent::Closed { reason })
            }
            Some(event) => Some(event),
            // Driver vanished without saying goodbye
            None => {
                self.closed = true;
                Some(ConnectionEvent::Closed {
                    reason: Some("transport dropped".to_string()),
                })
            }
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed || self.outbound.is_closed()
    }

    /// Close the connection
    pub fn close(self) {
        drop(self);
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.inbound.close();
        for worker in self.workers.drain(..) {
            worker.abort();
        }
    }
}
