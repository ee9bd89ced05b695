//! In-memory `Transport`
//!
//! Every `connect` creates a channel pair and keeps the driver side, so a
//! test can push events into the newest connection, read what the client
//! emitted, and count how many connections are still alive.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use sustainafood_chat::client::config::Credentials;
use sustainafood_chat::client::transport::{channel, Connection, ConnectionPeer, Transport};
use sustainafood_chat::shared::error::{ChatError, Result};
use sustainafood_chat::shared::event::{ConnectionEvent, InboundEvent, OutboundEvent};
use tokio::sync::Semaphore;

struct Link {
    peer: ConnectionPeer,
    emitted: Vec<OutboundEvent>,
}

impl Link {
    fn collect(&mut self) {
        while let Ok(event) = self.peer.emitted.try_recv() {
            self.emitted.push(event);
        }
    }
}

#[derive(Default)]
pub struct FakeTransport {
    links: Mutex<Vec<Link>>,
    credentials: Mutex<Vec<Credentials>>,
    error: Mutex<Option<ChatError>>,
    gate: Mutex<Option<Arc<Semaphore>>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_with(&self, error: ChatError) {
        *self.error.lock().unwrap() = Some(error);
    }

    /// Hold connects until [`FakeTransport::release`]
    pub fn gate(&self) {
        *self.gate.lock().unwrap() = Some(Arc::new(Semaphore::new(0)));
    }

    pub fn release(&self, n: usize) {
        if let Some(gate) = self.gate.lock().unwrap().as_ref() {
            gate.add_permits(n);
        }
    }

    /// Number of successful connects
    pub fn connects(&self) -> usize {
        self.links.lock().unwrap().len()
    }

    pub fn credentials(&self) -> Vec<Credentials> {
        self.credentials.lock().unwrap().clone()
    }

    /// Connections whose client side still exists
    pub fn live_connections(&self) -> usize {
        self.links
            .lock()
            .unwrap()
            .iter()
            .filter(|link| link.peer.is_open())
            .count()
    }

    pub fn is_open(&self, index: usize) -> bool {
        self.links.lock().unwrap()[index].peer.is_open()
    }

    /// Deliver an event on the newest connection
    pub fn push(&self, event: InboundEvent) -> bool {
        self.deliver(ConnectionEvent::Inbound(event))
    }

    /// Close the newest connection from the server side
    pub fn close_latest(&self, reason: &str) -> bool {
        self.deliver(ConnectionEvent::Closed {
            reason: Some(reason.to_string()),
        })
    }

    fn deliver(&self, event: ConnectionEvent) -> bool {
        self.links
            .lock()
            .unwrap()
            .last()
            .map(|link| link.peer.deliver(event))
            .unwrap_or(false)
    }

    /// Everything the client emitted on connection `index`
    pub fn emitted(&self, index: usize) -> Vec<OutboundEvent> {
        let mut links = self.links.lock().unwrap();
        let link = &mut links[index];
        link.collect();
        link.emitted.clone()
    }

    /// Everything emitted on the newest connection
    pub fn emitted_latest(&self) -> Vec<OutboundEvent> {
        let last = self.connects().saturating_sub(1);
        self.emitted(last)
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn connect(&self, credentials: &Credentials) -> Result<Connection> {
        let gate = self.gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }

        self.credentials.lock().unwrap().push(credentials.clone());
        if let Some(error) = self.error.lock().unwrap().clone() {
            return Err(error);
        }

        let (connection, peer) = channel();
        self.links.lock().unwrap().push(Link {
            peer,
            emitted: Vec::new(),
        });
        Ok(connection)
    }
}
