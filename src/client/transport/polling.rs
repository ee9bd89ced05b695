/**
 * Socket.IO over HTTP long-polling
 *
 * Connection steps:
 * 1. `GET ?EIO=4&transport=polling` returns the Engine.IO open packet (sid)
 * 2. `POST 40{auth}` asks to join the default namespace
 * 3. The next poll answers `40{sid}` (accepted) or `44{message}` (refused)
 *
 * Afterwards a reader task keeps one GET outstanding and turns packets into
 * `ConnectionEvent`s, while a writer task serializes every POST: emitted
 * events, pongs and the final disconnect. Engine.IO rejects overlapping
 * POSTs from the same session, hence the single writer.
 */
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Map, Value};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::codec::{decode_payload, encode_payload, EnginePacket, SocketPacket};
use super::{channel, Connection, ConnectionPeer, Transport};
use crate::client::config::{Config, Credentials};
use crate::shared::error::{ChatError, Result};
use crate::shared::event::{ConnectionEvent, InboundEvent, OutboundEvent};

/// Engine.IO protocol revision spoken by the backend
const ENGINE_IO_VERSION: &str = "4";

/// Transport backed by Engine.IO polling requests
#[derive(Debug, Clone)]
pub struct PollingTransport {
    config: Config,
    client: Client,
}

impl PollingTransport {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            client: Client::new(),
        }
    }
}

/// One Engine.IO session, addressed by its sid
#[derive(Debug, Clone)]
struct Session {
    client: Client,
    url: String,
    sid: String,
}

impl Session {
    async fn poll(&self) -> Result<Vec<EnginePacket>> {
        let response = self
            .client
            .get(&self.url)
            .query(&[
                ("EIO", ENGINE_IO_VERSION),
                ("transport", "polling"),
                ("sid", self.sid.as_str()),
            ])
            .send()
            .await?;
        let body = ok_body(response).await?;
        Ok(decode_payload(&body))
    }

    async fn post(&self, packets: &[EnginePacket]) -> Result<()> {
        let response = self
            .client
            .post(&self.url)
            .query(&[
                ("EIO", ENGINE_IO_VERSION),
                ("transport", "polling"),
                ("sid", self.sid.as_str()),
            ])
            .header("Content-Type", "text/plain;charset=UTF-8")
            .body(encode_payload(packets))
            .send()
            .await?;
        ok_body(response).await?;
        Ok(())
    }
}

async fn ok_body(response: reqwest::Response) -> Result<String> {
    let status = response.status();
    let body = response.text().await?;
    if status.is_success() {
        Ok(body)
    } else {
        Err(ChatError::connection(format!("HTTP {}: {}", status.as_u16(), body.trim())))
    }
}

/// Auth object sent with the namespace connect
fn auth_payload(credentials: &Credentials) -> Option<Value> {
    let mut auth = Map::new();
    if let Some(token) = &credentials.token {
        auth.insert("token".to_string(), Value::String(token.clone()));
    }
    if let Some(user_id) = &credentials.user_id {
        auth.insert("userId".to_string(), Value::String(user_id.to_string()));
    }
    if auth.is_empty() {
        None
    } else {
        Some(Value::Object(auth))
    }
}

#[async_trait]
impl Transport for PollingTransport {
    async fn connect(&self, credentials: &Credentials) -> Result<Connection> {
        let url = self.config.socket_url();
        info!("[SOCKET] Connecting to {}", url);

        // 1. Engine.IO handshake
        let response = self
            .client
            .get(&url)
            .query(&[("EIO", ENGINE_IO_VERSION), ("transport", "polling")])
            .send()
            .await
            .map_err(|e| ChatError::connection(e.to_string()))?;
        let body = ok_body(response).await?;
        let open = match decode_payload(&body).into_iter().next() {
            Some(EnginePacket::Open(open)) => open,
            other => {
                return Err(ChatError::protocol(format!(
                    "expected open packet, got {:?}",
                    other
                )))
            }
        };
        debug!("[SOCKET] Engine session {} (ping every {}ms)", open.sid, open.ping_interval);

        let session = Session {
            client: self.client.clone(),
            url,
            sid: open.sid,
        };

        // 2. Namespace connect
        session
            .post(&[SocketPacket::Connect(auth_payload(credentials)).into_engine()])
            .await?;

        // 3. Wait for the verdict; keep anything that follows it
        let mut backlog = Vec::new();
        let mut accepted = false;
        while !accepted {
            for packet in session.poll().await? {
                if accepted {
                    backlog.push(packet);
                    continue;
                }
                match packet {
                    EnginePacket::Message(data) => match SocketPacket::decode(&data)? {
                        SocketPacket::Connect(_) => accepted = true,
                        SocketPacket::ConnectError(message) => {
                            warn!("[SOCKET] Connection refused: {}", message);
                            return Err(ChatError::connection(message));
                        }
                        other => debug!("[SOCKET] ignoring {:?} before connect", other),
                    },
                    EnginePacket::Ping(data) => {
                        session.post(&[EnginePacket::Pong(data)]).await?;
                    }
                    EnginePacket::Close => {
                        return Err(ChatError::connection("closed during handshake"));
                    }
                    _ => {}
                }
            }
        }
        info!("[SOCKET] Connected (sid {})", session.sid);

        let (mut connection, peer) = channel();
        let ConnectionPeer { events, emitted } = peer;
        let (control_tx, control_rx) = mpsc::unbounded_channel();

        tokio::spawn(write_loop(session.clone(), emitted, control_rx));
        let reader = tokio::spawn(read_loop(session, backlog, events, control_tx));
        connection.attach_worker(reader);

        Ok(connection)
    }
}

/// Serializes every POST of the session.
///
/// Ends when the owning `Connection` goes away, sending the disconnect.
async fn write_loop(
    session: Session,
    mut emitted: mpsc::UnboundedReceiver<OutboundEvent>,
    mut control: mpsc::UnboundedReceiver<EnginePacket>,
) {
    let mut control_open = true;
    loop {
        let packet = tokio::select! {
            event = emitted.recv() => match event {
                Some(event) => SocketPacket::event(event.name(), event.args()).into_engine(),
                None => break,
            },
            packet = control.recv(), if control_open => match packet {
                Some(packet) => packet,
                None => {
                    control_open = false;
                    continue;
                }
            },
        };
        if let Err(e) = session.post(&[packet]).await {
            error!("[SOCKET] POST failed: {}", e);
        }
    }

    debug!("[SOCKET] Disconnecting {}", session.sid);
    let goodbye = [SocketPacket::Disconnect.into_engine(), EnginePacket::Close];
    if let Err(e) = session.post(&goodbye).await {
        debug!("[SOCKET] Disconnect not delivered: {}", e);
    }
}

/// Keeps a poll outstanding and forwards what arrives
async fn read_loop(
    session: Session,
    backlog: Vec<EnginePacket>,
    events: mpsc::UnboundedSender<ConnectionEvent>,
    control: mpsc::UnboundedSender<EnginePacket>,
) {
    let mut pending = backlog;
    loop {
        for packet in pending.drain(..) {
            match handle_packet(packet, &control) {
                Step::Continue => {}
                Step::Deliver(event) => {
                    if events.send(ConnectionEvent::Inbound(event)).is_err() {
                        return;
                    }
                }
                Step::Stop(reason) => {
                    info!("[SOCKET] Connection closed: {:?}", reason);
                    let _ = events.send(ConnectionEvent::Closed { reason });
                    return;
                }
            }
        }

        match session.poll().await {
            Ok(packets) => pending = packets,
            Err(e) => {
                error!("[SOCKET] Poll failed: {}", e);
                let _ = events.send(ConnectionEvent::Closed {
                    reason: Some(e.to_string()),
                });
                return;
            }
        }
    }
}

enum Step {
    Continue,
    Deliver(InboundEvent),
    Stop(Option<String>),
}

fn handle_packet(packet: EnginePacket, control: &mpsc::UnboundedSender<EnginePacket>) -> Step {
    match packet {
        EnginePacket::Ping(data) => {
            let _ = control.send(EnginePacket::Pong(data));
            Step::Continue
        }
        EnginePacket::Close => Step::Stop(Some("server closed the session".to_string())),
        EnginePacket::Message(data) => match SocketPacket::decode(&data) {
            Ok(SocketPacket::Event { name, args }) => match InboundEvent::parse(&name, args) {
                Ok(InboundEvent::Unknown(name)) => {
                    debug!("[SOCKET] ignoring event '{}'", name);
                    Step::Continue
                }
                Ok(event) => Step::Deliver(event),
                Err(e) => {
                    warn!("[SOCKET] dropping malformed '{}' event: {}", name, e);
                    Step::Continue
                }
            },
            Ok(SocketPacket::Disconnect) => Step::Stop(Some("server disconnect".to_string())),
            Ok(other) => {
                debug!("[SOCKET] ignoring {:?}", other);
                Step::Continue
            }
            Err(e) => {
                warn!("[SOCKET] dropping packet: {}", e);
                Step::Continue
            }
        },
        _ => Step::Continue,
    }
}
