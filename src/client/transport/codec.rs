//! Engine.IO v4 / Socket.IO v4 packet codec
//!
//! Two layers of framing:
//!
//! - Engine.IO packets: one type digit followed by data. A polling payload
//!   concatenates several packets separated by `\x1e`.
//! - Socket.IO packets ride inside Engine.IO `message` packets (`4`): a type
//!   digit, an optional `/namespace,`, an optional ack id and a JSON body.
//!
//! So an event on the wire reads `42["message",{...}]`.

use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use crate::shared::error::{ChatError, Result};

/// Separator between packets of a polling payload
pub const RECORD_SEPARATOR: char = '\u{1e}';

/// Data of the Engine.IO `open` packet
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OpenHandshake {
    pub sid: String,
    #[serde(default)]
    pub upgrades: Vec<String>,
    /// Milliseconds between server pings
    pub ping_interval: u64,
    /// Milliseconds the server waits for a pong
    pub ping_timeout: u64,
    #[serde(default)]
    pub max_payload: Option<u64>,
}

/// Engine.IO packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnginePacket {
    Open(OpenHandshake),
    Close,
    Ping(String),
    Pong(String),
    Message(String),
    Upgrade,
    Noop,
}

impl EnginePacket {
    pub fn decode(raw: &str) -> Result<Self> {
        let mut chars = raw.chars();
        let kind = chars
            .next()
            .ok_or_else(|| ChatError::protocol("empty engine packet"))?;
        let data = chars.as_str();

        match kind {
            '0' => Ok(EnginePacket::Open(serde_json::from_str(data)?)),
            '1' => Ok(EnginePacket::Close),
            '2' => Ok(EnginePacket::Ping(data.to_string())),
            '3' => Ok(EnginePacket::Pong(data.to_string())),
            '4' => Ok(EnginePacket::Message(data.to_string())),
            '5' => Ok(EnginePacket::Upgrade),
            '6' => Ok(EnginePacket::Noop),
            other => Err(ChatError::protocol(format!(
                "unknown engine packet type '{}'",
                other
            ))),
        }
    }

    pub fn encode(&self) -> String {
        match self {
            // The client never sends an open packet; encode its sid for completeness
            EnginePacket::Open(open) => format!("0{{\"sid\":\"{}\"}}", open.sid),
            EnginePacket::Close => "1".to_string(),
            EnginePacket::Ping(data) => format!("2{}", data),
            EnginePacket::Pong(data) => format!("3{}", data),
            EnginePacket::Message(data) => format!("4{}", data),
            EnginePacket::Upgrade => "5".to_string(),
            EnginePacket::Noop => "6".to_string(),
        }
    }
}

/// Split a polling response body into packets.
///
/// Undecodable packets are logged and skipped; the rest of the body is kept.
pub fn decode_payload(body: &str) -> Vec<EnginePacket> {
    body.split(RECORD_SEPARATOR)
        .filter(|raw| !raw.is_empty())
        .filter_map(|raw| match EnginePacket::decode(raw) {
            Ok(packet) => Some(packet),
            Err(e) => {
                warn!("[SOCKET] dropping packet {:?}: {}", raw, e);
                None
            }
        })
        .collect()
}

/// Join packets into a polling request body
pub fn encode_payload(packets: &[EnginePacket]) -> String {
    packets
        .iter()
        .map(EnginePacket::encode)
        .collect::<Vec<_>>()
        .join(&RECORD_SEPARATOR.to_string())
}

/// Socket.IO packet
#[derive(Debug, Clone, PartialEq)]
pub enum SocketPacket {
    /// Namespace connect; carries auth when sent, `{sid}` when received
    Connect(Option<Value>),
    Disconnect,
    Event { name: String, args: Vec<Value> },
    Ack { id: u64, args: Vec<Value> },
    ConnectError(String),
}

impl SocketPacket {
    pub fn event(name: impl Into<String>, args: Vec<Value>) -> Self {
        SocketPacket::Event {
            name: name.into(),
            args,
        }
    }

    pub fn decode(raw: &str) -> Result<Self> {
        let mut chars = raw.chars();
        let kind = chars
            .next()
            .ok_or_else(|| ChatError::protocol("empty socket packet"))?;
        let mut rest = chars.as_str();

        // Namespace: only the default one is used, skip it
        if rest.starts_with('/') {
            rest = match rest.find(',') {
                Some(idx) => &rest[idx + 1..],
                None => "",
            };
        }

        let digits = rest.chars().take_while(|c| c.is_ascii_digit()).count();
        let ack_id = if digits > 0 {
            rest[..digits].parse::<u64>().ok()
        } else {
            None
        };
        let body = &rest[digits..];

        match kind {
            '0' => {
                let data = if body.is_empty() {
                    None
                } else {
                    Some(serde_json::from_str(body)?)
                };
                Ok(SocketPacket::Connect(data))
            }
            '1' => Ok(SocketPacket::Disconnect),
            '2' => {
                let (name, args) = split_event(body)?;
                Ok(SocketPacket::Event { name, args })
            }
            '3' => {
                let args = match serde_json::from_str::<Value>(body)? {
                    Value::Array(items) => items,
                    other => vec![other],
                };
                Ok(SocketPacket::Ack {
                    id: ack_id.unwrap_or_default(),
                    args,
                })
            }
            '4' => {
                let message = match serde_json::from_str::<Value>(body) {
                    Ok(Value::Object(map)) => map
                        .get("message")
                        .and_then(Value::as_str)
                        .unwrap_or("connection refused")
                        .to_string(),
                    Ok(Value::String(text)) => text,
                    _ => body.to_string(),
                };
                Ok(SocketPacket::ConnectError(message))
            }
            '5' | '6' => Err(ChatError::protocol("binary packets are not supported")),
            other => Err(ChatError::protocol(format!(
                "unknown socket packet type '{}'",
                other
            ))),
        }
    }

    pub fn encode(&self) -> String {
        match self {
            SocketPacket::Connect(None) => "0".to_string(),
            SocketPacket::Connect(Some(auth)) => format!("0{}", auth),
            SocketPacket::Disconnect => "1".to_string(),
            SocketPacket::Event { name, args } => {
                let mut items = Vec::with_capacity(args.len() + 1);
                items.push(Value::String(name.clone()));
                items.extend(args.iter().cloned());
                format!("2{}", Value::Array(items))
            }
            SocketPacket::Ack { id, args } => format!("3{}{}", id, Value::Array(args.clone())),
            SocketPacket::ConnectError(message) => {
                format!("4{}", serde_json::json!({ "message": message }))
            }
        }
    }

    /// Wrap into the Engine.IO message packet that carries it
    pub fn into_engine(self) -> EnginePacket {
        EnginePacket::Message(self.encode())
    }
}

fn split_event(body: &str) -> Result<(String, Vec<Value>)> {
    let items = match serde_json::from_str::<Value>(body)? {
        Value::Array(items) => items,
        _ => return Err(ChatError::protocol("event body is not an array")),
    };
    let mut items = items.into_iter();
    match items.next() {
        Some(Value::String(name)) => Ok((name, items.collect())),
        _ => Err(ChatError::protocol("event without a name")),
    }
}
