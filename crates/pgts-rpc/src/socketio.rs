//! Socket.IO packets as carried over an Engine.IO v4 WebSocket.
//!
//! Every text frame starts with an Engine.IO packet type. Type `4`
//! (message) wraps a Socket.IO packet, which has its own type digit, an
//! optional `/namespace,` and an optional ack id before the JSON payload:
//!
//! ```text
//! 0{"sid":"x","pingInterval":25000,"pingTimeout":20000}   open
//! 2                                                        ping
//! 40{"sid":"y"}                                            namespace connected
//! 42["notification","{\"method\":\"connection/complete\"}"] event
//! 44{"message":"Connection rejected by server"}           connect error
//! ```

use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

/// Query string that selects Engine.IO v4 over a plain WebSocket.
pub const WEBSOCKET_QUERY: &str = "EIO=4&transport=websocket";
/// Connect to the default namespace.
pub const CONNECT: &str = "40";
/// Leave the default namespace.
pub const DISCONNECT: &str = "41";
/// Reply to a server ping.
pub const PONG: &str = "3";

/// Payload of the Engine.IO `open` packet.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenInfo {
    /// Engine.IO session id.
    pub sid: String,
    /// Server ping period in milliseconds.
    pub ping_interval: u64,
    /// Grace period after a missed ping, in milliseconds.
    pub ping_timeout: u64,
    /// Largest accepted payload.
    #[serde(default)]
    pub max_payload: Option<u64>,
}

impl OpenInfo {
    /// How long the connection may stay silent before it counts as dead.
    pub fn liveness(&self) -> Duration {
        Duration::from_millis(self.ping_interval.saturating_add(self.ping_timeout))
    }
}

/// A decoded text frame.
#[derive(Clone, Debug, PartialEq)]
pub enum Packet {
    /// Engine.IO handshake.
    Open(OpenInfo),
    /// Engine.IO close.
    Close,
    /// Server heartbeat, answer with [`PONG`].
    Ping,
    /// Heartbeat reply.
    Pong,
    /// Engine.IO upgrade or noop.
    Noop,
    /// Namespace connect accepted.
    Connected {
        /// Socket.IO session id, when the server sent one.
        sid: Option<String>,
    },
    /// Namespace connect refused.
    ConnectError {
        /// Reason given by the server.
        message: String,
    },
    /// Server left the namespace.
    Disconnected,
    /// Named event with its first argument.
    Event {
        /// Event name.
        name: String,
        /// First argument, `null` if absent.
        data: Value,
    },
}

/// Reasons a text frame could not be decoded.
#[derive(Debug, Error)]
pub enum PacketError {
    /// Empty frame.
    #[error("empty packet")]
    Empty,
    /// Unknown Engine.IO or Socket.IO type digit.
    #[error("unknown packet type {0:?}")]
    UnknownType(char),
    /// Payload JSON did not parse.
    #[error("invalid packet JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
    /// Event payload was not `[name, ...]`.
    #[error("event payload is not [name, ...]")]
    MalformedEvent,
    /// Binary events and acks are never sent by PGTS.
    #[error("unsupported socket.io packet type {0}")]
    Unsupported(char),
}

impl Packet {
    /// Decode one WebSocket text frame.
    pub fn parse(text: &str) -> Result<Self, PacketError> {
        let (kind, rest) = split_type(text)?;
        match kind {
            '0' => Ok(Self::Open(serde_json::from_str(rest)?)),
            '1' => Ok(Self::Close),
            '2' => Ok(Self::Ping),
            '3' => Ok(Self::Pong),
            '4' => Self::message(rest),
            '5' | '6' => Ok(Self::Noop),
            other => Err(PacketError::UnknownType(other)),
        }
    }

    fn message(text: &str) -> Result<Self, PacketError> {
        let (kind, rest) = split_type(text)?;
        let payload = skip_namespace(rest);
        match kind {
            '0' => Ok(Self::Connected {
                sid: parse_object(payload)?
                    .and_then(|v| v.get("sid").and_then(Value::as_str).map(str::to_owned)),
            }),
            '1' => Ok(Self::Disconnected),
            '2' => Self::event(payload),
            '4' => {
                let message = match parse_object(payload)? {
                    Some(Value::String(s)) => s,
                    Some(v) => v
                        .get("message")
                        .and_then(Value::as_str)
                        .map_or_else(|| v.to_string(), str::to_owned),
                    None => String::new(),
                };
                Ok(Self::ConnectError { message })
            }
            '3' | '5' | '6' => Err(PacketError::Unsupported(kind)),
            other => Err(PacketError::UnknownType(other)),
        }
    }

    fn event(payload: &str) -> Result<Self, PacketError> {
        let payload = payload.trim_start_matches(|c: char| c.is_ascii_digit());
        let Value::Array(args) = serde_json::from_str(payload)? else {
            return Err(PacketError::MalformedEvent);
        };
        let mut args = args.into_iter();
        let Some(Value::String(name)) = args.next() else {
            return Err(PacketError::MalformedEvent);
        };
        let data = args.next().unwrap_or(Value::Null);
        Ok(Self::Event { name, data })
    }
}

fn split_type(text: &str) -> Result<(char, &str), PacketError> {
    let mut chars = text.chars();
    let kind = chars.next().ok_or(PacketError::Empty)?;
    Ok((kind, chars.as_str()))
}

// `/admin,{...}` -> `{...}`. The default namespace carries no prefix.
fn skip_namespace(text: &str) -> &str {
    if !text.starts_with('/') {
        return text;
    }
    text.split_once(',').map_or("", |(_, rest)| rest)
}

fn parse_object(payload: &str) -> Result<Option<Value>, PacketError> {
    if payload.is_empty() {
        return Ok(None);
    }
    Ok(Some(serde_json::from_str(payload)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    #[test]
    fn open_packet() {
        let packet = Packet::parse(
            r#"0{"sid":"eio-1","upgrades":[],"pingInterval":25000,"pingTimeout":20000,"maxPayload":1000000}"#,
        )
        .unwrap();
        let info = match packet {
            Packet::Open(info) => info,
            other => panic!("expected open, got {other:?}"),
        };
        assert_eq!(info.sid, "eio-1");
        assert_eq!(info.max_payload, Some(1_000_000));
        assert_eq!(info.liveness(), Duration::from_secs(45));
    }

    #[test]
    fn heartbeat_and_engine_control() {
        assert_eq!(Packet::parse("2").unwrap(), Packet::Ping);
        assert_eq!(Packet::parse("3").unwrap(), Packet::Pong);
        assert_eq!(Packet::parse("1").unwrap(), Packet::Close);
        assert_eq!(Packet::parse("6").unwrap(), Packet::Noop);
    }

    #[test]
    fn namespace_connect_replies() {
        assert_eq!(
            Packet::parse(r#"40{"sid":"sio-1"}"#).unwrap(),
            Packet::Connected { sid: Some("sio-1".into()) }
        );
        assert_eq!(Packet::parse("40").unwrap(), Packet::Connected { sid: None });
        assert_eq!(
            Packet::parse(r#"44{"message":"Connection rejected by server"}"#).unwrap(),
            Packet::ConnectError {
                message: "Connection rejected by server".into()
            }
        );
        assert_eq!(Packet::parse("41").unwrap(), Packet::Disconnected);
    }

    #[test]
    fn event_with_string_payload() {
        let text = r#"42["notification","{\"method\":\"connection/complete\",\"params\":{}}"]"#;
        assert_eq!(
            Packet::parse(text).unwrap(),
            Packet::Event {
                name: "notification".into(),
                data: json!(r#"{"method":"connection/complete","params":{}}"#),
            }
        );
    }

    #[test]
    fn event_with_namespace_and_ack_id() {
        assert_matches!(
            Packet::parse(r#"42/pgts,17["response",{"id":"a::b"}]"#).unwrap(),
            Packet::Event { name, data } if name == "response" && data["id"] == "a::b"
        );
        assert_matches!(
            Packet::parse(r#"42["error"]"#).unwrap(),
            Packet::Event { data: Value::Null, .. }
        );
    }

    #[test]
    fn rejects_garbage() {
        assert_matches!(Packet::parse(""), Err(PacketError::Empty));
        assert_matches!(Packet::parse("9"), Err(PacketError::UnknownType('9')));
        assert_matches!(Packet::parse("4"), Err(PacketError::Empty));
        assert_matches!(Packet::parse(r#"42{"event":"x"}"#), Err(PacketError::MalformedEvent));
        assert_matches!(Packet::parse("42[1,2]"), Err(PacketError::MalformedEvent));
        assert_matches!(Packet::parse("45-[]"), Err(PacketError::Unsupported('5')));
        assert_matches!(Packet::parse("0{"), Err(PacketError::InvalidJson(_)));
    }
}
