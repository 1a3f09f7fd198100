//! Client error types.

use pgts_broker::BrokerError;
use thiserror::Error;

/// Failures talking to the HTTP endpoints.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Request could not be sent or the body could not be read.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status (403 without a
    /// session cookie, 404 for an unknown session, 500 on dispatch errors).
    #[error("http status {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Error text from the body, or the raw body.
        message: String,
    },

    /// The server acknowledged the POST with an `error` body.
    #[error("request rejected: {0}")]
    Rejected(String),

    /// The configured base URL does not parse.
    #[error("invalid base url {0}")]
    InvalidUrl(String),

    /// `/start-session` returned a body without a session id.
    #[error("invalid start-session response: {0}")]
    InvalidSession(String),
}

/// Failures on the push channel.
#[derive(Debug, Error)]
pub enum SocketError {
    /// Handshake or stream failure.
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// The session cookie could not be carried into the handshake.
    #[error("invalid cookie header: {0}")]
    InvalidCookie(String),

    /// A text frame was not a valid Socket.IO packet.
    #[error("socket.io packet: {0}")]
    Packet(#[from] pgts_rpc::PacketError),

    /// The server broke the Engine.IO or Socket.IO handshake.
    #[error("socket.io handshake: {0}")]
    Handshake(String),

    /// The server refused the namespace connect, usually because the web
    /// session cookie was missing or unknown.
    #[error("push channel rejected: {0}")]
    Rejected(String),

    /// The handshake did not finish in time.
    #[error("socket.io handshake timed out after {timeout_ms} ms")]
    HandshakeTimedOut {
        /// Timeout that elapsed.
        timeout_ms: u64,
    },

    /// The channel is already open for this client.
    #[error("push channel already connected")]
    AlreadyConnected,
}

/// Errors surfaced by [`PgtsClient`](crate::PgtsClient).
#[derive(Debug, Error)]
pub enum ClientError {
    /// The pending request was rejected.
    #[error(transparent)]
    Broker(#[from] BrokerError),

    /// HTTP transport failure.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Push-channel failure.
    #[error(transparent)]
    Socket(#[from] SocketError),

    /// Params could not be encoded.
    #[error("encode error: {0}")]
    Encode(#[from] serde_json::Error),

    /// No web session has been started.
    #[error("no web session; call start_session first")]
    NoSession,

    /// No Object Explorer session exists yet.
    #[error("no object explorer session")]
    NoObjectExplorerSession,

    /// `connection/complete` reported an error.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// `objectexplorer/sessioncreated` reported an error.
    #[error("object explorer session failed: {0}")]
    ObjectExplorerFailed(String),

    /// A state wait did not finish in time.
    #[error("timed out after {timeout_ms} ms waiting for {what}")]
    WaitTimedOut {
        /// What was awaited.
        what: &'static str,
        /// Timeout that elapsed.
        timeout_ms: u64,
    },

    /// The broker settled a request with the wrong kind of value.
    #[error("unexpected outcome, expected {expected}")]
    UnexpectedOutcome {
        /// Kind that was expected.
        expected: &'static str,
    },
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn broker_error_is_transparent() {
        let err: ClientError = BrokerError::Closed {
            reason: "push channel closed".into(),
        }
        .into();
        assert_eq!(err.to_string(), "request abandoned: push channel closed");
    }

    #[test]
    fn status_display() {
        let err = TransportError::Status {
            status: 403,
            message: "No session cookie".into(),
        };
        assert_eq!(err.to_string(), "http status 403: No session cookie");
    }

    #[test]
    fn rejected_socket_display() {
        let err: ClientError = SocketError::Rejected("Connection rejected by server".into()).into();
        assert_eq!(
            err.to_string(),
            "push channel rejected: Connection rejected by server"
        );
    }

    #[test]
    fn wait_timeout_display() {
        let err = ClientError::WaitTimedOut {
            what: "connection",
            timeout_ms: 500,
        };
        assert_eq!(
            err.to_string(),
            "timed out after 500 ms waiting for connection"
        );
    }
}
