//! Broker error type.

use thiserror::Error;

/// Why a pending request did not produce a value.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum BrokerError {
    /// No result arrived before the timeout.
    #[error("request {key} timed out after {timeout_ms} ms")]
    TimedOut {
        /// Correlation key of the request.
        key: String,
        /// Timeout that elapsed.
        timeout_ms: u64,
    },

    /// Another request with the same key is still pending.
    #[error("request {key} is already pending")]
    DuplicateKey {
        /// The conflicting key.
        key: String,
    },

    /// The outbound send failed.
    #[error("request {key} could not be sent: {message}")]
    Transport {
        /// Correlation key of the request.
        key: String,
        /// Transport error text.
        message: String,
    },

    /// The service answered with an error.
    #[error("server error {code}: {message}")]
    Rpc {
        /// JSON-RPC error code.
        code: i64,
        /// Error message.
        message: String,
    },

    /// The request was abandoned (push channel closed, broker dropped).
    #[error("request abandoned: {reason}")]
    Closed {
        /// Why.
        reason: String,
    },

    /// A result arrived but could not be interpreted.
    #[error("malformed result: {message}")]
    Malformed {
        /// Decode error text.
        message: String,
    },
}

impl BrokerError {
    /// Whether this is the timeout kind.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::TimedOut { .. })
    }
}

/// Result type settled into every [`PendingResponse`](crate::PendingResponse).
pub type BrokerResult<T> = Result<T, BrokerError>;
