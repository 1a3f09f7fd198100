//! Outbound transport seam.

use async_trait::async_trait;
use pgts_rpc::JsonRpcRequest;

/// Error type returned by an [`Outbound`] implementation.
pub type OutboundError = Box<dyn std::error::Error + Send + Sync>;

/// Sends a request to the service. Success means the service accepted it,
/// not that a result is available.
#[async_trait]
pub trait Outbound: Send + Sync {
    /// Deliver `request`.
    async fn send(&self, request: &JsonRpcRequest) -> Result<(), OutboundError>;
}
