//! Awaitable handle for a registered request.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use pgts_core::CorrelationKey;
use tokio::sync::oneshot;

use crate::errors::{BrokerError, BrokerResult};

/// Resolves once the broker settles the entry for [`key`](Self::key).
///
/// Dropping it does not remove the registry entry; the entry still settles
/// on completion or timeout and the value is discarded.
#[derive(Debug)]
#[must_use = "a pending response does nothing unless awaited"]
pub struct PendingResponse<T> {
    key: CorrelationKey,
    rx: oneshot::Receiver<BrokerResult<T>>,
}

impl<T> PendingResponse<T> {
    pub(crate) fn new(key: CorrelationKey, rx: oneshot::Receiver<BrokerResult<T>>) -> Self {
        Self { key, rx }
    }

    /// A response that is already rejected.
    pub(crate) fn rejected(key: CorrelationKey, error: BrokerError) -> Self {
        let (tx, rx) = oneshot::channel();
        let _ = tx.send(Err(error));
        Self { key, rx }
    }

    /// Key this response is registered under.
    pub fn key(&self) -> &CorrelationKey {
        &self.key
    }
}

impl<T> Future for PendingResponse<T> {
    type Output = BrokerResult<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.rx).poll(cx) {
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            Poll::Ready(Err(_)) => Poll::Ready(Err(BrokerError::Closed {
                reason: "broker dropped".into(),
            })),
            Poll::Pending => Poll::Pending,
        }
    }
}
