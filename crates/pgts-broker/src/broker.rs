//! Pending-request registry with per-entry timeouts.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use pgts_core::CorrelationKey;
use pgts_core::constants::DEFAULT_REQUEST_TIMEOUT;
use pgts_rpc::JsonRpcRequest;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::errors::{BrokerError, BrokerResult};
use crate::outbound::Outbound;
use crate::pending::PendingResponse;

/// A registered request waiting for its result.
struct Entry<T> {
    /// Distinguishes this entry from earlier ones under the same key.
    ticket: u64,
    tx: oneshot::Sender<BrokerResult<T>>,
    timer: JoinHandle<()>,
    created_at: Instant,
}

#[derive(Default)]
struct Counters {
    registered: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
    timed_out: AtomicU64,
    cancelled: AtomicU64,
}

/// Snapshot of broker counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BrokerStats {
    /// Entries ever registered.
    pub registered: u64,
    /// Entries resolved with a value.
    pub completed: u64,
    /// Entries rejected by [`Broker::fail`] or a failed send.
    pub failed: u64,
    /// Entries rejected by their timeout.
    pub timed_out: u64,
    /// Entries rejected by [`Broker::cancel_all`].
    pub cancelled: u64,
}

struct Shared<T> {
    pending: Mutex<HashMap<CorrelationKey, Entry<T>>>,
    next_ticket: AtomicU64,
    counters: Counters,
    timeout: Duration,
}

impl<T> Shared<T> {
    fn take(&self, key: &str) -> Option<Entry<T>> {
        self.pending.lock().remove(key)
    }

    /// Timer callback. Only removes the entry the timer was armed for.
    fn expire(&self, key: &CorrelationKey, ticket: u64) {
        let entry = {
            let mut pending = self.pending.lock();
            match pending.get(key) {
                Some(entry) if entry.ticket == ticket => pending.remove(key),
                _ => None,
            }
        };
        let Some(entry) = entry else {
            return;
        };

        let _ = self.counters.timed_out.fetch_add(1, Ordering::Relaxed);
        let timeout_ms = u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX);
        warn!(key = %key, timeout_ms, "pending request timed out");
        let _ = entry.tx.send(Err(BrokerError::TimedOut {
            key: key.to_string(),
            timeout_ms,
        }));
    }
}

/// Correlated request broker.
///
/// Shared by `Arc` between the code that issues requests and the push-channel
/// dispatcher that settles them. Every check-and-remove on the registry runs
/// under one lock, so concurrent settle attempts on the same key are
/// serialized and only the first one finds the entry.
pub struct Broker<T> {
    shared: Arc<Shared<T>>,
    outbound: Arc<dyn Outbound>,
}

impl<T: Send + 'static> Broker<T> {
    /// Create a broker that sends through `outbound` and rejects entries
    /// after `timeout`.
    pub fn new(outbound: Arc<dyn Outbound>, timeout: Duration) -> Self {
        Self {
            shared: Arc::new(Shared {
                pending: Mutex::new(HashMap::new()),
                next_ticket: AtomicU64::new(0),
                counters: Counters::default(),
                timeout,
            }),
            outbound,
        }
    }

    /// Create a broker with the default 10 second timeout.
    pub fn with_default_timeout(outbound: Arc<dyn Outbound>) -> Self {
        Self::new(outbound, DEFAULT_REQUEST_TIMEOUT)
    }

    /// Timeout applied to every entry.
    pub fn timeout(&self) -> Duration {
        self.shared.timeout
    }

    /// Register `key`, send `request`, and return the pending result.
    ///
    /// Never fails directly: a duplicate key or a failed send shows up as a
    /// rejected [`PendingResponse`]. A failed send frees the key at once
    /// rather than leaving it for the timeout.
    pub async fn issue(&self, key: CorrelationKey, request: &JsonRpcRequest) -> PendingResponse<T> {
        let pending = match self.register(key.clone()) {
            Ok(pending) => pending,
            Err(err) => {
                warn!(key = %key, method = %request.method, "refusing to issue duplicate key");
                return PendingResponse::rejected(key, err);
            }
        };

        debug!(key = %key, method = %request.method, id = %request.id, "issuing request");
        if let Err(err) = self.outbound.send(request).await {
            let message = err.to_string();
            warn!(key = %key, method = %request.method, error = %message, "outbound send failed");
            let _ = self.fail(
                &key,
                BrokerError::Transport {
                    key: key.to_string(),
                    message,
                },
            );
        }
        pending
    }

    /// Register `key` without sending anything.
    ///
    /// For callers that deliver the request themselves. Must be called from
    /// within a tokio runtime (the timeout is a spawned task).
    pub fn register(&self, key: CorrelationKey) -> BrokerResult<PendingResponse<T>> {
        let (tx, rx) = oneshot::channel();
        let ticket = self.shared.next_ticket.fetch_add(1, Ordering::Relaxed);

        {
            let mut pending = self.shared.pending.lock();
            if pending.contains_key(&key) {
                return Err(BrokerError::DuplicateKey {
                    key: key.to_string(),
                });
            }
            let timer = self.arm_timer(key.clone(), ticket);
            let _ = pending.insert(
                key.clone(),
                Entry {
                    ticket,
                    tx,
                    timer,
                    created_at: Instant::now(),
                },
            );
        }

        let _ = self.shared.counters.registered.fetch_add(1, Ordering::Relaxed);
        debug!(key = %key, ticket, "registered pending request");
        Ok(PendingResponse::new(key, rx))
    }

    fn arm_timer(&self, key: CorrelationKey, ticket: u64) -> JoinHandle<()> {
        let shared: Weak<Shared<T>> = Arc::downgrade(&self.shared);
        let timeout = self.shared.timeout;
        tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            if let Some(shared) = shared.upgrade() {
                shared.expire(&key, ticket);
            }
        })
    }

    /// Resolve the entry for `key` with `value`.
    ///
    /// Returns `false` (and logs) if nothing is pending under `key`: a late
    /// arrival after a timeout, a duplicate, or an unsolicited message.
    pub fn complete(&self, key: &str, value: T) -> bool {
        let Some(entry) = self.shared.take(key) else {
            warn!(key, "no pending request for completion");
            return false;
        };
        entry.timer.abort();
        let _ = self.shared.counters.completed.fetch_add(1, Ordering::Relaxed);
        debug!(
            key,
            elapsed_ms = entry.created_at.elapsed().as_millis(),
            "completed pending request"
        );
        if entry.tx.send(Ok(value)).is_err() {
            debug!(key, "pending request receiver dropped");
        }
        true
    }

    /// Reject the entry for `key` with `error`. Same no-op rules as
    /// [`complete`](Self::complete).
    pub fn fail(&self, key: &str, error: BrokerError) -> bool {
        let Some(entry) = self.shared.take(key) else {
            warn!(key, error = %error, "no pending request for failure");
            return false;
        };
        entry.timer.abort();
        let _ = self.shared.counters.failed.fetch_add(1, Ordering::Relaxed);
        debug!(key, error = %error, "failed pending request");
        let _ = entry.tx.send(Err(error));
        true
    }

    /// Reject every pending entry with [`BrokerError::Closed`].
    ///
    /// Called when the push channel goes away, since nothing can complete
    /// the entries after that. Returns how many were rejected.
    pub fn cancel_all(&self, reason: &str) -> usize {
        let drained: Vec<(CorrelationKey, Entry<T>)> =
            self.shared.pending.lock().drain().collect();
        let count = drained.len();
        for (key, entry) in drained {
            entry.timer.abort();
            debug!(key = %key, reason, "cancelling pending request");
            let _ = entry.tx.send(Err(BrokerError::Closed {
                reason: reason.to_owned(),
            }));
        }
        if count > 0 {
            let _ = self
                .shared
                .counters
                .cancelled
                .fetch_add(count as u64, Ordering::Relaxed);
            warn!(count, reason, "cancelled pending requests");
        }
        count
    }

    /// Whether `key` is currently pending.
    pub fn is_pending(&self, key: &str) -> bool {
        self.shared.pending.lock().contains_key(key)
    }

    /// Number of pending entries.
    pub fn pending_count(&self) -> usize {
        self.shared.pending.lock().len()
    }

    /// Counter snapshot.
    pub fn stats(&self) -> BrokerStats {
        let c = &self.shared.counters;
        BrokerStats {
            registered: c.registered.load(Ordering::Relaxed),
            completed: c.completed.load(Ordering::Relaxed),
            failed: c.failed.load(Ordering::Relaxed),
            timed_out: c.timed_out.load(Ordering::Relaxed),
            cancelled: c.cancelled.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outbound::OutboundError;
    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use serde_json::{Value, json};

    #[derive(Default)]
    struct FakeOutbound {
        sent: Mutex<Vec<JsonRpcRequest>>,
        fail_with: Option<String>,
    }

    #[async_trait]
    impl Outbound for FakeOutbound {
        async fn send(&self, request: &JsonRpcRequest) -> Result<(), OutboundError> {
            self.sent.lock().push(request.clone());
            match &self.fail_with {
                Some(msg) => Err(msg.clone().into()),
                None => Ok(()),
            }
        }
    }

    fn broker() -> (Broker<Value>, Arc<FakeOutbound>) {
        let outbound = Arc::new(FakeOutbound::default());
        (Broker::with_default_timeout(outbound.clone()), outbound)
    }

    fn request(key: &CorrelationKey, method: &str) -> JsonRpcRequest {
        JsonRpcRequest::new(key.as_str(), method, json!({}))
    }

    #[tokio::test]
    async fn issue_then_complete_resolves_once() {
        let (broker, outbound) = broker();
        let key = CorrelationKey::from("query/simpleexecute::abc123");
        let pending = broker.issue(key.clone(), &request(&key, "query/simpleexecute")).await;

        assert_eq!(outbound.sent.lock().len(), 1);
        assert!(broker.is_pending(&key));
        assert!(broker.complete(&key, json!({"rows": 3})));
        assert!(!broker.complete(&key, json!({"rows": 4})));

        assert_eq!(pending.await, Ok(json!({"rows": 3})));
        assert_eq!(broker.pending_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_rejects_and_late_complete_is_noop() {
        let (broker, _) = broker();
        let key = CorrelationKey::for_node_path("objectexplorer://root/Server/public");
        let pending = broker.issue(key.clone(), &request(&key, "objectexplorer/expand")).await;

        let err = pending.await.unwrap_err();
        assert!(err.is_timeout());
        assert_matches!(err, BrokerError::TimedOut { key: k, timeout_ms: 10_000 } if k == key.as_str());

        assert!(!broker.complete(&key, json!([])));
        assert!(!broker.is_pending(&key));
        assert_eq!(broker.stats().timed_out, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn completion_before_timeout_wins() {
        let (broker, _) = broker();
        let key = CorrelationKey::from("k::1");
        let pending = broker.register(key.clone()).unwrap();

        tokio::time::advance(Duration::from_secs(9)).await;
        assert!(broker.complete(&key, json!("done")));
        tokio::time::advance(Duration::from_secs(5)).await;

        assert_eq!(pending.await, Ok(json!("done")));
        assert_eq!(broker.stats().timed_out, 0);
    }

    #[tokio::test]
    async fn unknown_key_is_noop_and_leaves_others() {
        let (broker, _) = broker();
        let key = CorrelationKey::from("a::1");
        let pending = broker.register(key.clone()).unwrap();

        assert!(!broker.complete("never-registered", json!(1)));
        assert!(!broker.fail("never-registered", BrokerError::Closed { reason: "x".into() }));
        assert!(broker.is_pending(&key));

        assert!(broker.complete(&key, json!(2)));
        assert_eq!(pending.await, Ok(json!(2)));
    }

    #[tokio::test]
    async fn distinct_keys_resolve_independently() {
        let (broker, _) = broker();
        let k1 = CorrelationKey::for_method("query/simpleexecute");
        let k2 = CorrelationKey::for_method("query/simpleexecute");
        let p1 = broker.register(k1.clone()).unwrap();
        let p2 = broker.register(k2.clone()).unwrap();

        assert!(broker.complete(&k2, json!("two")));
        assert!(broker.is_pending(&k1));
        assert_eq!(p2.await, Ok(json!("two")));

        assert!(broker.fail(&k1, BrokerError::Rpc { code: 1, message: "bad".into() }));
        assert_eq!(p1.await, Err(BrokerError::Rpc { code: 1, message: "bad".into() }));
    }

    #[tokio::test]
    async fn duplicate_live_key_is_rejected() {
        let (broker, outbound) = broker();
        let key = CorrelationKey::from("objectexplorer://root/Server");
        let first = broker.issue(key.clone(), &request(&key, "objectexplorer/expand")).await;
        let second = broker.issue(key.clone(), &request(&key, "objectexplorer/expand")).await;

        assert_eq!(
            second.await,
            Err(BrokerError::DuplicateKey { key: key.to_string() })
        );
        // The duplicate was never sent.
        assert_eq!(outbound.sent.lock().len(), 1);

        assert!(broker.complete(&key, json!("first")));
        assert_eq!(first.await, Ok(json!("first")));
    }

    #[tokio::test]
    async fn failed_send_rejects_immediately_and_frees_key() {
        let outbound = Arc::new(FakeOutbound {
            fail_with: Some("connection refused".into()),
            ..FakeOutbound::default()
        });
        let broker: Broker<Value> = Broker::with_default_timeout(outbound);
        let key = CorrelationKey::from("connection/connect::1");

        let pending = broker.issue(key.clone(), &request(&key, "connection/connect")).await;
        assert!(!broker.is_pending(&key));
        assert_matches!(
            pending.await,
            Err(BrokerError::Transport { message, .. }) if message == "connection refused"
        );
        assert_eq!(broker.stats().failed, 1);

        // Key can be reused right away.
        let _again = broker.register(key.clone()).unwrap();
    }

    #[tokio::test]
    async fn cancel_all_rejects_everything() {
        let (broker, _) = broker();
        let p1 = broker.register(CorrelationKey::from("a")).unwrap();
        let p2 = broker.register(CorrelationKey::from("b")).unwrap();

        assert_eq!(broker.cancel_all("socket closed"), 2);
        assert_eq!(broker.pending_count(), 0);
        assert_eq!(p1.await, Err(BrokerError::Closed { reason: "socket closed".into() }));
        assert_eq!(p2.await, Err(BrokerError::Closed { reason: "socket closed".into() }));
        assert_eq!(broker.cancel_all("again"), 0);
        assert_eq!(broker.stats().cancelled, 2);
    }

    #[tokio::test]
    async fn stale_timer_does_not_remove_reissued_entry() {
        let (broker, _) = broker();
        let key = CorrelationKey::from("objectexplorer://root/Server");

        let first = broker.register(key.clone()).unwrap();
        assert!(broker.complete(&key, json!(1)));
        assert_eq!(first.await, Ok(json!(1)));

        let second = broker.register(key.clone()).unwrap();
        // Ticket 0 belonged to the first registration.
        broker.shared.expire(&key, 0);
        assert!(broker.is_pending(&key));

        assert!(broker.complete(&key, json!(2)));
        assert_eq!(second.await, Ok(json!(2)));
    }

    #[tokio::test]
    async fn dropped_receiver_still_clears_entry() {
        let (broker, _) = broker();
        let key = CorrelationKey::from("q::1");
        drop(broker.register(key.clone()).unwrap());

        assert!(broker.is_pending(&key));
        assert!(broker.complete(&key, json!(null)));
        assert!(!broker.is_pending(&key));
    }

    #[tokio::test]
    async fn dropping_broker_closes_pending() {
        let (broker, _) = broker();
        let pending = broker.register(CorrelationKey::from("x")).unwrap();
        drop(broker);
        assert_matches!(pending.await, Err(BrokerError::Closed { .. }));
    }

    #[tokio::test]
    async fn stats_track_outcomes() {
        let (broker, _) = broker();
        let _a = broker.register(CorrelationKey::from("a")).unwrap();
        let _b = broker.register(CorrelationKey::from("b")).unwrap();
        let _ = broker.complete("a", json!(1));
        let _ = broker.fail("b", BrokerError::Malformed { message: "x".into() });

        assert_eq!(
            broker.stats(),
            BrokerStats {
                registered: 2,
                completed: 1,
                failed: 1,
                timed_out: 0,
                cancelled: 0,
            }
        );
    }
}
