//! Shared session state.
//!
//! Connection and Object Explorer notifications are not request-scoped, so
//! the dispatcher writes them here instead of going through the broker.
//! Readers take snapshots or wait on a predicate via the `watch` channel.

use std::sync::Arc;
use std::time::Duration;

use pgts_core::SessionId;
use pgts_rpc::contracts::{ConnectionCompleteParams, ConnectionOptions, NodeInfo};
use tokio::sync::watch;

use crate::errors::ClientError;

/// Object Explorer session as far as the client knows it.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ObjectExplorerSession {
    /// Session id (an `objectexplorer://` URI).
    pub session_id: String,
    /// Set once `objectexplorer/sessioncreated` reported success.
    pub ready: bool,
    /// Root node reported by the service.
    pub root_node: Option<NodeInfo>,
    /// Failure reported by the service.
    pub error_message: Option<String>,
}

/// Point-in-time view of the session.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SessionSnapshot {
    /// Web session from `/start-session`.
    pub session_id: Option<SessionId>,
    /// Whether the push channel is open.
    pub socket_connected: bool,
    /// Options of the last `connect` call.
    pub connection_options: Option<ConnectionOptions>,
    /// Outcome of the last `connection/complete`.
    pub connection: Option<ConnectionCompleteParams>,
    /// Object Explorer session.
    pub object_explorer: Option<ObjectExplorerSession>,
}

impl SessionSnapshot {
    /// The service reported a connection id for the last connect.
    pub fn is_connected(&self) -> bool {
        self.connection_id().is_some()
    }

    /// Connection id from `connection/complete`, if non-empty.
    pub fn connection_id(&self) -> Option<&str> {
        self.connection
            .as_ref()
            .and_then(|c| c.connection_id.as_deref())
            .filter(|id| !id.is_empty())
    }

    /// A connect was sent and no completion has arrived yet.
    pub fn is_connecting(&self) -> bool {
        self.connection_options.is_some() && self.connection.is_none()
    }

    /// Object Explorer session id, once known.
    pub fn object_explorer_session_id(&self) -> Option<&str> {
        self.object_explorer
            .as_ref()
            .map(|oe| oe.session_id.as_str())
            .filter(|id| !id.is_empty())
    }
}

/// Cloneable handle to the session state.
#[derive(Clone, Debug)]
pub struct SessionState {
    tx: Arc<watch::Sender<SessionSnapshot>>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionState {
    /// Empty state.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(SessionSnapshot::default());
        Self { tx: Arc::new(tx) }
    }

    /// Copy of the current state.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.tx.borrow().clone()
    }

    /// Record the web session id.
    pub fn set_session_id(&self, id: SessionId) {
        self.tx.send_modify(|s| s.session_id = Some(id));
    }

    /// Record push-channel status.
    pub fn set_socket_connected(&self, connected: bool) {
        self.tx.send_modify(|s| s.socket_connected = connected);
    }

    /// Start a new connection attempt; clears the previous outcome.
    pub fn set_connection_options(&self, options: ConnectionOptions) {
        self.tx.send_modify(|s| {
            s.connection = None;
            s.object_explorer = None;
            s.connection_options = Some(options);
        });
    }

    /// Apply a `connection/complete` notification.
    pub fn set_connection_info(&self, info: ConnectionCompleteParams) {
        self.tx.send_modify(|s| s.connection = Some(info));
    }

    /// Apply the immediate `objectexplorer/createsession` result.
    pub fn set_object_explorer_session_id(&self, session_id: String) {
        self.tx.send_modify(|s| match s.object_explorer.as_mut() {
            Some(oe) => oe.session_id = session_id,
            None => {
                s.object_explorer = Some(ObjectExplorerSession {
                    session_id,
                    ..ObjectExplorerSession::default()
                });
            }
        });
    }

    /// Apply an `objectexplorer/sessioncreated` notification.
    pub fn set_object_explorer_session(&self, session: ObjectExplorerSession) {
        self.tx.send_modify(|s| s.object_explorer = Some(session));
    }

    /// Wait until `done` holds for the state, up to `timeout`.
    pub async fn wait_for(
        &self,
        what: &'static str,
        timeout: Duration,
        mut done: impl FnMut(&SessionSnapshot) -> bool,
    ) -> Result<SessionSnapshot, ClientError> {
        let timed_out = || ClientError::WaitTimedOut {
            what,
            timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
        };
        let mut rx = self.tx.subscribe();
        match tokio::time::timeout(timeout, rx.wait_for(|s| done(s))).await {
            Ok(Ok(snapshot)) => Ok(snapshot.clone()),
            Ok(Err(_)) | Err(_) => Err(timed_out()),
        }
    }
}
