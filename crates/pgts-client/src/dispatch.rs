//! Inbound frame routing.
//!
//! Responses are routed by the method prefix of their id, notifications by
//! method name. Request-scoped results settle broker entries; connection and
//! Object Explorer lifecycle updates go to [`SessionState`].

use std::sync::Arc;

use pgts_broker::{Broker, BrokerError};
use pgts_core::ids::method_of;
use pgts_rpc::contracts::{
    ConnectionCompleteParams, CreateSessionResponse, ExpandCompletedParams, SessionCreatedParams,
    SimpleExecuteResult,
};
use pgts_rpc::{InboundFrame, RpcErrorObject, methods};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::object_explorer::expansion_nodes;
use crate::query::to_query_results;
use crate::results::Outcome;
use crate::state::{ObjectExplorerSession, SessionState};

/// Routes push-channel frames.
pub struct Dispatcher {
    broker: Arc<Broker<Outcome>>,
    state: SessionState,
}

impl Dispatcher {
    /// Create a dispatcher over a broker and session state.
    pub fn new(broker: Arc<Broker<Outcome>>, state: SessionState) -> Self {
        Self { broker, state }
    }

    /// Decode and route a Socket.IO event. Undecodable events are logged
    /// and dropped.
    pub fn handle_event(&self, event: &str, data: Value) {
        match InboundFrame::from_event(event, data) {
            Ok(frame) => self.handle_frame(frame),
            Err(e) => warn!(event, error = %e, "dropping undecodable event"),
        }
    }

    /// Route a classified frame.
    pub fn handle_frame(&self, frame: InboundFrame) {
        match frame {
            InboundFrame::Response { id, result } => self.on_response(&id, result),
            InboundFrame::Notification { method, params } => self.on_notification(&method, params),
            InboundFrame::Error { id, error } => self.on_error(id.as_deref(), error),
        }
    }

    /// Push channel opened.
    pub fn on_connect(&self) {
        self.state.set_socket_connected(true);
    }

    /// Push channel went away: abandon everything pending.
    pub fn on_disconnect(&self, reason: &str) {
        self.state.set_socket_connected(false);
        let cancelled = self.broker.cancel_all(reason);
        info!(reason, cancelled, "push channel disconnected");
    }

    fn on_response(&self, id: &str, result: Value) {
        match method_of(id) {
            methods::CONNECTION_CONNECT | methods::OE_EXPAND => {
                debug!(id, "acknowledged; outcome arrives as a notification");
            }
            methods::OE_CREATE_SESSION => {
                if let Some(resp) = decode::<CreateSessionResponse>(id, result) {
                    self.state.set_object_explorer_session_id(resp.session_id);
                }
            }
            methods::QUERY_SIMPLE_EXECUTE => {
                let settled = match serde_json::from_value::<SimpleExecuteResult>(result) {
                    Ok(raw) => self
                        .broker
                        .complete(id, Outcome::Query(to_query_results(raw))),
                    Err(e) => self.broker.fail(
                        id,
                        BrokerError::Malformed {
                            message: e.to_string(),
                        },
                    ),
                };
                if !settled {
                    debug!(id, "query result with no pending request");
                }
            }
            method => warn!(id, method, "unhandled response"),
        }
    }

    fn on_notification(&self, method: &str, params: Value) {
        match method {
            methods::CONNECTION_COMPLETE => {
                if let Some(info) = decode::<ConnectionCompleteParams>(method, params) {
                    if let Some(err) = info.error_message.as_deref() {
                        warn!(owner_uri = %info.owner_uri, error = err, "connection failed");
                    } else {
                        info!(owner_uri = %info.owner_uri, "connection complete");
                    }
                    self.state.set_connection_info(info);
                }
            }
            methods::OE_SESSION_CREATED => {
                if let Some(created) = decode::<SessionCreatedParams>(method, params) {
                    info!(
                        session_id = %created.session_id,
                        success = created.success,
                        "object explorer session created"
                    );
                    self.state.set_object_explorer_session(ObjectExplorerSession {
                        session_id: created.session_id,
                        ready: created.success,
                        root_node: created.root_node,
                        error_message: created.error_message,
                    });
                }
            }
            methods::OE_EXPAND_COMPLETED => {
                if let Some(done) = decode::<ExpandCompletedParams>(method, params) {
                    self.on_expand_completed(&done);
                }
            }
            _ => warn!(method, "unhandled notification"),
        }
    }

    fn on_expand_completed(&self, done: &ExpandCompletedParams) {
        let key = done.node_path.as_str();
        let settled = match done.error_message.as_deref() {
            Some(message) => self.broker.fail(
                key,
                BrokerError::Rpc {
                    code: 0,
                    message: message.to_owned(),
                },
            ),
            None => self
                .broker
                .complete(key, Outcome::Nodes(expansion_nodes(done))),
        };
        if !settled {
            debug!(node_path = key, "expansion with no pending request");
        }
    }

    fn on_error(&self, id: Option<&str>, error: RpcErrorObject) {
        let Some(id) = id else {
            warn!(code = error.code, message = %error.message, "server error without request id");
            return;
        };
        let settled = self.broker.fail(
            id,
            BrokerError::Rpc {
                code: error.code,
                message: error.message,
            },
        );
        if !settled {
            debug!(id, "error for a request that is no longer pending");
        }
    }
}

fn decode<T: DeserializeOwned>(label: &str, value: Value) -> Option<T> {
    match serde_json::from_value(value) {
        Ok(v) => Some(v),
        Err(e) => {
            warn!(label, error = %e, "dropping malformed payload");
            None
        }
    }
}
