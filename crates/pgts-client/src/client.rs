//! [`PgtsClient`]: the facade over transport, push channel, broker and state.

use std::sync::Arc;

use pgts_broker::{Broker, BrokerStats, Outbound};
use pgts_core::{CorrelationKey, SessionId};
use pgts_rpc::JsonRpcRequest;
use pgts_rpc::contracts::{
    ConnectParams, ConnectionCompleteParams, ConnectionDetails, ConnectionOptions, ExpandParams,
    ObjectExplorerSessionParams, SimpleExecuteParams,
};
use pgts_rpc::methods::{CONNECTION_CONNECT, OE_CREATE_SESSION, OE_EXPAND, QUERY_SIMPLE_EXECUTE};
use pgts_settings::PgtsSettings;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::dispatch::Dispatcher;
use crate::errors::{ClientError, Result, SocketError};
use crate::object_explorer::{ChildSource, child_source};
use crate::results::{LoadChildNodesResponse, Outcome, QueryResults};
use crate::socket::PushChannel;
use crate::state::{ObjectExplorerSession, SessionState};
use crate::transport::HttpTransport;

/// Client for one tooling-service instance.
///
/// Typical flow: [`open`](Self::open), [`connect`](Self::connect),
/// [`wait_for_connection`](Self::wait_for_connection) and
/// [`wait_for_object_explorer`](Self::wait_for_object_explorer), then any
/// number of [`execute`](Self::execute) and
/// [`load_child_nodes`](Self::load_child_nodes) calls, and finally
/// [`close`](Self::close).
pub struct PgtsClient {
    settings: PgtsSettings,
    transport: Arc<HttpTransport>,
    broker: Arc<Broker<Outcome>>,
    state: SessionState,
    dispatcher: Arc<Dispatcher>,
    channel: Mutex<Option<PushChannel>>,
}

impl PgtsClient {
    /// Build a client; nothing is sent until [`open`](Self::open).
    pub fn new(settings: PgtsSettings) -> Result<Self> {
        let transport = Arc::new(HttpTransport::new(&settings.server)?);
        let broker = Arc::new(Broker::new(
            Arc::clone(&transport) as Arc<dyn Outbound>,
            settings.broker.request_timeout(),
        ));
        let state = SessionState::new();
        let dispatcher = Arc::new(Dispatcher::new(Arc::clone(&broker), state.clone()));
        Ok(Self {
            settings,
            transport,
            broker,
            state,
            dispatcher,
            channel: Mutex::new(None),
        })
    }

    /// Settings the client was built with.
    pub fn settings(&self) -> &PgtsSettings {
        &self.settings
    }

    /// Shared session state.
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Broker counters.
    pub fn stats(&self) -> BrokerStats {
        self.broker.stats()
    }

    // ─── Session bootstrap ───────────────────────────────────────────

    /// Start a web session. The cookie is kept for later requests.
    pub async fn start_session(&self) -> Result<SessionId> {
        let id = self.transport.start_session().await?;
        self.state.set_session_id(id.clone());
        Ok(id)
    }

    /// Open the push channel for the current web session.
    pub async fn connect_socket(&self) -> Result<()> {
        if self.state.snapshot().session_id.is_none() {
            return Err(ClientError::NoSession);
        }
        let mut channel = self.channel.lock().await;
        if channel.as_ref().is_some_and(|c| !c.is_finished()) {
            return Err(SocketError::AlreadyConnected.into());
        }
        let cookie = self.transport.cookie_header();
        let opened = PushChannel::connect(
            &self.settings.server.socket_url(),
            cookie.as_deref(),
            self.settings.broker.connect_timeout(),
            Arc::clone(&self.dispatcher),
        )
        .await?;
        *channel = Some(opened);
        Ok(())
    }

    /// Start a web session and open its push channel.
    pub async fn open(&self) -> Result<SessionId> {
        let id = self.start_session().await?;
        self.connect_socket().await?;
        Ok(id)
    }

    /// Close the push channel. Pending requests are rejected.
    pub async fn close(&self) {
        if let Some(channel) = self.channel.lock().await.take() {
            channel.close().await;
        }
        let leftover = self.broker.cancel_all(crate::socket::CLOSED_BY_CLIENT);
        debug!(leftover, "client closed");
    }

    // ─── Connection ──────────────────────────────────────────────────

    fn owner_uri(&self) -> String {
        self.state
            .snapshot()
            .connection
            .map(|c| c.owner_uri)
            .filter(|uri| !uri.is_empty())
            .unwrap_or_else(|| self.settings.connection.owner_uri.clone())
    }

    /// Send `connection/connect` and `objectexplorer/createsession`.
    ///
    /// Both are only acknowledged over HTTP; their outcomes arrive as
    /// notifications and land in [`state`](Self::state).
    #[tracing::instrument(skip_all, fields(host = %options.host, dbname = %options.dbname))]
    pub async fn connect(&self, options: ConnectionOptions) -> Result<()> {
        if self.state.snapshot().session_id.is_none() {
            return Err(ClientError::NoSession);
        }
        self.state.set_connection_options(options.clone());

        let connect = JsonRpcRequest::with_params(
            CorrelationKey::for_method(CONNECTION_CONNECT).into_inner(),
            CONNECTION_CONNECT,
            &ConnectParams {
                owner_uri: self.settings.connection.owner_uri.clone(),
                connection: ConnectionDetails {
                    options: options.clone(),
                },
            },
        )?;
        let _ = self.transport.post_rpc(&connect).await?;

        let create = JsonRpcRequest::with_params(
            CorrelationKey::for_method(OE_CREATE_SESSION).into_inner(),
            OE_CREATE_SESSION,
            &ObjectExplorerSessionParams { options },
        )?;
        let _ = self.transport.post_rpc(&create).await?;
        info!("connect requests accepted");
        Ok(())
    }

    /// Wait for `connection/complete`. Succeeds only when it carries a
    /// connection id.
    pub async fn wait_for_connection(&self) -> Result<ConnectionCompleteParams> {
        let snapshot = self
            .state
            .wait_for("connection", self.settings.broker.connect_timeout(), |s| {
                s.connection.is_some()
            })
            .await?;
        if snapshot.is_connected() {
            return Ok(snapshot.connection.unwrap_or_default());
        }
        let message = snapshot
            .connection
            .and_then(|c| c.error_message)
            .unwrap_or_else(|| "no connection id in connection/complete".to_owned());
        Err(ClientError::ConnectionFailed(message))
    }

    /// Wait for `objectexplorer/sessioncreated`.
    pub async fn wait_for_object_explorer(&self) -> Result<ObjectExplorerSession> {
        let snapshot = self
            .state
            .wait_for(
                "object explorer session",
                self.settings.broker.connect_timeout(),
                |s| {
                    s.object_explorer
                        .as_ref()
                        .is_some_and(|oe| oe.ready || oe.error_message.is_some())
                },
            )
            .await?;
        let session = snapshot.object_explorer.unwrap_or_default();
        match session.error_message {
            Some(message) if !session.ready => Err(ClientError::ObjectExplorerFailed(message)),
            _ => Ok(session),
        }
    }

    // ─── Requests ────────────────────────────────────────────────────

    /// Run `query` on the open connection.
    #[tracing::instrument(skip(self))]
    pub async fn execute(&self, query: &str) -> Result<QueryResults> {
        let key = CorrelationKey::for_method(QUERY_SIMPLE_EXECUTE);
        let request = JsonRpcRequest::with_params(
            key.as_str(),
            QUERY_SIMPLE_EXECUTE,
            &SimpleExecuteParams {
                owner_uri: self.owner_uri(),
                query_string: query.to_owned(),
            },
        )?;
        let outcome = self.broker.issue(key, &request).await.await?;
        outcome
            .into_query()
            .ok_or(ClientError::UnexpectedOutcome {
                expected: "query results",
            })
    }

    /// Expand a service node path. The path is the correlation key, so only
    /// one expansion per path may be outstanding.
    #[tracing::instrument(skip(self))]
    pub async fn expand(&self, node_path: &str) -> Result<LoadChildNodesResponse> {
        let session_id = self
            .state
            .snapshot()
            .object_explorer_session_id()
            .map(str::to_owned)
            .ok_or(ClientError::NoObjectExplorerSession)?;
        let request = JsonRpcRequest::with_params(
            CorrelationKey::for_method(OE_EXPAND).into_inner(),
            OE_EXPAND,
            &ExpandParams {
                session_id,
                node_path: node_path.to_owned(),
            },
        )?;
        let outcome = self
            .broker
            .issue(CorrelationKey::for_node_path(node_path), &request)
            .await
            .await?;
        outcome.into_nodes().ok_or(ClientError::UnexpectedOutcome {
            expected: "tree nodes",
        })
    }

    /// Children of a tree node under `artifact`.
    pub async fn load_child_nodes(
        &self,
        artifact: &str,
        parent_path: &str,
    ) -> Result<LoadChildNodesResponse> {
        match child_source(artifact, parent_path) {
            ChildSource::Local(children) => Ok(children),
            ChildSource::Expand { node_path } => self.expand(&node_path).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use pgts_settings::types::ServerSettings;

    fn offline_client() -> PgtsClient {
        PgtsClient::new(PgtsSettings {
            server: ServerSettings {
                base_url: "http://127.0.0.1:9".into(),
                ..ServerSettings::default()
            },
            ..PgtsSettings::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn socket_requires_session() {
        let client = offline_client();
        assert_matches!(client.connect_socket().await, Err(ClientError::NoSession));
        assert_matches!(
            client.connect(ConnectionOptions::default()).await,
            Err(ClientError::NoSession)
        );
    }

    #[tokio::test]
    async fn expand_requires_object_explorer_session() {
        let client = offline_client();
        assert_matches!(
            client.expand("objectexplorer://h/").await,
            Err(ClientError::NoObjectExplorerSession)
        );
        assert_eq!(client.stats().registered, 0);
    }

    #[tokio::test]
    async fn queries_children_need_no_session() {
        let client = offline_client();
        let children = client
            .load_child_nodes("objectexplorer://h/", "objectexplorer://h/Queries")
            .await
            .unwrap();
        assert_eq!(children.tree_nodes[0].display_value, "My Queries");
    }

    #[tokio::test]
    async fn connection_needs_an_id() {
        let client = offline_client();
        client.state.set_connection_info(ConnectionCompleteParams {
            owner_uri: "o".into(),
            ..ConnectionCompleteParams::default()
        });
        assert_matches!(
            client.wait_for_connection().await,
            Err(ClientError::ConnectionFailed(m)) if m.contains("no connection id")
        );

        client.state.set_connection_info(ConnectionCompleteParams {
            owner_uri: "o".into(),
            error_message: Some("password authentication failed".into()),
            ..ConnectionCompleteParams::default()
        });
        assert_matches!(
            client.wait_for_connection().await,
            Err(ClientError::ConnectionFailed(m)) if m == "password authentication failed"
        );

        client.state.set_connection_info(ConnectionCompleteParams {
            owner_uri: "o".into(),
            connection_id: Some("conn-1".into()),
            ..ConnectionCompleteParams::default()
        });
        let info = client.wait_for_connection().await.unwrap();
        assert_eq!(info.connection_id.as_deref(), Some("conn-1"));
    }

    #[test]
    fn owner_uri_prefers_connection() {
        let client = offline_client();
        assert_eq!(client.owner_uri(), "pgts-client-owner-uri");
        client.state.set_connection_info(ConnectionCompleteParams {
            owner_uri: "from-server".into(),
            ..ConnectionCompleteParams::default()
        });
        assert_eq!(client.owner_uri(), "from-server");
    }
}
