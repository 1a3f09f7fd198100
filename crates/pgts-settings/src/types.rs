//! Settings type definitions.
//!
//! All types use `#[serde(rename_all = "camelCase")]` and `#[serde(default)]`
//! so partial JSON files are accepted; missing fields get their defaults.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::{Result, SettingsError};

/// Root settings type for the PGTS client.
///
/// ```json
/// {
///   "server": { "baseUrl": "https://pgts.internal:8443" },
///   "broker": { "requestTimeoutMs": 30000 }
/// }
/// ```
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PgtsSettings {
    /// Endpoints of the tooling service.
    pub server: ServerSettings,
    /// Pending-request behavior.
    pub broker: BrokerSettings,
    /// Defaults for the connect form.
    pub connection: ConnectionDefaults,
    /// Logging configuration.
    pub logging: LoggingSettings,
}

impl PgtsSettings {
    /// Check values that serde cannot.
    pub fn validate(&self) -> Result<()> {
        let base = &self.server.base_url;
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(SettingsError::InvalidValue(format!(
                "server.baseUrl must use http or https: {base}"
            )));
        }
        for (name, path) in [
            ("rpcPath", &self.server.rpc_path),
            ("startSessionPath", &self.server.start_session_path),
            ("socketPath", &self.server.socket_path),
        ] {
            if !path.starts_with('/') {
                return Err(SettingsError::InvalidValue(format!(
                    "server.{name} must start with '/': {path}"
                )));
            }
        }
        if let Some(ws) = self.server.socket_base_url.as_deref() {
            if !(ws.starts_with("ws://") || ws.starts_with("wss://")) {
                return Err(SettingsError::InvalidValue(format!(
                    "server.socketBaseUrl must use ws or wss: {ws}"
                )));
            }
        }
        if self.broker.request_timeout_ms == 0 {
            return Err(SettingsError::InvalidValue(
                "broker.requestTimeoutMs must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// Tooling-service endpoints.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerSettings {
    /// HTTP base URL, no trailing slash.
    pub base_url: String,
    /// JSON-RPC POST endpoint.
    pub rpc_path: String,
    /// Session bootstrap endpoint.
    pub start_session_path: String,
    /// Socket.IO endpoint of the push channel.
    pub socket_path: String,
    /// WebSocket base URL when the push channel is served elsewhere.
    /// Derived from `base_url` when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub socket_base_url: Option<String>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            base_url: "https://localhost:8443".to_string(),
            rpc_path: "/json-rpc".to_string(),
            start_session_path: "/start-session".to_string(),
            socket_path: "/socket.io/".to_string(),
            socket_base_url: None,
        }
    }
}

impl ServerSettings {
    fn base(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    /// Full URL of the JSON-RPC endpoint.
    pub fn rpc_url(&self) -> String {
        format!("{}{}", self.base(), self.rpc_path)
    }

    /// Full URL of the session bootstrap endpoint.
    pub fn start_session_url(&self) -> String {
        format!("{}{}", self.base(), self.start_session_path)
    }

    /// Full WebSocket URL: `http` becomes `ws`, `https` becomes `wss`.
    pub fn socket_url(&self) -> String {
        if let Some(base) = self.socket_base_url.as_deref() {
            return format!("{}{}", base.trim_end_matches('/'), self.socket_path);
        }
        let base = self.base();
        let ws_base = if let Some(rest) = base.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = base.strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            base.to_owned()
        };
        format!("{ws_base}{}", self.socket_path)
    }
}

/// Pending-request settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BrokerSettings {
    /// How long a request may wait for its push-channel result.
    pub request_timeout_ms: u64,
    /// How long `connect` waits for the connection and Object Explorer
    /// notifications.
    pub connect_timeout_ms: u64,
}

impl Default for BrokerSettings {
    fn default() -> Self {
        Self {
            request_timeout_ms: 10_000,
            connect_timeout_ms: 30_000,
        }
    }
}

impl BrokerSettings {
    /// Request timeout as a [`Duration`].
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Connect timeout as a [`Duration`].
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

/// Defaults for connection parameters. The password is never stored.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConnectionDefaults {
    /// Database host.
    pub host: String,
    /// Database user.
    pub user: String,
    /// Database name.
    pub dbname: String,
    /// Owner URI the query connection is registered under.
    pub owner_uri: String,
}

impl Default for ConnectionDefaults {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            user: "postgres".to_string(),
            dbname: "postgres".to_string(),
            owner_uri: "pgts-client-owner-uri".to_string(),
        }
    }
}

/// Logging configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Default `tracing` filter when `RUST_LOG` is unset.
    pub level: String,
    /// Emit JSON lines instead of compact text.
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            json: false,
        }
    }
}
