//! Typed params and results for the PGTS methods the client uses.
//!
//! Field names follow the service's camelCase wire format. Result types
//! default every optional field so partially-populated server payloads
//! still decode.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ── Connection ──────────────────────────────────────────────────────

/// Connection options submitted by the user.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionOptions {
    /// Database host.
    pub host: String,
    /// Database user.
    pub user: String,
    /// Password. Redacted from `Debug` output.
    pub password: String,
    /// Database name.
    pub dbname: String,
}

impl fmt::Debug for ConnectionOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionOptions")
            .field("host", &self.host)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("dbname", &self.dbname)
            .finish()
    }
}

/// Wrapper the service expects around connection options.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionDetails {
    /// Option map.
    pub options: ConnectionOptions,
}

/// Params for `connection/connect`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectParams {
    /// Owner URI the connection is registered under; queries reference it.
    pub owner_uri: String,
    /// Connection details.
    pub connection: ConnectionDetails,
}

/// Params of the `connection/complete` notification.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConnectionCompleteParams {
    /// Owner URI the connection was opened for.
    pub owner_uri: String,
    /// Set on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connection_id: Option<String>,
    /// Informational messages.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub messages: Option<String>,
    /// Set on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Driver error number, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_number: Option<i64>,
    /// Server version details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_info: Option<Value>,
    /// Server / database / user summary.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connection_summary: Option<Value>,
}

// ── Object Explorer ─────────────────────────────────────────────────

/// Params for `objectexplorer/createsession`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectExplorerSessionParams {
    /// Same options as the query connection.
    pub options: ConnectionOptions,
}

/// Immediate result of `objectexplorer/createsession`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateSessionResponse {
    /// Object Explorer session id (an `objectexplorer://` URI).
    pub session_id: String,
}

/// Params of the `objectexplorer/sessioncreated` notification.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionCreatedParams {
    /// Object Explorer session id.
    pub session_id: String,
    /// Whether the session connected.
    pub success: bool,
    /// Root node of the tree.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root_node: Option<NodeInfo>,
    /// Set on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

/// Params for `objectexplorer/expand`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpandParams {
    /// Object Explorer session id.
    pub session_id: String,
    /// Path of the node to expand.
    pub node_path: String,
}

/// A node returned by the service.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NodeInfo {
    /// Path relative to the session root.
    pub node_path: String,
    /// Node type (`Database`, `Schema`, `Table`, ...).
    pub node_type: String,
    /// Display label.
    pub label: String,
    /// Whether the node has no children.
    pub is_leaf: bool,
    /// Optional subtype.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_sub_type: Option<String>,
    /// Per-node error, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

/// Params of the `objectexplorer/expandCompleted` notification.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExpandCompletedParams {
    /// Object Explorer session id.
    pub session_id: String,
    /// Path that was expanded; matches [`ExpandParams::node_path`].
    pub node_path: String,
    /// Children of the node.
    pub nodes: Vec<NodeInfo>,
    /// Set when the expansion failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

// ── Query ───────────────────────────────────────────────────────────

/// Params for `query/simpleexecute`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimpleExecuteParams {
    /// Owner URI of an open connection.
    pub owner_uri: String,
    /// SQL text.
    pub query_string: String,
}

/// Column metadata of a result set.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DbColumn {
    /// Column name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column_name: Option<String>,
    /// Zero-based ordinal.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column_ordinal: Option<i64>,
    /// Database type name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,
}

/// A single cell.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DbCellValue {
    /// Rendered value; empty for `NULL`.
    pub display_value: String,
    /// Whether the value is `NULL`.
    pub is_null: bool,
    /// Row id within the result set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row_id: Option<i64>,
}

/// Result of `query/simpleexecute`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SimpleExecuteResult {
    /// Number of rows in the result set.
    pub row_count: i64,
    /// Column metadata.
    pub column_info: Vec<DbColumn>,
    /// Row-major cells.
    pub rows: Vec<Vec<DbCellValue>>,
}

// ── Session bootstrap ───────────────────────────────────────────────

/// Body returned by `/start-session`. This endpoint uses snake case.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartSessionResponse {
    /// Web session id bound to the cookie.
    pub session_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn connect_params_wire_shape() {
        let params = ConnectParams {
            owner_uri: "owner".into(),
            connection: ConnectionDetails {
                options: ConnectionOptions {
                    host: "db".into(),
                    user: "u".into(),
                    password: "secret".into(),
                    dbname: "postgres".into(),
                },
            },
        };
        let v = serde_json::to_value(&params).unwrap();
        assert_eq!(v["ownerUri"], "owner");
        assert_eq!(v["connection"]["options"]["host"], "db");
        assert_eq!(v["connection"]["options"]["dbname"], "postgres");
    }

    #[test]
    fn options_debug_redacts_password() {
        let opts = ConnectionOptions {
            password: "hunter2".into(),
            ..ConnectionOptions::default()
        };
        let dbg = format!("{opts:?}");
        assert!(!dbg.contains("hunter2"));
        assert!(dbg.contains("<redacted>"));
    }

    #[test]
    fn expand_completed_from_wire() {
        let params: ExpandCompletedParams = serde_json::from_value(json!({
            "sessionId": "objectexplorer://h:5432:db:u/",
            "nodePath": "/databases/",
            "nodes": [
                {"nodePath": "databases/postgres/", "nodeType": "Database", "label": "postgres", "isLeaf": false},
                {"nodePath": "databases/app/", "nodeType": "Database", "label": "app", "isLeaf": false, "metadata": null}
            ]
        }))
        .unwrap();
        assert_eq!(params.nodes.len(), 2);
        assert_eq!(params.nodes[1].label, "app");
        assert!(params.error_message.is_none());
    }

    #[test]
    fn simple_execute_result_from_wire() {
        let result: SimpleExecuteResult = serde_json::from_value(json!({
            "rowCount": 1,
            "columnInfo": [{"columnName": "n", "columnOrdinal": 0, "dataType": "int4", "isKey": false}],
            "rows": [[{"displayValue": "1", "isNull": false, "rowId": 0}]]
        }))
        .unwrap();
        assert_eq!(result.row_count, 1);
        assert_eq!(result.column_info[0].column_name.as_deref(), Some("n"));
        assert_eq!(result.rows[0][0].display_value, "1");
    }

    #[test]
    fn connection_complete_partial() {
        let params: ConnectionCompleteParams =
            serde_json::from_value(json!({"ownerUri": "o", "errorMessage": "bad password"})).unwrap();
        assert!(params.connection_id.is_none());
        assert_eq!(params.error_message.as_deref(), Some("bad password"));
    }

    #[test]
    fn start_session_snake_case() {
        let resp: StartSessionResponse =
            serde_json::from_str(r#"{"session_id": "7f0c"}"#).unwrap();
        assert_eq!(resp.session_id, "7f0c");
    }
}
