//! Values the broker hands back to callers.
//!
//! These are the client-side shapes, already transformed from the wire
//! contracts in `pgts-rpc`.

use serde::{Deserialize, Serialize};

// ── Object Explorer ─────────────────────────────────────────────────

/// A node in the client's tree.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeNode {
    /// Normalized node path; unique within the tree.
    pub path: String,
    /// Path of the parent node. `None` for roots.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_path: Option<String>,
    /// Node kind (`Queries`, `MyQueries`, `Database`, `Schema`, ...).
    pub entity_type: String,
    /// Label shown to the user.
    pub display_value: String,
    /// Whether the node can have children.
    pub is_leaf: bool,
    /// Whether the node should be expanded as soon as it is shown.
    #[serde(default)]
    pub auto_expand: bool,
}

/// Children of an expanded node.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadChildNodesResponse {
    /// Child nodes in server order.
    pub tree_nodes: Vec<TreeNode>,
}

// ── Query ───────────────────────────────────────────────────────────

/// Final status of a query.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionStatus {
    /// Rows were returned.
    Success,
    /// The query failed.
    Failed,
}

/// One column of a result grid.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnSchema {
    /// Column name (empty when the server omitted it).
    pub column_name: String,
    /// Zero-based position.
    pub ordinal: i64,
    /// Display type. Cells are rendered text, so this is always `String`.
    pub data_type: String,
}

/// One row of a result grid.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridRow {
    /// Row position.
    pub index: usize,
    /// Cell display values, in column order.
    pub data: Vec<String>,
}

/// A single result set.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataGrid {
    /// Column schema.
    pub schema: Vec<ColumnSchema>,
    /// Rows.
    pub rows: Vec<GridRow>,
}

/// Results of `query/simpleexecute`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResults {
    /// Informational messages.
    pub messages: Vec<String>,
    /// Result sets; `simpleexecute` produces exactly one.
    pub results: Vec<DataGrid>,
    /// Overall status.
    pub status: ExecutionStatus,
    /// Row count reported by the server.
    pub row_count: i64,
}

// ── Broker payload ──────────────────────────────────────────────────

/// What a pending request resolves to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// A `query/simpleexecute` result.
    Query(QueryResults),
    /// An `objectexplorer/expandCompleted` result.
    Nodes(LoadChildNodesResponse),
}

impl Outcome {
    /// Unwrap a query result.
    pub fn into_query(self) -> Option<QueryResults> {
        match self {
            Self::Query(results) => Some(results),
            Self::Nodes(_) => None,
        }
    }

    /// Unwrap an expansion result.
    pub fn into_nodes(self) -> Option<LoadChildNodesResponse> {
        match self {
            Self::Nodes(nodes) => Some(nodes),
            Self::Query(_) => None,
        }
    }
}
