//! Object Explorer tree loading.
//!
//! An artifact has two fixed roots: `<artifact>/Server`, whose subtree comes
//! from PGTS through `objectexplorer/expand`, and `<artifact>/Queries`, a
//! client-side folder. Tree paths under `Server` carry the `Server` segment;
//! the service's node paths do not, so requests strip it and results put it
//! back.

use pgts_core::{normalize_path, paths::join_path, trim_uri};
use pgts_rpc::contracts::ExpandCompletedParams;

use crate::results::{LoadChildNodesResponse, TreeNode};

/// Segment of the database root.
pub const SERVER_SEGMENT: &str = "Server";
/// Segment of the saved-queries root.
pub const QUERIES_SEGMENT: &str = "Queries";
/// Segment of the saved-queries folder.
pub const MY_QUERIES_SEGMENT: &str = "MyQueries";

/// Entity type of the server root.
pub const DATABASE_ENTITY: &str = "Database";
/// Entity type of the queries root.
pub const QUERIES_ENTITY: &str = "Queries";
/// Entity type of the saved-queries folder.
pub const MY_QUERIES_ENTITY: &str = "MyQueries";

/// Where the children of a node come from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChildSource {
    /// Fixed client-side children.
    Local(LoadChildNodesResponse),
    /// `objectexplorer/expand` on this service node path.
    Expand {
        /// Node path to send; also the correlation key.
        node_path: String,
    },
}

fn queries_root(artifact: &str) -> String {
    join_path(artifact, QUERIES_SEGMENT)
}

/// Root paths of an artifact: server first, then queries.
pub fn load_artifact(artifact: &str) -> Vec<String> {
    vec![join_path(artifact, SERVER_SEGMENT), queries_root(artifact)]
}

/// The fixed node for a root path.
///
/// The queries root auto-expands; any other root is the server node.
pub fn load_root_node(artifact: &str, root_path: &str) -> TreeNode {
    let queries = queries_root(artifact);
    if root_path == queries {
        TreeNode {
            path: queries,
            parent_path: None,
            entity_type: QUERIES_ENTITY.to_owned(),
            display_value: "Queries".to_owned(),
            is_leaf: false,
            auto_expand: true,
        }
    } else {
        TreeNode {
            path: join_path(artifact, SERVER_SEGMENT),
            parent_path: None,
            entity_type: DATABASE_ENTITY.to_owned(),
            display_value: "Server".to_owned(),
            is_leaf: false,
            auto_expand: false,
        }
    }
}

/// Decide how to load the children of `parent_path`.
pub fn child_source(artifact: &str, parent_path: &str) -> ChildSource {
    if parent_path == queries_root(artifact) {
        ChildSource::Local(queries_children(parent_path))
    } else {
        ChildSource::Expand {
            node_path: expand_request_path(parent_path),
        }
    }
}

/// Children of the queries root.
pub fn queries_children(parent_path: &str) -> LoadChildNodesResponse {
    LoadChildNodesResponse {
        tree_nodes: vec![TreeNode {
            path: join_path(parent_path, MY_QUERIES_SEGMENT),
            parent_path: Some(parent_path.to_owned()),
            entity_type: MY_QUERIES_ENTITY.to_owned(),
            display_value: "My Queries".to_owned(),
            is_leaf: false,
            auto_expand: false,
        }],
    }
}

/// Service node path for a tree path: the first `Server` removed.
pub fn expand_request_path(tree_path: &str) -> String {
    normalize_path(&tree_path.replacen(SERVER_SEGMENT, "", 1))
}

/// Tree nodes for an `expandCompleted` notification.
pub fn expansion_nodes(params: &ExpandCompletedParams) -> LoadChildNodesResponse {
    let uri = trim_uri(&params.session_id);
    // An empty session id matches at the start of the path.
    let parent_path = normalize_path(
        &params
            .node_path
            .replacen(uri, &format!("{uri}/{SERVER_SEGMENT}"), 1),
    );
    let base = normalize_path(&format!("{}/{SERVER_SEGMENT}", params.session_id));

    let tree_nodes = params
        .nodes
        .iter()
        .map(|node| TreeNode {
            path: format!("{base}/{}", node.node_path),
            parent_path: Some(parent_path.clone()),
            entity_type: node.node_type.clone(),
            display_value: node.label.clone(),
            is_leaf: node.is_leaf,
            auto_expand: false,
        })
        .collect();

    LoadChildNodesResponse { tree_nodes }
}
