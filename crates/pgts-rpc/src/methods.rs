//! PGTS method names.

/// Open a query connection under an owner URI.
pub const CONNECTION_CONNECT: &str = "connection/connect";
/// Notification: a query connection finished (successfully or not).
pub const CONNECTION_COMPLETE: &str = "connection/complete";
/// Create an Object Explorer session.
pub const OE_CREATE_SESSION: &str = "objectexplorer/createsession";
/// Notification: an Object Explorer session is ready.
pub const OE_SESSION_CREATED: &str = "objectexplorer/sessioncreated";
/// Expand a node in the Object Explorer tree.
pub const OE_EXPAND: &str = "objectexplorer/expand";
/// Notification: children of an expanded node.
pub const OE_EXPAND_COMPLETED: &str = "objectexplorer/expandCompleted";
/// Run a query and return the first result set inline.
pub const QUERY_SIMPLE_EXECUTE: &str = "query/simpleexecute";
