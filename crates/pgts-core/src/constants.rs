//! Protocol-wide constants.

use std::time::Duration;

/// Separator between the method name and the random part of a correlation key.
pub const KEY_DELIMITER: &str = "::";

/// Default time a pending request may wait for its push-channel result.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// JSON-RPC protocol version sent with every request.
pub const JSONRPC_VERSION: &str = "2.0";

/// URI scheme prefix of Object Explorer node paths.
pub const OBJECT_EXPLORER_SCHEME: &str = "objectexplorer://";
