//! # pgts-client
//!
//! Client for the PGTS tooling service.
//!
//! Requests go out as JSON-RPC over HTTP POST; their results come back on a
//! Socket.IO push channel bound to the same cookie session. The pieces:
//! - [`transport`]: `reqwest` client for `/start-session` and `/json-rpc`
//! - [`socket`]: Socket.IO handshake and push-channel reader task
//! - [`dispatch`]: routes inbound events to the broker or to session state
//! - [`state`]: shared session state (connection, Object Explorer session)
//! - [`object_explorer`]: tree loading on top of `objectexplorer/expand`
//! - [`query`]: `query/simpleexecute` result shaping
//! - [`client`]: [`PgtsClient`], the facade wiring it all together

#![deny(unsafe_code)]

pub mod client;
pub mod dispatch;
pub mod errors;
pub mod object_explorer;
pub mod query;
pub mod results;
pub mod socket;
pub mod state;
pub mod transport;

pub use client::PgtsClient;
pub use errors::{ClientError, Result, SocketError, TransportError};
pub use results::{LoadChildNodesResponse, Outcome, QueryResults, TreeNode};
pub use state::{ObjectExplorerSession, SessionSnapshot, SessionState};
