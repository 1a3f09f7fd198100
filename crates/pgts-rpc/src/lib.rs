//! # pgts-rpc
//!
//! JSON-RPC wire format spoken with the PGTS tooling service:
//! - [`types`]: outbound request envelope and HTTP acknowledgement
//! - [`socketio`]: Engine.IO / Socket.IO packets on the push channel
//! - [`frames`]: JSON-RPC messages carried by push-channel events
//! - [`methods`]: method name constants
//! - [`contracts`]: typed params and results for the methods the client uses

#![deny(unsafe_code)]

pub mod contracts;
pub mod frames;
pub mod methods;
pub mod socketio;
pub mod types;

pub use frames::{FrameError, InboundFrame};
pub use socketio::{Packet, PacketError};
pub use types::{HttpAck, JsonRpcRequest, RpcErrorObject};
