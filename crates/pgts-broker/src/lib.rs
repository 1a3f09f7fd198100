//! # pgts-broker
//!
//! Bridges an outbound request (HTTP POST) with its result, which arrives
//! later on a different channel (the push socket).
//!
//! Flow:
//! 1. Caller picks a [`CorrelationKey`](pgts_core::CorrelationKey) and calls
//!    [`Broker::issue`], which registers the key, arms a timeout, sends the
//!    request through an [`Outbound`] and returns a [`PendingResponse`]
//! 2. The push-channel dispatcher sees a matching frame and calls
//!    [`Broker::complete`] or [`Broker::fail`]
//! 3. The caller's `PendingResponse` resolves, or rejects with
//!    [`BrokerError::TimedOut`] if nothing arrived in time
//!
//! Exactly one of completion, failure, timeout, or cancellation settles
//! each entry; the others become no-ops.

#![deny(unsafe_code)]

pub mod broker;
pub mod errors;
pub mod outbound;
pub mod pending;

pub use broker::{Broker, BrokerStats};
pub use errors::{BrokerError, BrokerResult};
pub use outbound::{Outbound, OutboundError};
pub use pending::PendingResponse;
