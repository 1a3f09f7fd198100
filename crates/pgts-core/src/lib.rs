//! # pgts-core
//!
//! Foundation types shared by every PGTS client crate:
//! - [`ids`]: branded request/session IDs and the [`CorrelationKey`] used to
//!   match push-channel frames back to outstanding requests
//! - [`paths`]: Object Explorer path normalization
//! - [`logging`]: `tracing` subscriber setup
//! - [`constants`]: protocol-wide constants

#![deny(unsafe_code)]

pub mod constants;
pub mod ids;
pub mod logging;
pub mod paths;

pub use ids::{CorrelationKey, RequestId, SessionId};
pub use paths::{normalize_path, trim_uri};
