//! Branded ID newtypes and correlation keys.
//!
//! Request IDs are UUID v7 (time-ordered) generated via [`uuid::Uuid::now_v7`].
//! A [`CorrelationKey`] is what the broker indexes pending requests by: either
//! `<method>::<request id>` for RPC-style calls or a raw node path for
//! Object Explorer expansion.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::constants::KEY_DELIMITER;

macro_rules! branded_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Return the inner string as a slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume self and return the inner `String`.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl std::ops::Deref for $name {
            type Target = str;
            fn deref(&self) -> &str {
                &self.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl std::borrow::Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_owned())
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

branded_id! {
    /// Random part of an RPC correlation key.
    RequestId
}

branded_id! {
    /// PGTS web session, returned by `/start-session`.
    SessionId
}

branded_id! {
    /// Key the broker matches inbound frames against.
    CorrelationKey
}

impl RequestId {
    /// Create a new random ID (UUID v7, time-ordered).
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7().simple().to_string())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl CorrelationKey {
    /// Key for an RPC-style call: `<method>::<fresh request id>`.
    #[must_use]
    pub fn for_method(method: &str) -> Self {
        Self::with_request_id(method, &RequestId::new())
    }

    /// Key for an RPC-style call with a caller-supplied request id.
    #[must_use]
    pub fn with_request_id(method: &str, id: &RequestId) -> Self {
        Self(format!("{method}{KEY_DELIMITER}{id}"))
    }

    /// Key for a tree-node expansion. At most one expansion per path is
    /// outstanding, so the path itself is the key.
    #[must_use]
    pub fn for_node_path(path: &str) -> Self {
        Self(path.to_owned())
    }

    /// Method name encoded in the key: everything before the first `::`.
    ///
    /// Returns `None` for keys without a delimiter (node paths).
    pub fn method(&self) -> Option<&str> {
        self.0.split_once(KEY_DELIMITER).map(|(method, _)| method)
    }
}

/// Extract the method name from a raw response id.
///
/// Ids without a delimiter are returned whole, so an unknown id still routes
/// to the "unhandled" branch of a dispatcher rather than being lost.
pub fn method_of(id: &str) -> &str {
    id.split_once(KEY_DELIMITER).map_or(id, |(method, _)| method)
}
