//! Inbound push-channel frames.
//!
//! PGTS emits three Socket.IO events on the push channel: `response`,
//! `notification` and `error`. The argument is normally the JSON-RPC message
//! serialized to a string:
//!
//! ```text
//! 42["response","{\"id\": \"query/simpleexecute::1\", \"result\": {}}"]
//! ```
//!
//! Errors raised by the web layer itself arrive as a plain object such as
//! `{"result": "Error processing request!", "exception": "..."}`.

use serde_json::{Map, Value};
use thiserror::Error;

use crate::types::RpcErrorObject;

/// A classified push-channel frame.
#[derive(Clone, Debug, PartialEq)]
pub enum InboundFrame {
    /// Result of an earlier request, matched by `id`.
    Response {
        /// Echoed request id.
        id: String,
        /// Result payload (`null` if absent).
        result: Value,
    },
    /// Server-initiated message, routed by `method`.
    Notification {
        /// Notification method name.
        method: String,
        /// Notification payload (`null` if absent).
        params: Value,
    },
    /// Error reply, optionally tied to a request.
    Error {
        /// Request id, when the server supplied one.
        id: Option<String>,
        /// Error details.
        error: RpcErrorObject,
    },
}

/// Reasons an inbound frame could not be classified.
#[derive(Debug, Error)]
pub enum FrameError {
    /// Event payload was not valid JSON.
    #[error("invalid frame JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
    /// Event payload was valid JSON but not an object.
    #[error("frame is not a JSON object")]
    NotAnObject,
    /// Event name is not one PGTS emits.
    #[error("unknown frame event: {0}")]
    UnknownEvent(String),
    /// A field required for the frame kind is missing or mistyped.
    #[error("{kind} frame missing field `{field}`")]
    MissingField {
        /// Frame kind being decoded.
        kind: &'static str,
        /// Field that was expected.
        field: &'static str,
    },
}

impl InboundFrame {
    /// Decode the argument of a push-channel event.
    pub fn from_event(event: &str, data: Value) -> Result<Self, FrameError> {
        let Value::Object(obj) = unwrap_data(data)? else {
            return Err(FrameError::NotAnObject);
        };
        match event {
            "response" => Self::response(obj),
            "notification" => Self::notification(obj),
            "error" => Ok(Self::error(obj)),
            other => Err(FrameError::UnknownEvent(other.to_owned())),
        }
    }

    fn response(mut obj: Map<String, Value>) -> Result<Self, FrameError> {
        let id = take_string(&mut obj, "id").ok_or(FrameError::MissingField {
            kind: "response",
            field: "id",
        })?;
        let result = obj.remove("result").unwrap_or(Value::Null);
        Ok(Self::Response { id, result })
    }

    fn notification(mut obj: Map<String, Value>) -> Result<Self, FrameError> {
        let method = take_string(&mut obj, "method").ok_or(FrameError::MissingField {
            kind: "notification",
            field: "method",
        })?;
        let params = obj.remove("params").unwrap_or(Value::Null);
        Ok(Self::Notification { method, params })
    }

    // Error events are never rejected: the web server sometimes sends a bare
    // `{"result": "..."}` instead of a JSON-RPC error object.
    fn error(mut obj: Map<String, Value>) -> Self {
        let id = take_string(&mut obj, "id");
        let error = match obj.remove("error") {
            Some(raw) => serde_json::from_value::<RpcErrorObject>(raw.clone()).unwrap_or_else(|_| {
                RpcErrorObject {
                    code: 0,
                    message: value_text(&raw),
                    data: None,
                }
            }),
            None => RpcErrorObject {
                code: 0,
                message: obj.get("result").map(value_text).unwrap_or_default(),
                data: obj.remove("exception"),
            },
        };
        Self::Error { id, error }
    }
}

fn unwrap_data(data: Value) -> Result<Value, FrameError> {
    match data {
        Value::String(s) => Ok(serde_json::from_str(&s)?),
        other => Ok(other),
    }
}

fn take_string(obj: &mut Map<String, Value>, key: &str) -> Option<String> {
    match obj.remove(key)? {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    #[test]
    fn response_with_string_data() {
        let data = json!(r#"{"id": "query/simpleexecute::abc123", "jsonrpc": "2.0", "result": {"rowCount": 1}}"#);
        assert_eq!(
            InboundFrame::from_event("response", data).unwrap(),
            InboundFrame::Response {
                id: "query/simpleexecute::abc123".into(),
                result: json!({"rowCount": 1}),
            }
        );
    }

    #[test]
    fn notification_with_object_data() {
        let data = json!({"method": "connection/complete", "params": {"ownerUri": "u"}});
        assert_matches!(
            InboundFrame::from_event("notification", data).unwrap(),
            InboundFrame::Notification { method, params } if method == "connection/complete" && params["ownerUri"] == "u"
        );
    }

    #[test]
    fn error_with_rpc_error() {
        let data = json!(r#"{"id": "query/simpleexecute::1", "error": {"code": -32603, "message": "relation does not exist"}}"#);
        let frame = InboundFrame::from_event("error", data).unwrap();
        assert_matches!(frame, InboundFrame::Error { id: Some(ref id), ref error }
            if id == "query/simpleexecute::1" && error.code == -32603 && error.message == "relation does not exist");
    }

    #[test]
    fn error_from_web_layer() {
        let data = json!({"result": "Error processing request!", "exception": "boom"});
        assert_matches!(
            InboundFrame::from_event("error", data).unwrap(),
            InboundFrame::Error { id: None, error } if error.message == "Error processing request!" && error.data == Some(json!("boom"))
        );
    }

    #[test]
    fn unknown_event() {
        assert_matches!(
            InboundFrame::from_event("json", json!({})),
            Err(FrameError::UnknownEvent(e)) if e == "json"
        );
    }

    #[test]
    fn bad_inner_json() {
        assert_matches!(
            InboundFrame::from_event("response", json!("{nope")),
            Err(FrameError::InvalidJson(_))
        );
    }

    #[test]
    fn response_missing_result_is_null() {
        let frame = InboundFrame::from_event("response", json!({"id": "x::1"})).unwrap();
        assert_eq!(frame, InboundFrame::Response { id: "x::1".into(), result: Value::Null });
    }

    #[test]
    fn numeric_id_is_stringified() {
        let frame = InboundFrame::from_event("response", json!({"id": 7, "result": 1})).unwrap();
        assert_eq!(frame, InboundFrame::Response { id: "7".into(), result: json!(1) });
    }

    #[test]
    fn rejects_non_objects_and_missing_fields() {
        assert_matches!(
            InboundFrame::from_event("response", json!("[1,2]")),
            Err(FrameError::NotAnObject)
        );
        assert_matches!(
            InboundFrame::from_event("response", json!({"result": 1})),
            Err(FrameError::MissingField { kind: "response", field: "id" })
        );
        assert_matches!(
            InboundFrame::from_event("notification", json!({"method": 5})),
            Err(FrameError::MissingField { kind: "notification", field: "method" })
        );
    }
}
