//! Outbound JSON-RPC envelope and the HTTP acknowledgement body.

use pgts_core::constants::JSONRPC_VERSION;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Request POSTed to the RPC endpoint.
///
/// The `id` is echoed back on the push channel and is how the client
/// recovers the method a response belongs to.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    /// Always `"2.0"`.
    pub jsonrpc: String,
    /// Request identifier, `<method>::<random>` for client-issued calls.
    pub id: String,
    /// Method name (e.g. `query/simpleexecute`).
    pub method: String,
    /// Parameters object.
    pub params: Value,
}

impl JsonRpcRequest {
    /// Build a request with the fixed protocol version.
    pub fn new(id: impl Into<String>, method: impl Into<String>, params: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_owned(),
            id: id.into(),
            method: method.into(),
            params,
        }
    }

    /// Build a request from typed params.
    pub fn with_params<P: Serialize>(
        id: impl Into<String>,
        method: impl Into<String>,
        params: &P,
    ) -> serde_json::Result<Self> {
        Ok(Self::new(id, method, serde_json::to_value(params)?))
    }
}

/// Body of the HTTP reply to an RPC POST.
///
/// The server only acknowledges dispatch here (`{"result": "ok"}`); real
/// results arrive on the push channel.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct HttpAck {
    /// Present on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Present when the server refused the request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// JSON-RPC error object carried by error frames.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RpcErrorObject {
    /// Numeric error code (0 when the server did not supply one).
    #[serde(default)]
    pub code: i64,
    /// Human-readable message.
    #[serde(default)]
    pub message: String,
    /// Optional structured details.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_wire_shape() {
        let req = JsonRpcRequest::new(
            "query/simpleexecute::abc",
            "query/simpleexecute",
            json!({"ownerUri": "u", "queryString": "select 1"}),
        );
        let v = serde_json::to_value(&req).unwrap();
        assert_eq!(v["jsonrpc"], "2.0");
        assert_eq!(v["id"], "query/simpleexecute::abc");
        assert_eq!(v["method"], "query/simpleexecute");
        assert_eq!(v["params"]["queryString"], "select 1");
    }

    #[test]
    fn request_with_typed_params() {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct P {
            node_path: String,
        }
        let req = JsonRpcRequest::with_params("x::1", "objectexplorer/expand", &P {
            node_path: "/databases/".into(),
        })
        .unwrap();
        assert_eq!(req.params["nodePath"], "/databases/");
    }

    #[test]
    fn ack_ok() {
        let ack: HttpAck = serde_json::from_str(r#"{"result": "ok"}"#).unwrap();
        assert_eq!(ack.result, Some(json!("ok")));
        assert!(ack.error.is_none());
    }

    #[test]
    fn ack_error() {
        let ack: HttpAck =
            serde_json::from_str(r#"{"error": "No session ID found. Please authenticate first."}"#)
                .unwrap();
        assert!(ack.error.unwrap().contains("No session ID"));
    }

    #[test]
    fn error_object_defaults() {
        let err: RpcErrorObject = serde_json::from_str(r#"{"message": "boom"}"#).unwrap();
        assert_eq!(err.code, 0);
        assert_eq!(err.message, "boom");
        assert!(err.data.is_none());
    }
}
