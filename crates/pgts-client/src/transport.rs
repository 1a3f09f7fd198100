//! HTTP side of the client: session bootstrap and JSON-RPC POSTs.
//!
//! The service ties the push channel to the HTTP session through a cookie,
//! so one cookie jar is shared by every request and read back for the
//! WebSocket handshake.

use std::sync::Arc;

use async_trait::async_trait;
use pgts_broker::{Outbound, OutboundError};
use pgts_core::SessionId;
use pgts_rpc::contracts::StartSessionResponse;
use pgts_rpc::{HttpAck, JsonRpcRequest};
use pgts_settings::types::ServerSettings;
use reqwest::Url;
use reqwest::cookie::{CookieStore, Jar};
use tracing::{debug, info, warn};

use crate::errors::TransportError;

/// HTTP client bound to one tooling-service instance.
#[derive(Clone, Debug)]
pub struct HttpTransport {
    http: reqwest::Client,
    jar: Arc<Jar>,
    base_url: Url,
    rpc_url: String,
    start_session_url: String,
}

impl HttpTransport {
    /// Build a transport for `server`.
    pub fn new(server: &ServerSettings) -> Result<Self, TransportError> {
        let base_url = Url::parse(&server.base_url)
            .map_err(|e| TransportError::InvalidUrl(format!("{}: {e}", server.base_url)))?;
        let jar = Arc::new(Jar::default());
        let http = reqwest::Client::builder()
            .cookie_provider(Arc::clone(&jar))
            .build()?;
        Ok(Self {
            http,
            jar,
            base_url,
            rpc_url: server.rpc_url(),
            start_session_url: server.start_session_url(),
        })
    }

    /// `Cookie` header value the jar holds for the service, if any.
    pub fn cookie_header(&self) -> Option<String> {
        self.jar
            .cookies(&self.base_url)
            .and_then(|value| value.to_str().ok().map(str::to_owned))
    }

    /// POST `/start-session` and return the web session id.
    ///
    /// The session cookie set by the response stays in the jar.
    #[tracing::instrument(skip_all)]
    pub async fn start_session(&self) -> Result<SessionId, TransportError> {
        let resp = self.http.post(&self.start_session_url).send().await?;
        let status = resp.status().as_u16();
        let body = resp.text().await?;
        if !(200..300).contains(&status) {
            return Err(TransportError::Status {
                status,
                message: error_message(&body),
            });
        }

        let session_id = parse_session_id(&body)?;
        info!(session_id = %session_id, "web session started");
        Ok(session_id)
    }

    /// POST a JSON-RPC request. Success only means the service accepted it;
    /// the result arrives on the push channel.
    #[tracing::instrument(skip_all, fields(id = %request.id, method = %request.method))]
    pub async fn post_rpc(&self, request: &JsonRpcRequest) -> Result<HttpAck, TransportError> {
        let resp = self.http.post(&self.rpc_url).json(request).send().await?;
        let status = resp.status().as_u16();
        let body = resp.text().await?;
        if !(200..300).contains(&status) {
            let message = error_message(&body);
            warn!(status, message = %message, "rpc post failed");
            return Err(TransportError::Status { status, message });
        }

        let ack: HttpAck = serde_json::from_str(&body).unwrap_or_default();
        if let Some(error) = ack.error {
            return Err(TransportError::Rejected(error));
        }
        debug!("rpc accepted");
        Ok(ack)
    }
}

#[async_trait]
impl Outbound for HttpTransport {
    async fn send(&self, request: &JsonRpcRequest) -> Result<(), OutboundError> {
        let _ = self.post_rpc(request).await?;
        Ok(())
    }
}

/// `error` field of a JSON error body, or the raw body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<HttpAck>(body)
        .ok()
        .and_then(|ack| ack.error)
        .unwrap_or_else(|| body.trim().to_owned())
}

/// Accepts `{"session_id": ".."}`, a JSON string, or plain text.
fn parse_session_id(body: &str) -> Result<SessionId, TransportError> {
    if let Ok(resp) = serde_json::from_str::<StartSessionResponse>(body) {
        return non_empty(resp.session_id, body);
    }
    if let Ok(id) = serde_json::from_str::<String>(body) {
        return non_empty(id, body);
    }
    if body.trim_start().starts_with('{') {
        return Err(TransportError::InvalidSession(body.to_owned()));
    }
    non_empty(body.trim().to_owned(), body)
}

fn non_empty(id: String, body: &str) -> Result<SessionId, TransportError> {
    if id.is_empty() {
        Err(TransportError::InvalidSession(body.to_owned()))
    } else {
        Ok(SessionId::from(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn transport_for(server: &MockServer) -> HttpTransport {
        HttpTransport::new(&ServerSettings {
            base_url: server.uri(),
            ..ServerSettings::default()
        })
        .unwrap()
    }

    #[test]
    fn session_id_shapes() {
        assert_eq!(
            parse_session_id(r#"{"session_id": "abc"}"#).unwrap().as_str(),
            "abc"
        );
        assert_eq!(parse_session_id(r#""abc""#).unwrap().as_str(), "abc");
        assert_eq!(parse_session_id("abc\n").unwrap().as_str(), "abc");
        assert_matches!(
            parse_session_id(r#"{"other": 1}"#),
            Err(TransportError::InvalidSession(_))
        );
        assert_matches!(parse_session_id(""), Err(TransportError::InvalidSession(_)));
    }

    #[test]
    fn error_message_prefers_error_field() {
        assert_eq!(error_message(r#"{"error": "No session"}"#), "No session");
        assert_eq!(error_message("  boom "), "boom");
    }

    #[test]
    fn invalid_base_url() {
        let err = HttpTransport::new(&ServerSettings {
            base_url: "not a url".into(),
            ..ServerSettings::default()
        })
        .unwrap_err();
        assert_matches!(err, TransportError::InvalidUrl(_));
    }

    #[tokio::test]
    async fn start_session_keeps_cookie() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/start-session"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("set-cookie", "session=s3cr3t; Path=/")
                    .set_body_json(json!({"session_id": "web-1"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let transport = transport_for(&server);
        assert!(transport.cookie_header().is_none());
        let id = transport.start_session().await.unwrap();
        assert_eq!(id.as_str(), "web-1");
        assert_eq!(transport.cookie_header().as_deref(), Some("session=s3cr3t"));
    }

    #[tokio::test]
    async fn post_rpc_sends_cookie_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/start-session"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("set-cookie", "session=s3cr3t; Path=/")
                    .set_body_json(json!({"session_id": "web-1"})),
            )
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/json-rpc"))
            .and(header("cookie", "session=s3cr3t"))
            .and(body_partial_json(json!({
                "jsonrpc": "2.0",
                "id": "query/simpleexecute::1",
                "method": "query/simpleexecute"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": "ok"})))
            .expect(1)
            .mount(&server)
            .await;

        let transport = transport_for(&server);
        let _ = transport.start_session().await.unwrap();
        let request = JsonRpcRequest::new(
            "query/simpleexecute::1",
            "query/simpleexecute",
            json!({"ownerUri": "o", "queryString": "select 1"}),
        );
        let ack = transport.post_rpc(&request).await.unwrap();
        assert_eq!(ack.result, Some(json!("ok")));
    }

    #[tokio::test]
    async fn post_rpc_status_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/json-rpc"))
            .respond_with(
                ResponseTemplate::new(403)
                    .set_body_json(json!({"error": "No session ID found. Please authenticate first."})),
            )
            .mount(&server)
            .await;

        let transport = transport_for(&server);
        let request = JsonRpcRequest::new("x::1", "x", json!({}));
        let err = transport.post_rpc(&request).await.unwrap_err();
        assert_matches!(
            err,
            TransportError::Status { status: 403, message } if message.starts_with("No session ID")
        );
    }

    #[tokio::test]
    async fn post_rpc_error_body_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/json-rpc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"error": "bad params"})))
            .mount(&server)
            .await;

        let transport = transport_for(&server);
        let request = JsonRpcRequest::new("x::1", "x", json!({}));
        assert_matches!(
            transport.post_rpc(&request).await,
            Err(TransportError::Rejected(msg)) if msg == "bad params"
        );
    }

    #[tokio::test]
    async fn outbound_maps_transport_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/json-rpc"))
            .respond_with(ResponseTemplate::new(500).set_body_string("dispatch failed"))
            .mount(&server)
            .await;

        let transport = transport_for(&server);
        let request = JsonRpcRequest::new("x::1", "x", json!({}));
        let err = Outbound::send(&transport, &request).await.unwrap_err();
        assert_eq!(err.to_string(), "http status 500: dispatch failed");
    }
}
