//! Push channel: the Socket.IO connection PGTS delivers results and
//! notifications on.
//!
//! The channel speaks Engine.IO v4 over a WebSocket. [`PushChannel::connect`]
//! finishes the handshake (`0` open, then `40` namespace connect) before it
//! returns. A reader task then answers server pings and feeds every event to
//! the [`Dispatcher`]. When the stream ends, for any reason, the dispatcher
//! is told so that pending requests are rejected instead of waiting out
//! their timeouts.

use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use pgts_rpc::socketio::{self, OpenInfo, Packet};
use tokio::net::TcpStream;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::http::header::COOKIE;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info, warn};

use crate::dispatch::Dispatcher;
use crate::errors::SocketError;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Reason passed to the broker when the client closes the channel.
pub const CLOSED_BY_CLIENT: &str = "push channel closed by client";
/// Reason passed to the broker when the server closes the channel.
pub const CLOSED_BY_SERVER: &str = "push channel closed by server";
/// Reason passed to the broker when server pings stop arriving.
pub const PING_TIMEOUT: &str = "push channel ping timeout";
const CHANNEL_ERROR: &str = "push channel error";

/// Engine.IO WebSocket URL for a Socket.IO endpoint such as
/// `wss://host:8443/socket.io/`.
pub fn socketio_url(endpoint: &str) -> String {
    let sep = if endpoint.contains('?') { '&' } else { '?' };
    format!("{endpoint}{sep}{}", socketio::WEBSOCKET_QUERY)
}

/// Handle to a running push-channel reader.
#[derive(Debug)]
pub struct PushChannel {
    shutdown: Arc<Notify>,
    task: JoinHandle<()>,
}

impl PushChannel {
    /// Open the Socket.IO endpoint at `url`, sending `cookie` in the
    /// WebSocket handshake, join the default namespace and start the reader
    /// task.
    #[tracing::instrument(skip(cookie, dispatcher))]
    pub async fn connect(
        url: &str,
        cookie: Option<&str>,
        handshake_timeout: Duration,
        dispatcher: Arc<Dispatcher>,
    ) -> Result<Self, SocketError> {
        let mut request = socketio_url(url).into_client_request()?;
        if let Some(cookie) = cookie {
            let value = HeaderValue::from_str(cookie)
                .map_err(|e| SocketError::InvalidCookie(e.to_string()))?;
            let _ = request.headers_mut().insert(COOKIE, value);
        }

        let (mut ws, _) = connect_async(request).await?;
        let open = tokio::time::timeout(handshake_timeout, handshake(&mut ws))
            .await
            .map_err(|_| SocketError::HandshakeTimedOut {
                timeout_ms: millis(handshake_timeout),
            })??;
        info!(sid = %open.sid, "push channel connected");
        dispatcher.on_connect();

        let shutdown = Arc::new(Notify::new());
        let task = tokio::spawn(read_loop(
            ws,
            dispatcher,
            Arc::clone(&shutdown),
            open.liveness(),
        ));
        Ok(Self { shutdown, task })
    }

    /// Whether the reader has stopped.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Leave the namespace, close the socket and wait for the reader.
    pub async fn close(self) {
        self.shutdown.notify_one();
        if let Err(e) = self.task.await {
            warn!(error = %e, "push channel reader panicked");
        }
    }
}

async fn handshake(ws: &mut WsStream) -> Result<OpenInfo, SocketError> {
    let open = match next_packet(ws).await? {
        Packet::Open(info) => info,
        other => {
            return Err(SocketError::Handshake(format!(
                "expected open packet, got {other:?}"
            )));
        }
    };
    debug!(
        sid = %open.sid,
        ping_interval = open.ping_interval,
        ping_timeout = open.ping_timeout,
        "engine.io open"
    );

    ws.send(Message::text(socketio::CONNECT)).await?;
    loop {
        match next_packet(ws).await? {
            Packet::Connected { sid } => {
                debug!(?sid, "namespace connected");
                return Ok(open);
            }
            Packet::ConnectError { message } => return Err(SocketError::Rejected(message)),
            Packet::Ping => ws.send(Message::text(socketio::PONG)).await?,
            Packet::Pong | Packet::Noop => {}
            other => {
                return Err(SocketError::Handshake(format!(
                    "unexpected {other:?} before namespace connect"
                )));
            }
        }
    }
}

async fn next_packet(ws: &mut WsStream) -> Result<Packet, SocketError> {
    loop {
        match ws.next().await {
            Some(Ok(Message::Text(text))) => return Ok(Packet::parse(text.as_str())?),
            Some(Ok(Message::Close(_))) | None => {
                return Err(SocketError::Handshake("closed during handshake".into()));
            }
            Some(Ok(_)) => {}
            Some(Err(e)) => return Err(e.into()),
        }
    }
}

async fn read_loop(
    mut ws: WsStream,
    dispatcher: Arc<Dispatcher>,
    shutdown: Arc<Notify>,
    liveness: Duration,
) {
    let silence = tokio::time::sleep(liveness);
    tokio::pin!(silence);

    let reason = loop {
        tokio::select! {
            () = shutdown.notified() => {
                let _ = ws.send(Message::text(socketio::DISCONNECT)).await;
                let _ = ws.close(None).await;
                break CLOSED_BY_CLIENT;
            }
            () = &mut silence => {
                warn!(liveness_ms = millis(liveness), "no ping from server");
                break PING_TIMEOUT;
            }
            msg = ws.next() => match msg {
                Some(Ok(Message::Text(text))) => {
                    silence.as_mut().reset(Instant::now() + liveness);
                    match Packet::parse(text.as_str()) {
                        Ok(Packet::Event { name, data }) => dispatcher.handle_event(&name, data),
                        Ok(Packet::Ping) => {
                            if let Err(e) = ws.send(Message::text(socketio::PONG)).await {
                                warn!(error = %e, "failed to answer ping");
                                break CHANNEL_ERROR;
                            }
                        }
                        Ok(Packet::Close | Packet::Disconnected) => break CLOSED_BY_SERVER,
                        Ok(packet) => debug!(?packet, "ignoring packet"),
                        Err(e) => warn!(error = %e, "dropping undecodable packet"),
                    }
                }
                Some(Ok(Message::Close(frame))) => {
                    debug!(?frame, "close frame received");
                    break CLOSED_BY_SERVER;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!(error = %e, "push channel error");
                    break CHANNEL_ERROR;
                }
                None => break "push channel ended",
            }
        }
    };
    dispatcher.on_disconnect(reason);
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
