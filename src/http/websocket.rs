//! WebSocket relay.
//!
//! # Responsibilities
//! - Complete the upgrade with the client on `/ws/{service_name}`
//! - Resolve an instance through the load balancer
//! - Open a backend socket and forward frames in both directions
//!
//! # Data Flow
//! ```text
//! Client ←──── WebSocket frames ────→ Gateway ←──── WebSocket frames ────→ Backend
//! ```
//!
//! # Design Decisions
//! - Text, binary and close frames are forwarded; ping/pong stay per-hop
//! - Either side closing or failing ends both directions
//! - A client close is forwarded and the backend's reply awaited briefly; the
//!   client's own handshake is answered by echoing its close frame
//! - No instance: close code 1013; backend unreachable: close code 1011

use axum::{
    extract::{
        ws::{close_code, CloseFrame, Message, WebSocket, WebSocketUpgrade},
        Path, RawQuery, State,
    },
    http::{header, HeaderMap},
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio_tungstenite::tungstenite::{
    self,
    client::IntoClientRequest,
    protocol::{frame::coding::CloseCode, CloseFrame as BackendCloseFrame},
};

use crate::error::GatewayError;
use crate::http::request::X_REQUEST_ID;
use crate::http::server::AppState;

/// Close reasons are capped at 123 bytes by the protocol.
const MAX_CLOSE_REASON: usize = 123;

/// How long a client-initiated close waits for the backend's reply.
const CLOSE_ACK_WAIT: Duration = Duration::from_secs(1);

/// Headers copied onto the backend handshake.
const FORWARDED_HEADERS: [header::HeaderName; 3] = [
    header::AUTHORIZATION,
    header::COOKIE,
    header::HeaderName::from_static(X_REQUEST_ID),
];

/// `GET /ws/{service_name}`.
pub async fn ws_handler(
    State(state): State<AppState>,
    Path(service): Path<String>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Response {
    tracing::debug!(service = %service, "WebSocket upgrade requested");
    ws.on_upgrade(move |socket| relay(state, service, query, headers, socket))
}

async fn relay(
    state: AppState,
    service: String,
    query: Option<String>,
    headers: HeaderMap,
    mut client: WebSocket,
) {
    let url = match backend_url(&state, &service, query.as_deref()) {
        Ok(url) => url,
        Err(e) => {
            tracing::warn!(service = %service, error = %e, "WebSocket relay unavailable");
            close_client(&mut client, close_code::AGAIN, &e.to_string()).await;
            return;
        }
    };

    let backend = match connect_backend(&state, &url, &headers).await {
        Ok(backend) => backend,
        Err(reason) => {
            tracing::warn!(service = %service, url = %url, error = %reason, "WebSocket backend connection failed");
            close_client(&mut client, close_code::ERROR, &reason).await;
            return;
        }
    };

    tracing::info!(service = %service, url = %url, "WebSocket relay established");
    pump(client, backend).await;
    tracing::info!(service = %service, url = %url, "WebSocket relay closed");
}

fn backend_url(state: &AppState, service: &str, query: Option<&str>) -> Result<String, GatewayError> {
    let instance = state.balancer.select_instance(service)?;
    let descriptor = state.balancer.registry().get(service)?;

    let mut path = descriptor.ws_path.clone();
    if let Some(query) = query {
        path.push('?');
        path.push_str(query);
    }
    Ok(instance.ws_url_for(&path))
}

type BackendSocket =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

async fn connect_backend(
    state: &AppState,
    url: &str,
    headers: &HeaderMap,
) -> Result<BackendSocket, String> {
    let mut request = url.into_client_request().map_err(|e| e.to_string())?;
    for name in &FORWARDED_HEADERS {
        if let Some(value) = headers.get(name) {
            request.headers_mut().insert(name.clone(), value.clone());
        }
    }

    match tokio::time::timeout(state.proxy.timeout(), tokio_tungstenite::connect_async(request)).await {
        Ok(Ok((socket, _response))) => Ok(socket),
        Ok(Err(e)) => Err(e.to_string()),
        Err(_) => Err("timed out connecting to backend".to_string()),
    }
}

async fn close_client(client: &mut WebSocket, code: u16, reason: &str) {
    let frame = CloseFrame {
        code,
        reason: truncate_reason(reason).to_owned().into(),
    };
    let _ = client.send(Message::Close(Some(frame))).await;
}

fn truncate_reason(reason: &str) -> &str {
    if reason.len() <= MAX_CLOSE_REASON {
        return reason;
    }
    let mut end = MAX_CLOSE_REASON;
    while !reason.is_char_boundary(end) {
        end -= 1;
    }
    &reason[..end]
}

/// Forward frames until either side closes, then close both.
async fn pump(client: WebSocket, backend: BackendSocket) {
    let (mut client_tx, mut client_rx) = client.split();
    let (mut backend_tx, mut backend_rx) = backend.split();

    let client_to_backend = async {
        while let Some(Ok(msg)) = client_rx.next().await {
            let Some(msg) = to_backend(msg) else { continue };
            let closing = msg.is_close();
            if backend_tx.send(msg).await.is_err() || closing {
                break;
            }
        }
    };

    let backend_to_client = async {
        while let Some(Ok(msg)) = backend_rx.next().await {
            let Some(msg) = to_client(msg) else { continue };
            let closing = matches!(msg, Message::Close(_));
            if client_tx.send(msg).await.is_err() || closing {
                break;
            }
        }
    };

    let client_closed = tokio::select! {
        _ = client_to_backend => true,
        _ = backend_to_client => false,
    };

    if client_closed {
        // Let the backend acknowledge the forwarded close before the socket goes away.
        let ack = tokio::time::timeout(CLOSE_ACK_WAIT, async {
            while let Some(Ok(msg)) = backend_rx.next().await {
                if msg.is_close() {
                    return true;
                }
            }
            false
        })
        .await;
        tracing::debug!(acknowledged = matches!(ack, Ok(true)), "Backend close handshake");
    }

    let _ = client_tx.close().await;
    let _ = backend_tx.close().await;
}

fn to_backend(msg: Message) -> Option<tungstenite::Message> {
    match msg {
        Message::Text(text) => Some(tungstenite::Message::Text(text.as_str().to_owned().into())),
        Message::Binary(data) => Some(tungstenite::Message::Binary(data)),
        Message::Close(frame) => Some(tungstenite::Message::Close(frame.map(|f| {
            BackendCloseFrame {
                code: CloseCode::from(f.code),
                reason: f.reason.as_str().to_owned().into(),
            }
        }))),
        Message::Ping(_) | Message::Pong(_) => None,
    }
}

fn to_client(msg: tungstenite::Message) -> Option<Message> {
    match msg {
        tungstenite::Message::Text(text) => Some(Message::Text(text.as_str().to_owned().into())),
        tungstenite::Message::Binary(data) => Some(Message::Binary(data)),
        tungstenite::Message::Close(frame) => Some(Message::Close(frame.map(|f| CloseFrame {
            code: u16::from(f.code),
            reason: f.reason.as_str().to_owned().into(),
        }))),
        tungstenite::Message::Ping(_)
        | tungstenite::Message::Pong(_)
        | tungstenite::Message::Frame(_) => None,
    }
}
