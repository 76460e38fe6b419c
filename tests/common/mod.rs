//! Shared utilities for integration testing.

#![allow(dead_code)]

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    routing::get,
    Json, Router,
};
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;

use service_gateway::config::{GatewayConfig, ServiceConfig};
use service_gateway::health::HealthTable;
use service_gateway::registry::InstanceAddress;
use service_gateway::{GatewayServer, Shutdown};

/// Start an HTTP backend whose `/health` answers `health_status` and which
/// echoes every other request back as JSON tagged with `name`.
pub async fn spawn_backend_with_health(name: &'static str, health_status: StatusCode) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let app = Router::new()
        .route("/health", get(move || async move { (health_status, "ok") }))
        .fallback(echo)
        .with_state(name);

    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}

/// Start a healthy echo backend.
pub async fn spawn_backend(name: &'static str) -> SocketAddr {
    spawn_backend_with_health(name, StatusCode::OK).await
}

async fn echo(State(name): State<&'static str>, request: Request<Body>) -> Json<Value> {
    let (parts, body) = request.into_parts();
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap_or_default();
    let header = |n: &str| {
        parts
            .headers
            .get(n)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };

    Json(json!({
        "backend": name,
        "method": parts.method.as_str(),
        "path": parts.uri.path_and_query().map(|p| p.as_str()).unwrap_or("/"),
        "host": header("host"),
        "authorization": header("authorization"),
        "x_request_id": header("x-request-id"),
        "x_forwarded_for": header("x-forwarded-for"),
        "body": String::from_utf8_lossy(&bytes),
    }))
}

/// Start a backend that accepts connections and never answers.
pub async fn spawn_silent_backend() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });
    addr
}

/// Start a backend that sends response headers announcing 100 bytes, writes
/// only a few of them, then stalls with the connection open.
pub async fn spawn_stalling_backend() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((mut socket, _)) = listener.accept().await {
            let mut buf = [0u8; 4096];
            let _ = socket.read(&mut buf).await;
            let _ = socket
                .write_all(b"HTTP/1.1 200 OK\r\ncontent-length: 100\r\n\r\npartial")
                .await;
            held.push(socket);
        }
    });
    addr
}

/// Events reported by [`spawn_hanging_backend`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerEvent {
    Started,
    Dropped,
}

struct DropNotice(mpsc::UnboundedSender<HandlerEvent>);

impl Drop for DropNotice {
    fn drop(&mut self) {
        let _ = self.0.send(HandlerEvent::Dropped);
    }
}

/// Start a backend whose handler never answers and reports when it starts
/// and when its future is dropped.
pub async fn spawn_hanging_backend() -> (SocketAddr, mpsc::UnboundedReceiver<HandlerEvent>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = mpsc::unbounded_channel();

    let app = Router::new()
        .fallback(|State(tx): State<mpsc::UnboundedSender<HandlerEvent>>| async move {
            let _notice = DropNotice(tx.clone());
            let _ = tx.send(HandlerEvent::Started);
            tokio::time::sleep(Duration::from_secs(60)).await;
            "late"
        })
        .with_state(tx);

    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    (addr, rx)
}

/// An address with nothing listening on it.
pub async fn closed_port() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

/// Start a WebSocket backend that echoes text frames as `echo: <text>`.
pub async fn spawn_ws_echo_backend() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            tokio::spawn(async move {
                let Ok(mut ws) = tokio_tungstenite::accept_async(stream).await else {
                    return;
                };
                while let Some(Ok(msg)) = ws.next().await {
                    let reply = match msg {
                        Message::Text(text) => Message::Text(format!("echo: {}", text.as_str()).into()),
                        Message::Binary(data) => Message::Binary(data),
                        Message::Close(_) => break,
                        _ => continue,
                    };
                    if ws.send(reply).await.is_err() {
                        break;
                    }
                }
            });
        }
    });
    addr
}

/// Start a WebSocket backend that forwards every close frame it receives
/// to the returned channel and completes the close handshake.
pub async fn spawn_ws_close_recorder() -> (SocketAddr, mpsc::UnboundedReceiver<Option<(u16, String)>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let tx = tx.clone();
            tokio::spawn(async move {
                let Ok(mut ws) = tokio_tungstenite::accept_async(stream).await else {
                    return;
                };
                // Keep reading after a close so the reply gets flushed.
                while let Some(Ok(msg)) = ws.next().await {
                    if let Message::Close(frame) = msg {
                        let _ = tx.send(frame.map(|f| (u16::from(f.code), f.reason.as_str().to_string())));
                    }
                }
            });
        }
    });
    (addr, rx)
}

pub fn instance_url(addr: SocketAddr) -> String {
    format!("http://{}", addr)
}

pub fn instance(addr: SocketAddr) -> InstanceAddress {
    InstanceAddress::parse(&instance_url(addr)).unwrap()
}

pub fn service(name: &str, addrs: &[SocketAddr]) -> ServiceConfig {
    ServiceConfig::new(name, addrs.iter().map(|a| instance_url(*a)).collect())
}

/// Config with the background prober disabled so tests control health.
pub fn config(services: Vec<ServiceConfig>) -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.services = services;
    config.health_check.enabled = false;
    config
}

/// A gateway running on an ephemeral port. Shuts down on drop.
pub struct TestGateway {
    pub addr: SocketAddr,
    pub health: Arc<HealthTable>,
    shutdown: Shutdown,
}

impl TestGateway {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn mark(&self, addr: SocketAddr, healthy: bool) {
        self.health.record(&instance(addr), healthy);
    }
}

impl Drop for TestGateway {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

pub async fn start_gateway(config: GatewayConfig) -> TestGateway {
    let server = GatewayServer::new(config).expect("valid gateway config");
    let health = server.health();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    TestGateway {
        addr,
        health,
        shutdown,
    }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
