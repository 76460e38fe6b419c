//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware, gateway endpoints)
//!     → request.rs (request ID)
//!     → routing (path → logical service)
//!     → load_balancer (service → instance)
//!     → proxy.rs + headers.rs (rewrite, forward, relay response)
//!     → response.rs (JSON bodies for gateway-generated errors)
//!     → Send to client
//!
//! /ws/{service_name}
//!     → websocket.rs (upgrade, backend socket, frame pump)
//! ```

pub mod headers;
pub mod proxy;
pub mod request;
pub mod response;
pub mod server;
pub mod websocket;

pub use proxy::{ProxyContext, RequestProxy};
pub use request::{UuidRequestId, X_REQUEST_ID};
pub use server::{AppState, GatewayServer};
