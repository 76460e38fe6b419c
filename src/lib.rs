//! Service gateway library.
//!
//! One stable HTTP entry point in front of many independent backend
//! services: a static registry of logical services, background health
//! probing, per-service round-robin load balancing, first-segment path
//! routing, and a streaming request/WebSocket proxy.

pub mod admin;
pub mod config;
pub mod error;
pub mod health;
pub mod http;
pub mod lifecycle;
pub mod load_balancer;
pub mod observability;
pub mod registry;
pub mod routing;

pub use config::GatewayConfig;
pub use error::GatewayError;
pub use http::GatewayServer;
pub use lifecycle::Shutdown;
