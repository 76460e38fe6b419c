//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated, immutable)
//!     → registry, router and prober built from it at boot
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; the registry is static for the process lifetime
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    GatewayConfig, HealthCheckConfig, ListenerConfig, LogFormat, ObservabilityConfig,
    RoutingConfig, ServiceConfig, TimeoutConfig,
};
