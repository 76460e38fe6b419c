//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Identity reported by the root descriptor.
    pub gateway: GatewayInfo,

    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Logical services and their instance pools.
    pub services: Vec<ServiceConfig>,

    /// Path routing keyword table.
    pub routing: RoutingConfig,

    /// Health probe settings.
    pub health_check: HealthCheckConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Request size limits.
    pub limits: LimitsConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Gateway identity.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GatewayInfo {
    /// Name reported by `GET /`.
    pub name: String,
}

impl Default for GatewayInfo {
    fn default() -> Self {
        Self {
            name: "api-gateway".to_string(),
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8000").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8000".to_string(),
        }
    }
}

/// One logical service.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServiceConfig {
    /// Unique service name, also usable as the first path segment.
    pub name: String,

    /// Instance base URLs in round-robin order (e.g., "http://10.0.0.5:8001").
    #[serde(default)]
    pub instances: Vec<String>,

    /// Path probed for liveness.
    #[serde(default = "default_health_path")]
    pub health_path: String,

    /// Informational priority, reported by `/services`.
    #[serde(default)]
    pub priority: i32,

    /// Backend path used when relaying WebSocket connections.
    #[serde(default = "default_ws_path")]
    pub ws_path: String,
}

fn default_health_path() -> String {
    "/health".to_string()
}

fn default_ws_path() -> String {
    "/ws".to_string()
}

impl ServiceConfig {
    /// Service with default health and WebSocket paths.
    pub fn new(name: impl Into<String>, instances: Vec<String>) -> Self {
        Self {
            name: name.into(),
            instances,
            health_path: default_health_path(),
            priority: 0,
            ws_path: default_ws_path(),
        }
    }
}

/// Path routing keyword table.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RoutingConfig {
    /// First-segment alias -> service name (e.g., `login = "auth"`).
    pub aliases: BTreeMap<String, String>,
}

/// Health probe configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HealthCheckConfig {
    /// Enable the background prober.
    pub enabled: bool,

    /// Probe cycle interval in seconds.
    pub interval_secs: u64,

    /// Per-probe timeout in seconds.
    pub timeout_secs: u64,

    /// Healthy-service ratio below which `/health` reports "degraded".
    pub degraded_threshold: f64,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 30,
            timeout_secs: 5,
            degraded_threshold: 0.7,
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Deadline for a backend to produce response headers, in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Request size limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum request body size in bytes.
    pub max_body_bytes: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: 50 * 1024 * 1024, // document uploads
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable the Prometheus exporter.
    pub metrics_enabled: bool,

    /// Prometheus exporter bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
