//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured tracing events)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → stdout (pretty or JSON)
//!     → Prometheus exporter (optional, separate port)
//!     → GET /metrics (plain-text health gauges)
//! ```
//!
//! # Design Decisions
//! - Request ID flows from the front door to the backend and back
//! - Metric updates are lock-free through the `metrics` facade

pub mod logging;
pub mod metrics;
