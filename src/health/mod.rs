//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Active health checks (active.rs):
//!     Periodic timer (default 30s)
//!     → Probe every instance concurrently (5s timeout each)
//!     → Overwrite its record in state.rs
//!
//! Health table (state.rs):
//!     InstanceAddress → HealthRecord { healthy, last_checked }
//!     Read by the load balancer and the front-door endpoints
//! ```
//!
//! # Design Decisions
//! - One probe outcome fully replaces the previous one (no hysteresis)
//! - A routing decision may see a snapshot up to one interval stale
//! - Probe failures are logged, never raised

pub mod active;
pub mod state;

pub use active::HealthProber;
pub use state::{HealthRecord, HealthTable};
