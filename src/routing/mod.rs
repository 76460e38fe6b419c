//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request path
//!     → matcher.rs (first segment, reserved-path check)
//!     → router.rs (alias table, then registered service names)
//!     → Return: logical service name or NoRouteFound
//!
//! Table construction (at startup):
//!     [routing.aliases] + registry names
//!     → Freeze as immutable PathRouter
//! ```
//!
//! # Design Decisions
//! - Tables built at startup, immutable at runtime
//! - No regex in hot path (single segment lookup)
//! - Deterministic: same path always resolves to the same service

pub mod matcher;
pub mod router;

pub use router::PathRouter;
