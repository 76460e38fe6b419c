//! Load balancing subsystem.
//!
//! # Data Flow
//! ```text
//! Service name resolved by the path router
//!     → registry lookup (UnknownService if absent)
//!     → filter instances healthy in the health table
//!     → none healthy? fall back to the full instance list (degraded mode)
//!     → still empty? Unavailable
//!     → round_robin.rs picks candidates[cursor % len], cursor += 1
//! ```
//!
//! # Design Decisions
//! - One cursor per service, never shared across services
//! - Cursors are atomics; a pick never takes a lock
//! - Health is read as a snapshot, never held across the proxy call
//! - Degraded fallback prefers a possibly-dead instance over a clean 503

pub mod round_robin;

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::GatewayError;
use crate::health::HealthTable;
use crate::registry::{InstanceAddress, ServiceRegistry};
use round_robin::RoundRobin;

/// Picks one instance out of a candidate list.
pub trait Strategy: Send + Sync + std::fmt::Debug {
    fn pick(&self, candidates: &[InstanceAddress]) -> Option<InstanceAddress>;
}

/// Selects backend instances per logical service.
#[derive(Debug)]
pub struct LoadBalancer {
    registry: Arc<ServiceRegistry>,
    health: Arc<HealthTable>,
    strategies: HashMap<String, Box<dyn Strategy>>,
}

impl LoadBalancer {
    /// Create a balancer with a fresh round-robin cursor for every registered service.
    pub fn new(registry: Arc<ServiceRegistry>, health: Arc<HealthTable>) -> Self {
        let strategies = registry
            .list_all()
            .iter()
            .map(|s| (s.name.clone(), Box::new(RoundRobin::new()) as Box<dyn Strategy>))
            .collect();

        Self {
            registry,
            health,
            strategies,
        }
    }

    /// Select the instance that should serve the next request for `service`.
    pub fn select_instance(&self, service: &str) -> Result<InstanceAddress, GatewayError> {
        let descriptor = self.registry.get(service)?;

        let healthy = self.health.healthy_instances(descriptor);
        let candidates: &[InstanceAddress] = if healthy.is_empty() {
            if !descriptor.instances.is_empty() {
                tracing::debug!(
                    service = %service,
                    instances = descriptor.instances.len(),
                    "No healthy instances, falling back to full instance list"
                );
            }
            &descriptor.instances
        } else {
            &healthy
        };

        let strategy = self
            .strategies
            .get(service)
            .ok_or_else(|| GatewayError::UnknownService(service.to_string()))?;

        strategy
            .pick(candidates)
            .ok_or_else(|| GatewayError::Unavailable(service.to_string()))
    }

    pub fn registry(&self) -> &ServiceRegistry {
        &self.registry
    }

    pub fn health(&self) -> &HealthTable {
        &self.health
    }
}
