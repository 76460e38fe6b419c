//! Path router.
//!
//! # Responsibilities
//! - Map a request path to a logical service name
//! - Accept either a configured alias or the service name itself as first segment
//! - Return an explicit `NoRouteFound` rather than a silent default
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - O(1) lookup via HashMap
//! - Aliases win over direct service names

use std::collections::{HashMap, HashSet};

use crate::config::RoutingConfig;
use crate::error::GatewayError;
use crate::registry::ServiceRegistry;
use crate::routing::matcher::first_segment;

/// Static first-segment routing table.
#[derive(Debug, Default, Clone)]
pub struct PathRouter {
    aliases: HashMap<String, String>,
    services: HashSet<String>,
}

impl PathRouter {
    pub fn new(
        aliases: impl IntoIterator<Item = (String, String)>,
        services: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            aliases: aliases.into_iter().collect(),
            services: services.into_iter().collect(),
        }
    }

    /// Build from the routing config and the registry's service names.
    pub fn from_config(config: &RoutingConfig, registry: &ServiceRegistry) -> Self {
        Self::new(
            config.aliases.iter().map(|(k, v)| (k.clone(), v.clone())),
            registry.names(),
        )
    }

    /// Resolve the logical service for a request path.
    pub fn resolve_service(&self, path: &str) -> Result<String, GatewayError> {
        let segment = first_segment(path);

        if let Some(service) = self.aliases.get(segment) {
            return Ok(service.clone());
        }
        if self.services.contains(segment) {
            return Ok(segment.to_string());
        }
        Err(GatewayError::NoRouteFound(path.to_string()))
    }

    /// Aliases pointing at `service`, sorted.
    pub fn aliases_for(&self, service: &str) -> Vec<String> {
        let mut aliases: Vec<_> = self
            .aliases
            .iter()
            .filter(|(_, target)| target.as_str() == service)
            .map(|(alias, _)| alias.clone())
            .collect();
        aliases.sort();
        aliases
    }
}
