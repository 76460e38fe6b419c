//! Logical service descriptors.

use crate::config::ServiceConfig;
use crate::registry::instance::{InstanceAddress, InstanceError};

/// One logical service and its static instance pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceDescriptor {
    /// Unique service name.
    pub name: String,
    /// Instances in configuration order.
    pub instances: Vec<InstanceAddress>,
    /// Relative path queried for liveness.
    pub health_path: String,
    /// Informational only.
    pub priority: i32,
    /// Backend path for relayed WebSocket connections.
    pub ws_path: String,
}

impl ServiceDescriptor {
    /// Build a descriptor with default health and WebSocket paths.
    pub fn new(name: impl Into<String>, instances: Vec<InstanceAddress>) -> Self {
        Self {
            name: name.into(),
            instances,
            health_path: "/health".to_string(),
            priority: 0,
            ws_path: "/ws".to_string(),
        }
    }

    /// Build a descriptor from its configuration entry.
    pub fn from_config(config: &ServiceConfig) -> Result<Self, (String, InstanceError)> {
        let instances = config
            .instances
            .iter()
            .map(|raw| InstanceAddress::parse(raw).map_err(|e| (raw.clone(), e)))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            name: config.name.clone(),
            instances,
            health_path: config.health_path.clone(),
            priority: config.priority,
            ws_path: config.ws_path.clone(),
        })
    }
}
