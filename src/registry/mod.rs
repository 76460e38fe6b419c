//! Service registry.
//!
//! # Responsibilities
//! - Hold the static mapping from logical service name to instance pool
//! - Answer lookups by name and list every service in registration order
//! - Provide the flattened instance list the health prober walks
//!
//! # Design Decisions
//! - Built once at boot from configuration, immutable afterwards
//! - Shared via `Arc`, never as a global; tests build their own
//! - Lookups of unknown names fail with `GatewayError::UnknownService`

pub mod descriptor;
pub mod instance;

use std::collections::HashMap;
use thiserror::Error;

use crate::config::ServiceConfig;
use crate::error::GatewayError;

pub use descriptor::ServiceDescriptor;
pub use instance::{InstanceAddress, InstanceError};

/// Errors raised while building the registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("service {0} is already registered")]
    Duplicate(String),

    #[error("service {service}: invalid instance {address:?}: {source}")]
    InvalidInstance {
        service: String,
        address: String,
        #[source]
        source: InstanceError,
    },
}

/// Static registry of logical services.
#[derive(Debug, Default)]
pub struct ServiceRegistry {
    services: Vec<ServiceDescriptor>,
    index: HashMap<String, usize>,
}

impl ServiceRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from configuration, preserving declaration order.
    pub fn from_config(configs: &[ServiceConfig]) -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        for config in configs {
            let descriptor = ServiceDescriptor::from_config(config).map_err(|(address, source)| {
                RegistryError::InvalidInstance {
                    service: config.name.clone(),
                    address,
                    source,
                }
            })?;
            registry.register(descriptor)?;
        }
        Ok(registry)
    }

    /// Register a service. Names must be unique.
    pub fn register(&mut self, descriptor: ServiceDescriptor) -> Result<(), RegistryError> {
        if self.index.contains_key(&descriptor.name) {
            return Err(RegistryError::Duplicate(descriptor.name));
        }
        tracing::debug!(
            service = %descriptor.name,
            instances = descriptor.instances.len(),
            "Service registered"
        );
        self.index.insert(descriptor.name.clone(), self.services.len());
        self.services.push(descriptor);
        Ok(())
    }

    /// Look up a service by name.
    pub fn get(&self, name: &str) -> Result<&ServiceDescriptor, GatewayError> {
        self.index
            .get(name)
            .map(|&i| &self.services[i])
            .ok_or_else(|| GatewayError::UnknownService(name.to_string()))
    }

    /// All services in registration order.
    pub fn list_all(&self) -> &[ServiceDescriptor] {
        &self.services
    }

    /// Service names in registration order.
    pub fn names(&self) -> Vec<String> {
        self.services.iter().map(|s| s.name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}
