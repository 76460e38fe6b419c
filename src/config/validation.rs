//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check referential integrity (aliases reference existing services)
//! - Validate value ranges (timeouts > 0, threshold within 0..=1)
//! - Reject names that collide with gateway-reserved path segments
//!
//! Returns all validation errors, not just the first.

use std::collections::HashSet;
use thiserror::Error;

use crate::config::schema::GatewayConfig;
use crate::registry::InstanceAddress;
use crate::routing::matcher::is_reserved_segment;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("service name must be non-empty and must not contain '/': {0:?}")]
    InvalidServiceName(String),

    #[error("duplicate service name: {0}")]
    DuplicateService(String),

    #[error("'{0}' is a reserved gateway path segment")]
    ReservedName(String),

    #[error("service {service}: invalid instance {address:?}: {reason}")]
    InvalidInstance {
        service: String,
        address: String,
        reason: String,
    },

    #[error("service {service}: {field} must start with '/', got {value:?}")]
    InvalidPath {
        service: String,
        field: &'static str,
        value: String,
    },

    #[error("alias {alias} points at unknown service {service}")]
    UnknownAliasTarget { alias: String, service: String },

    #[error("{0} must be greater than zero")]
    ZeroDuration(&'static str),

    #[error("health_check.degraded_threshold must be within 0.0..=1.0, got {0}")]
    InvalidThreshold(f64),
}

/// Validate a parsed configuration.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let mut names = HashSet::new();

    for service in &config.services {
        if service.name.is_empty() || service.name.contains('/') {
            errors.push(ValidationError::InvalidServiceName(service.name.clone()));
        } else if is_reserved_segment(&service.name) {
            errors.push(ValidationError::ReservedName(service.name.clone()));
        }
        if !names.insert(service.name.as_str()) {
            errors.push(ValidationError::DuplicateService(service.name.clone()));
        }

        for address in &service.instances {
            if let Err(e) = InstanceAddress::parse(address) {
                errors.push(ValidationError::InvalidInstance {
                    service: service.name.clone(),
                    address: address.clone(),
                    reason: e.to_string(),
                });
            }
        }

        for (field, value) in [("health_path", &service.health_path), ("ws_path", &service.ws_path)] {
            if !value.starts_with('/') {
                errors.push(ValidationError::InvalidPath {
                    service: service.name.clone(),
                    field,
                    value: value.clone(),
                });
            }
        }
    }

    for (alias, target) in &config.routing.aliases {
        if is_reserved_segment(alias) {
            errors.push(ValidationError::ReservedName(alias.clone()));
        }
        if !names.contains(target.as_str()) {
            errors.push(ValidationError::UnknownAliasTarget {
                alias: alias.clone(),
                service: target.clone(),
            });
        }
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroDuration("timeouts.request_secs"));
    }
    if config.health_check.interval_secs == 0 {
        errors.push(ValidationError::ZeroDuration("health_check.interval_secs"));
    }
    if config.health_check.timeout_secs == 0 {
        errors.push(ValidationError::ZeroDuration("health_check.timeout_secs"));
    }
    let threshold = config.health_check.degraded_threshold;
    if !(0.0..=1.0).contains(&threshold) {
        errors.push(ValidationError::InvalidThreshold(threshold));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
