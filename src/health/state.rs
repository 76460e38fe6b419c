//! Instance health table.
//!
//! # Lifecycle
//! ```text
//! (no record)  --first probe-->  HealthRecord { healthy, last_checked }
//! HealthRecord --every probe-->  HealthRecord (overwritten)
//! ```
//!
//! Records are never deleted while the gateway runs. An instance without a
//! record counts as not healthy; the load balancer's degraded fallback still
//! routes to it when nothing else is available.

use dashmap::DashMap;
use serde::Serialize;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::registry::{InstanceAddress, ServiceDescriptor};

/// Last observed status of one instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthRecord {
    pub healthy: bool,
    pub last_checked: SystemTime,
}

impl HealthRecord {
    /// Seconds since the Unix epoch at which the probe completed.
    pub fn last_checked_unix(&self) -> u64 {
        self.last_checked
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }
}

/// Serializable view of a record for the registry listing.
#[derive(Debug, Clone, Serialize)]
pub struct HealthView {
    pub healthy: bool,
    pub last_checked: Option<u64>,
}

/// Shared per-instance health map.
///
/// Writes replace a whole entry; readers never hold a reference across I/O.
#[derive(Debug, Default)]
pub struct HealthTable {
    records: DashMap<InstanceAddress, HealthRecord>,
}

impl HealthTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the outcome of a probe. Returns the previous status, if any.
    pub fn record(&self, instance: &InstanceAddress, healthy: bool) -> Option<bool> {
        let record = HealthRecord {
            healthy,
            last_checked: SystemTime::now(),
        };
        self.records
            .insert(instance.clone(), record)
            .map(|previous| previous.healthy)
    }

    pub fn get(&self, instance: &InstanceAddress) -> Option<HealthRecord> {
        self.records.get(instance).map(|r| *r)
    }

    /// True only if the latest probe succeeded.
    pub fn is_healthy(&self, instance: &InstanceAddress) -> bool {
        self.records
            .get(instance)
            .map(|r| r.healthy)
            .unwrap_or(false)
    }

    /// Healthy instances of a service, in configuration order.
    pub fn healthy_instances(&self, service: &ServiceDescriptor) -> Vec<InstanceAddress> {
        service
            .instances
            .iter()
            .filter(|i| self.is_healthy(i))
            .cloned()
            .collect()
    }

    /// True if at least one instance of the service is healthy.
    pub fn service_is_healthy(&self, service: &ServiceDescriptor) -> bool {
        service.instances.iter().any(|i| self.is_healthy(i))
    }

    pub fn view(&self, instance: &InstanceAddress) -> HealthView {
        match self.get(instance) {
            Some(record) => HealthView {
                healthy: record.healthy,
                last_checked: Some(record.last_checked_unix()),
            },
            None => HealthView {
                healthy: false,
                last_checked: None,
            },
        }
    }
}
