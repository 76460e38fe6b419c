//! Active health probing.
//!
//! # Responsibilities
//! - Periodically probe every instance of every registered service
//! - Record `healthy = (status == 200)` in the shared health table
//! - Log failures and transitions; never propagate them

use axum::body::Body;
use axum::http::{Request, StatusCode};
use futures_util::future::join_all;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time;

use crate::config::HealthCheckConfig;
use crate::health::state::HealthTable;
use crate::observability::metrics;
use crate::registry::{InstanceAddress, ServiceDescriptor, ServiceRegistry};

pub struct HealthProber {
    registry: Arc<ServiceRegistry>,
    health: Arc<HealthTable>,
    config: HealthCheckConfig,
    client: Client<HttpConnector, Body>,
}

impl HealthProber {
    pub fn new(
        registry: Arc<ServiceRegistry>,
        health: Arc<HealthTable>,
        config: HealthCheckConfig,
    ) -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());

        Self {
            registry,
            health,
            config,
            client,
        }
    }

    /// Probe on a fixed interval until shutdown. The first cycle runs immediately.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        if !self.config.enabled {
            tracing::info!("Active health checks disabled");
            return;
        }

        tracing::info!(
            interval = self.config.interval_secs,
            timeout = self.config.timeout_secs,
            services = self.registry.len(),
            "Health prober starting"
        );

        let mut ticker = time::interval(Duration::from_secs(self.config.interval_secs));
        ticker.set_missed_tick_behavior(time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.probe_all().await;
                }
                _ = shutdown.recv() => {
                    tracing::info!("Health prober received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    /// Run one probe cycle. Instances are probed concurrently so a slow one
    /// only costs its own timeout.
    pub async fn probe_all(&self) {
        let mut probes = Vec::new();
        for service in self.registry.list_all() {
            for instance in &service.instances {
                probes.push(self.probe_and_record(service, instance));
            }
        }
        join_all(probes).await;
    }

    async fn probe_and_record(&self, service: &ServiceDescriptor, instance: &InstanceAddress) {
        let healthy = self.probe(instance, &service.health_path).await;
        let previous = self.health.record(instance, healthy);
        metrics::record_instance_health(&service.name, instance, healthy);

        if previous != Some(healthy) {
            tracing::info!(
                service = %service.name,
                instance = %instance,
                healthy,
                "Instance health changed"
            );
        }
    }

    /// Probe a single instance. Any failure yields `false`.
    pub async fn probe(&self, instance: &InstanceAddress, health_path: &str) -> bool {
        let request = match Request::builder()
            .method("GET")
            .uri(instance.url_for(health_path))
            .header("user-agent", "service-gateway-health-check")
            .body(Body::empty())
        {
            Ok(req) => req,
            Err(e) => {
                tracing::error!(instance = %instance, error = %e, "Failed to build health check request");
                return false;
            }
        };

        let timeout = Duration::from_secs(self.config.timeout_secs);
        match time::timeout(timeout, self.client.request(request)).await {
            Ok(Ok(response)) => {
                let healthy = response.status() == StatusCode::OK;
                if !healthy {
                    tracing::warn!(instance = %instance, status = %response.status(), "Health check failed: non-200 status");
                }
                healthy
            }
            Ok(Err(e)) => {
                tracing::warn!(instance = %instance, error = %e, "Health check failed: connection error");
                false
            }
            Err(_) => {
                tracing::warn!(instance = %instance, "Health check failed: timeout");
                false
            }
        }
    }
}
