//! Self-describing gateway endpoints: root, health, registry listing, metrics.

use axum::{extract::State, http::header, response::IntoResponse, Json};
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;

use crate::health::state::HealthView;
use crate::health::HealthTable;
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::registry::ServiceRegistry;

const HEALTHY: &str = "healthy";
const UNHEALTHY: &str = "unhealthy";
const DEGRADED: &str = "degraded";

#[derive(Debug, Serialize)]
pub struct RootDescriptor {
    pub service: String,
    pub version: &'static str,
    pub services: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct HealthSummary {
    pub status: &'static str,
    pub services: BTreeMap<String, &'static str>,
    pub healthy_services: usize,
    pub total_services: usize,
    pub uptime_seconds: u64,
}

impl HealthSummary {
    /// Status is "degraded" when the healthy-service ratio is below `threshold`.
    /// An empty registry counts as healthy.
    pub fn compute(
        registry: &ServiceRegistry,
        health: &HealthTable,
        threshold: f64,
        uptime: Duration,
    ) -> Self {
        let services: BTreeMap<_, _> = registry
            .list_all()
            .iter()
            .map(|s| {
                let status = if health.service_is_healthy(s) { HEALTHY } else { UNHEALTHY };
                (s.name.clone(), status)
            })
            .collect();

        let total_services = services.len();
        let healthy_services = services.values().filter(|&&s| s == HEALTHY).count();
        let ratio = if total_services == 0 {
            1.0
        } else {
            healthy_services as f64 / total_services as f64
        };

        Self {
            status: if ratio < threshold { DEGRADED } else { HEALTHY },
            services,
            healthy_services,
            total_services,
            uptime_seconds: uptime.as_secs(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct InstanceStatus {
    pub address: String,
    #[serde(flatten)]
    pub health: HealthView,
}

#[derive(Debug, Serialize)]
pub struct ServiceStatus {
    pub instances: Vec<InstanceStatus>,
    pub healthy_instances: usize,
    pub priority: i32,
    pub health_endpoint: String,
    pub status: &'static str,
    pub aliases: Vec<String>,
}

/// `GET /`
pub async fn get_root(State(state): State<AppState>) -> Json<RootDescriptor> {
    Json(RootDescriptor {
        service: state.gateway_name.to_string(),
        version: env!("CARGO_PKG_VERSION"),
        services: state.balancer.registry().names(),
    })
}

/// `GET /health`
pub async fn get_health(State(state): State<AppState>) -> Json<HealthSummary> {
    Json(HealthSummary::compute(
        state.balancer.registry(),
        state.balancer.health(),
        state.degraded_threshold,
        state.started_at.elapsed(),
    ))
}

/// `GET /services`
pub async fn get_services(State(state): State<AppState>) -> Json<BTreeMap<String, ServiceStatus>> {
    let health = state.balancer.health();
    let statuses = state
        .balancer
        .registry()
        .list_all()
        .iter()
        .map(|service| {
            let instances: Vec<_> = service
                .instances
                .iter()
                .map(|i| InstanceStatus {
                    address: i.to_string(),
                    health: health.view(i),
                })
                .collect();
            let healthy_instances = instances.iter().filter(|i| i.health.healthy).count();

            let status = ServiceStatus {
                instances,
                healthy_instances,
                priority: service.priority,
                health_endpoint: service.health_path.clone(),
                status: if healthy_instances > 0 { HEALTHY } else { UNHEALTHY },
                aliases: state.router.aliases_for(&service.name),
            };
            (service.name.clone(), status)
        })
        .collect();

    Json(statuses)
}

/// `GET /metrics`
pub async fn get_metrics(State(state): State<AppState>) -> impl IntoResponse {
    let body = metrics::render_gauges(
        state.balancer.registry(),
        state.balancer.health(),
        state.started_at.elapsed(),
    );
    ([(header::CONTENT_TYPE, "text/plain; version=0.0.4")], body)
}
