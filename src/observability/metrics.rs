//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): proxied requests by service, method, status
//! - `gateway_request_duration_seconds` (histogram): proxy latency by service
//! - `gateway_instance_health` (gauge): 1=healthy, 0=unhealthy, per probe
//!
//! These go through the `metrics` facade and are scraped from the Prometheus
//! exporter when enabled. `GET /metrics` on the gateway itself is rendered
//! from live state by [`render_gauges`].

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use std::fmt::Write;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

use crate::health::HealthTable;
use crate::registry::{InstanceAddress, ServiceRegistry};

/// Install the global recorder and serve it on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Prometheus exporter listening");
    Ok(())
}

pub fn record_request(method: &str, status: u16, service: &str, start: Instant) {
    metrics::counter!(
        "gateway_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string(),
        "service" => service.to_string()
    )
    .increment(1);
    metrics::histogram!("gateway_request_duration_seconds", "service" => service.to_string())
        .record(start.elapsed().as_secs_f64());
}

pub fn record_instance_health(service: &str, instance: &InstanceAddress, healthy: bool) {
    metrics::gauge!(
        "gateway_instance_health",
        "service" => service.to_string(),
        "instance" => instance.to_string()
    )
    .set(if healthy { 1.0 } else { 0.0 });
}

fn escape_label(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}

/// Plain-text gauge dump: one health line per instance, then process uptime.
pub fn render_gauges(registry: &ServiceRegistry, health: &HealthTable, uptime: Duration) -> String {
    let mut out = String::new();
    for service in registry.list_all() {
        for instance in &service.instances {
            let _ = writeln!(
                out,
                "gateway_service_health{{service=\"{}\",instance=\"{}\"}} {}",
                escape_label(&service.name),
                escape_label(&instance.to_string()),
                u8::from(health.is_healthy(instance)),
            );
        }
    }
    let _ = writeln!(out, "gateway_uptime_seconds {}", uptime.as_secs());
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ServiceDescriptor;

    #[test]
    fn test_render_gauges() {
        let a1 = InstanceAddress::parse("http://127.0.0.1:8001").unwrap();
        let d1 = InstanceAddress::parse("http://127.0.0.1:8002").unwrap();
        let mut registry = ServiceRegistry::new();
        registry
            .register(ServiceDescriptor::new("auth", vec![a1.clone()]))
            .unwrap();
        registry
            .register(ServiceDescriptor::new("documents", vec![d1.clone()]))
            .unwrap();
        registry.register(ServiceDescriptor::new("search", Vec::new())).unwrap();

        let health = HealthTable::new();
        health.record(&a1, true);
        health.record(&d1, false);

        let text = render_gauges(&registry, &health, Duration::from_secs(42));
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                "gateway_service_health{service=\"auth\",instance=\"http://127.0.0.1:8001\"} 1",
                "gateway_service_health{service=\"documents\",instance=\"http://127.0.0.1:8002\"} 0",
                "gateway_uptime_seconds 42",
            ]
        );
    }

    #[test]
    fn test_escape_label() {
        assert_eq!(escape_label("a\"b\\c"), "a\\\"b\\\\c");
    }
}
