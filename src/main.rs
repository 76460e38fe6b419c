//! Service gateway (v1)
//!
//! A single entry point for many backend services, built with Tokio and Axum.
//!
//! # Architecture Overview
//!
//! ```text
//!                    ┌──────────────────────────────────────────────────────┐
//!                    │                     GATEWAY                          │
//!                    │                                                      │
//!   Client Request   │  ┌──────────┐   ┌─────────────┐   ┌──────────────┐   │
//!   ─────────────────┼─▶│  front   │──▶│ path router │──▶│load balancer │   │
//!                    │  │  door    │   │ (1st seg.)  │   │ (round robin)│   │
//!                    │  └──────────┘   └─────────────┘   └──────┬───────┘   │
//!                    │       │                                  │           │
//!                    │       │ /, /health, /services,           ▼           │
//!                    │       │ /metrics, /ws/{svc}       ┌──────────────┐   │
//!   Client Response  │       │                           │ request      │   │
//!   ◀────────────────┼───────┴───────────────────────────│ proxy / ws   │◀──┼── Backend
//!                    │                                   └──────────────┘   │   Instance
//!                    │  ┌────────────────────────────────────────────────┐  │
//!                    │  │ registry (static) ◀── health prober (30s) ──▶  │  │
//!                    │  │                       health table             │  │
//!                    │  └────────────────────────────────────────────────┘  │
//!                    └──────────────────────────────────────────────────────┘
//! ```

use clap::Parser;
use std::path::PathBuf;
use tokio::net::TcpListener;

use service_gateway::config::{load_config, GatewayConfig};
use service_gateway::lifecycle::{shutdown_signal, Shutdown};
use service_gateway::observability::{logging, metrics};
use service_gateway::GatewayServer;

#[derive(Parser)]
#[command(name = "service-gateway")]
#[command(about = "Single entry point routing requests to backend service instances", long_about = None)]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(short, long, env = "GATEWAY_CONFIG")]
    config: Option<PathBuf>,

    /// Override the listener bind address.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => GatewayConfig::default(),
    };
    if let Some(bind) = args.bind {
        config.listener.bind_address = bind;
    }

    logging::init(&config.observability);
    tracing::info!("service-gateway v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        bind_address = %config.listener.bind_address,
        services = config.services.len(),
        aliases = config.routing.aliases.len(),
        request_timeout_secs = config.timeouts.request_secs,
        probe_interval_secs = config.health_check.interval_secs,
        "Configuration loaded"
    );
    if args.config.is_none() {
        tracing::warn!("No configuration file given, starting with an empty registry");
    }

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => {
                if let Err(e) = metrics::init_metrics(addr) {
                    tracing::error!(error = %e, "Failed to start Prometheus exporter");
                }
            }
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server = GatewayServer::new(config)?;
    let server_shutdown = shutdown.subscribe();

    let signal_shutdown = shutdown.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        signal_shutdown.trigger();
    });

    server.run(listener, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
