//! Gateway front door.
//!
//! # Responsibilities
//! - Build registry, health table, load balancer and router from configuration
//! - Assemble the Axum router (gateway endpoints, WebSocket relay, proxy fallback)
//! - Wire up middleware (tracing, request ID, body limit)
//! - Run the health prober next to the server until shutdown

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::Request,
    middleware::map_response,
    response::{IntoResponse, Response},
    routing::{any, get},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::admin::setup_admin_router;
use crate::config::GatewayConfig;
use crate::error::GatewayError;
use crate::health::{HealthProber, HealthTable};
use crate::http::proxy::RequestProxy;
use crate::http::request::{request_id, UuidRequestId};
use crate::http::response::{json_error_body, method_not_allowed};
use crate::http::websocket::ws_handler;
use crate::load_balancer::LoadBalancer;
use crate::observability::metrics;
use crate::registry::{RegistryError, ServiceRegistry};
use crate::routing::matcher::is_reserved_path;
use crate::routing::PathRouter;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub gateway_name: Arc<str>,
    pub router: Arc<PathRouter>,
    pub balancer: Arc<LoadBalancer>,
    pub proxy: RequestProxy,
    pub degraded_threshold: f64,
    pub started_at: Instant,
}

/// HTTP server for the gateway.
pub struct GatewayServer {
    router: Router,
    config: GatewayConfig,
    registry: Arc<ServiceRegistry>,
    health: Arc<HealthTable>,
}

impl GatewayServer {
    /// Create a gateway from validated configuration.
    pub fn new(config: GatewayConfig) -> Result<Self, RegistryError> {
        let registry = Arc::new(ServiceRegistry::from_config(&config.services)?);
        let health = Arc::new(HealthTable::new());
        let path_router = Arc::new(PathRouter::from_config(&config.routing, &registry));
        let balancer = Arc::new(LoadBalancer::new(registry.clone(), health.clone()));

        let state = AppState {
            gateway_name: Arc::from(config.gateway.name.as_str()),
            router: path_router,
            balancer,
            proxy: RequestProxy::new(Duration::from_secs(config.timeouts.request_secs)),
            degraded_threshold: config.health_check.degraded_threshold,
            started_at: Instant::now(),
        };

        let router = Self::build_router(&config, state);
        Ok(Self {
            router,
            config,
            registry,
            health,
        })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &GatewayConfig, state: AppState) -> Router {
        setup_admin_router()
            .route("/ws/{service_name}", get(ws_handler))
            .route("/{*path}", any(proxy_handler))
            .method_not_allowed_fallback(method_not_allowed)
            .with_state(state)
            .layer(RequestBodyLimitLayer::new(config.limits.max_body_bytes))
            .layer(map_response(json_error_body))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(UuidRequestId))
    }

    /// Shared health table; the prober writes it, routing reads it.
    pub fn health(&self) -> Arc<HealthTable> {
        self.health.clone()
    }

    pub fn registry(&self) -> Arc<ServiceRegistry> {
        self.registry.clone()
    }

    /// The assembled router, without connect info or background tasks.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve on `listener` until `shutdown` fires. Starts the health prober.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            services = self.registry.len(),
            "Gateway server starting"
        );

        let prober = HealthProber::new(
            self.registry.clone(),
            self.health.clone(),
            self.config.health_check.clone(),
        );
        let prober_shutdown = shutdown.resubscribe();
        tokio::spawn(async move {
            prober.run(prober_shutdown).await;
        });

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("Gateway server stopped");
        Ok(())
    }
}

/// Catch-all proxy handler: path router → load balancer → request proxy.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start_time = Instant::now();
    let request_id = request_id(request.headers()).to_string();
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let client_addr = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);

    let service = if is_reserved_path(&path) {
        Err(GatewayError::NoRouteFound(path.clone()))
    } else {
        state.router.resolve_service(&path)
    };
    let service = match service {
        Ok(service) => service,
        Err(e) => {
            tracing::warn!(request_id = %request_id, path = %path, "No route matched");
            metrics::record_request(&method, e.status_code().as_u16(), "none", start_time);
            return e.into_response();
        }
    };

    match state
        .proxy
        .forward(&state.balancer, &service, request, client_addr)
        .await
    {
        Ok((ctx, response)) => {
            tracing::debug!(
                request_id = %request_id,
                service = %ctx.service,
                instance = %ctx.instance,
                status = %response.status(),
                "Proxied request"
            );
            metrics::record_request(&method, response.status().as_u16(), &service, start_time);
            response
        }
        Err(e) => {
            tracing::warn!(
                request_id = %request_id,
                service = %service,
                path = %path,
                error = %e,
                "Proxy request failed"
            );
            metrics::record_request(&method, e.status_code().as_u16(), &service, start_time);
            e.into_response()
        }
    }
}
