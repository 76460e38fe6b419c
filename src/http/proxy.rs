//! Request proxy.
//!
//! # Responsibilities
//! - Ask the load balancer for an instance of the resolved service
//! - Rewrite the path and headers for the backend
//! - Stream the request body out and the response back unchanged
//! - Convert every transport failure into a `GatewayError`
//!
//! # Design Decisions
//! - The backend call is bounded by the request timeout (504 on expiry)
//! - The relayed body is cut off when the backend stalls longer than that timeout
//! - No automatic retry against another instance within one request
//! - Dropping the handler future (client disconnect) drops the backend call

use axum::{
    body::Body,
    http::{Method, Request, Uri},
    response::Response,
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use std::net::SocketAddr;
use std::time::Duration;
use tower_http::timeout::TimeoutBody;

use crate::error::GatewayError;
use crate::http::headers::forward_headers;
use crate::http::response::ProxiedResponse;
use crate::load_balancer::LoadBalancer;
use crate::registry::InstanceAddress;
use crate::routing::matcher::rewrite_path;

/// Methods the gateway proxies.
pub const ALLOWED_METHODS: [Method; 5] = [
    Method::GET,
    Method::POST,
    Method::PUT,
    Method::DELETE,
    Method::PATCH,
];

/// Per-request routing decision, owned by the handling task.
#[derive(Debug, Clone)]
pub struct ProxyContext {
    pub service: String,
    pub instance: InstanceAddress,
    /// Rewritten path plus the original query string.
    pub backend_path: String,
    pub method: Method,
}

impl ProxyContext {
    pub fn backend_uri(&self) -> String {
        self.instance.url_for(&self.backend_path)
    }
}

/// Forwards HTTP requests to backend instances.
#[derive(Clone)]
pub struct RequestProxy {
    client: Client<HttpConnector, Body>,
    timeout: Duration,
}

impl RequestProxy {
    pub fn new(timeout: Duration) -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        Self { client, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Resolve an instance and build the routing context for a request.
    pub fn prepare(
        &self,
        balancer: &LoadBalancer,
        service: &str,
        method: &Method,
        uri: &Uri,
    ) -> Result<ProxyContext, GatewayError> {
        if !ALLOWED_METHODS.contains(method) {
            return Err(GatewayError::MethodNotAllowed(method.clone()));
        }

        let instance = balancer.select_instance(service)?;

        let mut backend_path = rewrite_path(uri.path(), service);
        if let Some(query) = uri.query() {
            backend_path.push('?');
            backend_path.push_str(query);
        }

        Ok(ProxyContext {
            service: service.to_string(),
            instance,
            backend_path,
            method: method.clone(),
        })
    }

    /// Forward `request` to one instance of `service` and relay the response.
    pub async fn forward(
        &self,
        balancer: &LoadBalancer,
        service: &str,
        request: Request<Body>,
        client_addr: Option<SocketAddr>,
    ) -> Result<(ProxyContext, Response), GatewayError> {
        let ctx = self.prepare(balancer, service, request.method(), request.uri())?;

        let (parts, body) = request.into_parts();
        let mut outbound = Request::builder()
            .method(ctx.method.clone())
            .uri(ctx.backend_uri())
            .body(body)
            .map_err(|e| self.bad_gateway(&ctx, e.to_string()))?;
        *outbound.headers_mut() = forward_headers(&parts.headers, client_addr);

        tracing::debug!(
            service = %ctx.service,
            instance = %ctx.instance,
            backend_path = %ctx.backend_path,
            "Forwarding request"
        );

        match tokio::time::timeout(self.timeout, self.client.request(outbound)).await {
            Ok(Ok(response)) => {
                let (parts, body) = response.into_parts();
                // Each body frame must arrive within the request timeout.
                let body = Body::new(TimeoutBody::new(self.timeout, body));
                let mut response = Response::from_parts(parts, body);
                response.extensions_mut().insert(ProxiedResponse);
                Ok((ctx, response))
            }
            Ok(Err(e)) => {
                let reason = match std::error::Error::source(&e) {
                    Some(source) => format!("{}: {}", e, source),
                    None => e.to_string(),
                };
                Err(self.bad_gateway(&ctx, reason))
            }
            Err(_) => Err(GatewayError::GatewayTimeout {
                service: ctx.service.clone(),
                instance: ctx.instance.to_string(),
                timeout_secs: self.timeout.as_secs(),
            }),
        }
    }

    fn bad_gateway(&self, ctx: &ProxyContext, reason: String) -> GatewayError {
        GatewayError::BadGateway {
            service: ctx.service.clone(),
            instance: ctx.instance.to_string(),
            reason,
        }
    }
}
