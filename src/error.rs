//! Gateway error taxonomy.
//!
//! Every failure the front door can produce maps onto one of these variants.
//! Backend transport errors are converted at the proxy boundary, so a client
//! only ever sees a JSON body of the form `{"detail": "..."}` with the
//! matching status code.

use axum::{
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Errors surfaced to gateway clients.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// A route resolved to a name absent from the registry.
    #[error("Service '{0}' is not registered")]
    UnknownService(String),

    /// No alias or service name matched the first path segment.
    #[error("No route found for path '{0}'")]
    NoRouteFound(String),

    /// The service has zero usable instances.
    #[error("Service '{0}' is unavailable: no instances configured")]
    Unavailable(String),

    /// The backend did not answer before the request deadline.
    #[error("Service '{service}' timed out after {timeout_secs}s (instance {instance})")]
    GatewayTimeout {
        service: String,
        instance: String,
        timeout_secs: u64,
    },

    /// Any other transport-level failure talking to the backend.
    #[error("Service '{service}' request failed (instance {instance}): {reason}")]
    BadGateway {
        service: String,
        instance: String,
        reason: String,
    },

    /// Unsupported HTTP verb.
    #[error("Method {0} is not allowed")]
    MethodNotAllowed(Method),
}

impl GatewayError {
    /// HTTP status code reported for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::UnknownService(_) => StatusCode::INTERNAL_SERVER_ERROR,
            GatewayError::NoRouteFound(_) => StatusCode::NOT_FOUND,
            GatewayError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            GatewayError::GatewayTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            GatewayError::BadGateway { .. } => StatusCode::BAD_GATEWAY,
            GatewayError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
        }
    }
}

/// JSON error body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub detail: String,
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorBody {
            detail: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
