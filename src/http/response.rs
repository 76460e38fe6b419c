//! Response shaping for gateway-generated errors.
//!
//! # Responsibilities
//! - Give every error the gateway itself produces a `{"detail": ...}` body
//! - Leave proxied backend responses untouched, whatever their status
//!
//! Framework and middleware rejections (body limit, missing upgrade headers,
//! wrong verb on a gateway route) arrive here as plain text or empty bodies.

use axum::{
    body::{to_bytes, Body, Bytes, HttpBody},
    http::{header, HeaderMap, Method, StatusCode},
    response::{IntoResponse, Response},
    BoxError, Json,
};

use crate::error::{ErrorBody, GatewayError};

/// Rejection bodies are short; anything longer is cut off.
const MAX_DETAIL_BYTES: usize = 4096;

/// Marks a response relayed from a backend instance.
#[derive(Debug, Clone, Copy)]
pub struct ProxiedResponse;

/// `method_not_allowed_fallback` for the gateway's own routes.
pub async fn method_not_allowed(method: Method) -> GatewayError {
    GatewayError::MethodNotAllowed(method)
}

/// Rewrap non-JSON 4xx/5xx bodies produced by the gateway as `ErrorBody`.
pub async fn json_error_body<B>(response: Response<B>) -> Response
where
    B: HttpBody<Data = Bytes> + Send + 'static,
    B::Error: Into<BoxError>,
{
    let response = response.map(Body::new);
    let status = response.status();
    if !(status.is_client_error() || status.is_server_error())
        || response.extensions().get::<ProxiedResponse>().is_some()
        || is_json(response.headers())
    {
        return response;
    }

    let (parts, body) = response.into_parts();
    let detail = match to_bytes(body, MAX_DETAIL_BYTES).await {
        Ok(bytes) if !bytes.is_empty() => String::from_utf8_lossy(&bytes).trim().to_string(),
        _ => default_detail(status),
    };

    let mut rewrapped = (status, Json(ErrorBody { detail })).into_response();
    for (name, value) in &parts.headers {
        if name != header::CONTENT_TYPE && name != header::CONTENT_LENGTH {
            rewrapped.headers_mut().append(name.clone(), value.clone());
        }
    }
    rewrapped
}

fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.starts_with("application/json"))
        .unwrap_or(false)
}

fn default_detail(status: StatusCode) -> String {
    status
        .canonical_reason()
        .unwrap_or("Request failed")
        .to_string()
}
