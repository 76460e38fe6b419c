//! Header rewriting for proxied requests.
//!
//! # Responsibilities
//! - Drop the `host` header so the backend sees its own authority
//! - Strip hop-by-hop headers, including any named in `connection`
//! - Append X-Forwarded-For, X-Forwarded-Host, X-Forwarded-Proto
//!
//! Authorization and every other end-to-end header pass through unmodified.

use axum::http::{
    header::{self, HeaderName},
    HeaderMap, HeaderValue,
};
use std::net::SocketAddr;

const X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");
const X_FORWARDED_HOST: HeaderName = HeaderName::from_static("x-forwarded-host");
const X_FORWARDED_PROTO: HeaderName = HeaderName::from_static("x-forwarded-proto");

const HOP_BY_HOP: [HeaderName; 7] = [
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
    HeaderName::from_static("proxy-connection"),
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

/// Headers to send to the backend for a client request.
pub fn forward_headers(original: &HeaderMap, client_addr: Option<SocketAddr>) -> HeaderMap {
    let mut headers = original.clone();

    let listed: Vec<HeaderName> = original
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();
    for name in HOP_BY_HOP.iter().chain(listed.iter()) {
        headers.remove(name);
    }

    if let Some(host) = headers.remove(header::HOST) {
        if !headers.contains_key(&X_FORWARDED_HOST) {
            headers.insert(X_FORWARDED_HOST, host);
        }
    }

    if let Some(addr) = client_addr {
        let ip = addr.ip().to_string();
        let chained = match headers.get(&X_FORWARDED_FOR).and_then(|v| v.to_str().ok()) {
            Some(existing) => format!("{}, {}", existing, ip),
            None => ip,
        };
        if let Ok(value) = HeaderValue::from_str(&chained) {
            headers.insert(X_FORWARDED_FOR, value);
        }
    }

    if !headers.contains_key(&X_FORWARDED_PROTO) {
        headers.insert(X_FORWARDED_PROTO, HeaderValue::from_static("http"));
    }

    headers
}
