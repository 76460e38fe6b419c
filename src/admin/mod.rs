//! Gateway-owned endpoints.
//!
//! These paths (`/`, `/health`, `/services`, `/metrics`) are answered by the
//! gateway itself and never proxied.

pub mod handlers;

use axum::{routing::get, Router};

use crate::http::server::AppState;
use self::handlers::*;

pub fn setup_admin_router() -> Router<AppState> {
    Router::new()
        .route("/", get(get_root))
        .route("/health", get(get_health))
        .route("/services", get(get_services))
        .route("/metrics", get(get_metrics))
}
