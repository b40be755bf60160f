//! Liveness endpoint.

use axum::response::IntoResponse;
use axum::{Router, routing};

use crate::endpoints::common::success;
use crate::state::ServiceState;

/// Creates the router for the liveness endpoint.
pub fn router() -> Router<ServiceState> {
    Router::new().route("/health", routing::get(health))
}

async fn health() -> impl IntoResponse {
    success(serde_json::json!({
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
