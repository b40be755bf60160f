//! Contains all HTTP endpoint handlers.
//!
//! Use [`routes`] to create a router with all endpoints.

use axum::Router;

use crate::state::ServiceState;

pub mod common;
mod fragments;
pub mod health;

/// Creates a router with the health endpoint and all `v1` API routes.
pub fn routes() -> Router<ServiceState> {
    let routes_v1 = Router::new().merge(fragments::router());

    Router::new()
        .merge(health::router())
        .nest("/v1", routes_v1)
}
