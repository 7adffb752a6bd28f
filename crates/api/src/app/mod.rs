//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: store and engine wiring (in-memory or Postgres)
//! - `routes/`: HTTP routes + handlers
//! - `dto.rs`: request/response DTOs and JSON mapping helpers
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{routing::get, Extension, Router};

use paperstock_infra::StoreError;

use crate::config::ApiConfig;
use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

/// Build the full HTTP router from configuration (entrypoint used by `main.rs`).
pub async fn build_app(config: &ApiConfig) -> Result<Router, StoreError> {
    let services = services::build_services(config).await?;
    Ok(router(services))
}

/// Build the router over already-wired services.
pub fn router(services: services::AppServices) -> Router {
    // Actor-scoped routes: require the member header.
    let protected = routes::router()
        .layer(Extension(Arc::new(services)))
        .layer(axum::middleware::from_fn(middleware::actor_middleware));

    Router::new()
        .route("/health", get(routes::system::health))
        .merge(protected)
}
