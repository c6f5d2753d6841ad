//! Job trigger server.
//!
//! The external scheduler runs each reconciliation job by POSTing to its
//! endpoint. A failed run answers 500 so the scheduler can alert and retry.

pub mod handlers;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

pub use handlers::{
    expiry_emails, expiry_sweep, health, redemptions, registry_sync, AppState, HealthResponse,
    JobFailure, RedemptionRequest,
};

/// Build the router for the trigger server.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/jobs/registry-sync", post(registry_sync))
        .route("/jobs/redemptions", post(redemptions))
        .route("/jobs/expiry-sweep", post(expiry_sweep))
        .route("/jobs/expiry-emails", post(expiry_emails))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
