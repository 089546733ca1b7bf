//! Health check handlers.

use axum::{extract::State, http::StatusCode};

use crate::state::AppState;

/// Liveness health check endpoint.
///
/// Returns "Running" if the server is up. Does not check dependencies.
pub async fn health() -> &'static str {
    "Running"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the identity store is not reachable.
pub async fn readiness(State(state): State<AppState>) -> StatusCode {
    match state.identity().ping().await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
