//! Liveness and readiness probes.

use crate::routes::AppState;
use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use std::sync::Arc;
use tracing::instrument;

/// Readiness probe body.
#[derive(Debug, Serialize)]
pub struct ReadinessResponse {
    pub status: &'static str,
    pub credential_store: &'static str,
}

/// GET /health
pub async fn health_check() -> &'static str {
    "OK"
}

/// GET /ready
///
/// The router only exists once roles are seeded, so readiness reduces to
/// the credential store answering. Returns 503 when it does not.
#[instrument(skip_all, name = "ac.health.ready")]
pub async fn readiness_check(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<ReadinessResponse>) {
    match state.manager.store().ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(ReadinessResponse {
                status: "ready",
                credential_store: "healthy",
            }),
        ),
        Err(e) => {
            tracing::warn!(target: "ac.health", error = %e, "Credential store unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ReadinessResponse {
                    status: "not_ready",
                    credential_store: "unhealthy",
                }),
            )
        }
    }
}
