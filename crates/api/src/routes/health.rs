//! Health check endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    /// Orders are fabricated instead of reaching the distributor.
    pub order_test_mode: bool,
}

/// GET /health: liveness plus whether order test mode is on.
pub async fn check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        order_test_mode: state.orchestrator.config().test_mode,
    })
}
