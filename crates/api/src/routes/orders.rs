//! Order lookups.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use common::PoNumber;
use fulfillment::Submission;
use gateway::ExternalOrderRecord;

use crate::error::ApiError;
use crate::state::AppState;

/// GET /orders/{po_number}: the distributor's view of the order.
pub async fn get(
    State(state): State<Arc<AppState>>,
    Path(po_number): Path<String>,
) -> Result<Json<ExternalOrderRecord>, ApiError> {
    let record = state.orders.get_order(&PoNumber::new(po_number)).await?;
    Ok(Json(record))
}

/// GET /orders/{po_number}/submission: how the local submission went.
pub async fn submission(
    State(state): State<Arc<AppState>>,
    Path(po_number): Path<String>,
) -> Result<Json<Submission>, ApiError> {
    state
        .orchestrator
        .get_submission(&PoNumber::new(po_number.clone()))
        .await
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("no submission for {po_number}")))
}
