//! Payment processor webhook receiver.

use std::sync::Arc;

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use common::PoNumber;
use gateway::SIGNATURE_HEADER;
use reconciler::ReconcileOutcome;
use serde::Serialize;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Serialize)]
pub struct WebhookAck {
    pub received: bool,
    pub outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub po_number: Option<PoNumber>,
}

impl From<ReconcileOutcome> for WebhookAck {
    fn from(outcome: ReconcileOutcome) -> Self {
        let (outcome, po_number) = match outcome {
            ReconcileOutcome::OrderCreated { po_number, .. } => ("order_created", Some(po_number)),
            ReconcileOutcome::Duplicate { po_number, .. } => ("duplicate", Some(po_number)),
            ReconcileOutcome::InFlight => ("in_flight", None),
            ReconcileOutcome::Ignored(_) => ("ignored", None),
            ReconcileOutcome::Gap(_) => ("gap", None),
        };
        Self {
            received: true,
            outcome,
            po_number,
        }
    }
}

/// POST /webhooks/payment
///
/// Any verified delivery is acknowledged with 200, including ones that left
/// a reconciliation gap; those are reported to operators, and a retry would
/// not fix them. Only a bad signature is rejected.
pub async fn payment(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>, ApiError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());
    let outcome = state.reconciler.handle_webhook(&body, signature).await?;
    Ok(Json(WebhookAck::from(outcome)))
}
