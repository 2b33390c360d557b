//! Shipping rate quotes.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use common::{Money, ShippingAddress};
use serde::Deserialize;
use shipping::ShippingRate;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct RateQuoteRequest {
    pub shipping_address: ShippingAddress,
    pub subtotal: Money,
    /// Total package weight in pounds.
    #[serde(default)]
    pub weight: f64,
}

/// POST /shipping/rates: available rates, cheapest first.
pub async fn quote(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RateQuoteRequest>,
) -> Result<Json<Vec<ShippingRate>>, ApiError> {
    let rates = state
        .calculator()
        .calculate(&req.shipping_address, req.subtotal, req.weight)?;
    Ok(Json(rates))
}
