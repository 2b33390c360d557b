//! Checkout endpoints: synchronous order submission and the payment-intent
//! flow that lets the webhook create the order.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use cart::CartStateManager;
use common::Money;
use fulfillment::{CheckoutRequest, Customer, OrderLine, SubmissionReceipt};
use gateway::PaymentIntentStatus;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::session::CartSession;
use crate::state::AppState;

/// Checkout details not held by the cart. Send `{}` when there are none.
#[derive(Deserialize, Default)]
pub struct CheckoutBody {
    pub email: Option<String>,
    pub payment_reference: Option<String>,
}

#[derive(Serialize)]
pub struct PaymentIntentResponse {
    pub id: String,
    pub client_secret: String,
    pub amount: Money,
    pub currency: String,
}

#[derive(Serialize)]
pub struct PaymentStatusResponse {
    pub id: String,
    pub status: PaymentIntentStatus,
}

/// Turns the session cart into a checkout request. A missing address is
/// left empty so validation reports each field.
fn checkout_request(manager: &CartStateManager, body: CheckoutBody) -> CheckoutRequest {
    let cart = manager.cart();
    let items = cart
        .items()
        .iter()
        .map(|item| OrderLine {
            sku: item.sku.clone(),
            name: item.name.clone(),
            quantity: item.quantity,
            unit_price: item.unit_price,
            dealer_price: None,
            weight: item.weight,
        })
        .collect();

    CheckoutRequest {
        customer: Customer {
            identity_id: cart.owner().cloned(),
            email: body.email,
        },
        shipping_address: cart.shipping_address().cloned().unwrap_or_default(),
        items,
        shipping_rate: cart.selected_rate().cloned(),
        payment_reference: body.payment_reference,
    }
}

/// POST /checkout: submit the cart to the distributor and empty it.
#[tracing::instrument(skip(state, body), fields(session = %session.id()))]
pub async fn submit(
    State(state): State<Arc<AppState>>,
    session: CartSession,
    Json(body): Json<CheckoutBody>,
) -> Result<(StatusCode, Json<SubmissionReceipt>), ApiError> {
    let mut manager = state.open_cart(&session).await;
    let request = checkout_request(&manager, body);

    let receipt = state.orchestrator.submit(request).await?;
    metrics::counter!("checkouts_total", "mode" => "direct").increment(1);

    manager.clear();
    state.save_cart(&session, &manager).await;
    Ok((StatusCode::CREATED, Json(receipt)))
}

/// POST /checkout/payment-intent: start a paid checkout. The order is
/// created when the processor reports the payment as captured.
#[tracing::instrument(skip(state, body), fields(session = %session.id()))]
pub async fn create_payment_intent(
    State(state): State<Arc<AppState>>,
    session: CartSession,
    Json(body): Json<CheckoutBody>,
) -> Result<(StatusCode, Json<PaymentIntentResponse>), ApiError> {
    let manager = state.open_cart(&session).await;
    let request = checkout_request(&manager, body);

    let intent = state.reconciler.create_payment_intent(&request).await?;
    metrics::counter!("checkouts_total", "mode" => "payment_intent").increment(1);
    Ok((
        StatusCode::CREATED,
        Json(PaymentIntentResponse {
            id: intent.id,
            client_secret: intent.client_secret,
            amount: intent.amount,
            currency: intent.currency,
        }),
    ))
}

/// GET /checkout/payment-intent/{id}
pub async fn payment_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<PaymentStatusResponse>, ApiError> {
    let status = state.reconciler.payment_status(&id).await?;
    Ok(Json(PaymentStatusResponse { id, status }))
}
