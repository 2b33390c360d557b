//! Session cart endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use cart::{BindOutcome, CartItem, CartStateManager, CartTotals};
use common::{CatalogItemId, IdentityId, Money, ShippingAddress};
use serde::{Deserialize, Serialize};
use shipping::ShippingRate;

use crate::auth::Authenticated;
use crate::error::ApiError;
use crate::session::CartSession;
use crate::state::AppState;

// -- Request types --

#[derive(Deserialize)]
pub struct AddItemRequest {
    pub catalog_item_id: String,
    pub sku: String,
    pub name: String,
    pub unit_price: Money,
    #[serde(default = "one")]
    pub quantity: u32,
    pub weight: Option<f64>,
    pub product_type: Option<String>,
}

fn one() -> u32 {
    1
}

#[derive(Deserialize)]
pub struct UpdateQuantityRequest {
    pub quantity: u32,
}

#[derive(Deserialize)]
pub struct SelectRateRequest {
    pub rate_id: String,
}

// -- Response types --

#[derive(Serialize)]
pub struct CartResponse {
    pub session: String,
    pub owner: Option<IdentityId>,
    pub items: Vec<CartItem>,
    pub item_count: u32,
    pub shipping_address: Option<ShippingAddress>,
    pub selected_rate: Option<ShippingRate>,
    pub totals: CartTotals,
}

impl CartResponse {
    fn new(session: &CartSession, manager: &CartStateManager) -> Self {
        let cart = manager.cart();
        Self {
            session: session.id().to_string(),
            owner: cart.owner().cloned(),
            items: cart.items().to_vec(),
            item_count: cart.item_count(),
            shipping_address: cart.shipping_address().cloned(),
            selected_rate: cart.selected_rate().cloned(),
            totals: manager.totals(),
        }
    }
}

#[derive(Serialize)]
pub struct BindResponse {
    pub outcome: &'static str,
    pub stored_lines: usize,
    pub cart: CartResponse,
}

#[derive(Serialize)]
pub struct ShippingRateSelection {
    pub cart: CartResponse,
    pub available: Vec<ShippingRate>,
}

type CartReply = ([(&'static str, String); 1], Json<CartResponse>);

/// Stores the cart and answers with it, echoing the session header.
async fn respond(state: &AppState, session: &CartSession, manager: &CartStateManager) -> CartReply {
    state.save_cart(session, manager).await;
    (session.header(), Json(CartResponse::new(session, manager)))
}

// -- Handlers --

/// GET /cart: the session's cart with totals.
pub async fn get(State(state): State<Arc<AppState>>, session: CartSession) -> CartReply {
    let manager = state.open_cart(&session).await;
    (session.header(), Json(CartResponse::new(&session, &manager)))
}

/// POST /cart/items: add units of a catalog item.
#[tracing::instrument(skip(state, req), fields(session = %session.id(), sku = %req.sku))]
pub async fn add_item(
    State(state): State<Arc<AppState>>,
    session: CartSession,
    Json(req): Json<AddItemRequest>,
) -> Result<CartReply, ApiError> {
    if req.unit_price.is_negative() {
        return Err(ApiError::BadRequest("unit_price must not be negative".into()));
    }
    let mut manager = state.open_cart(&session).await;
    let item = CartItem {
        catalog_item_id: CatalogItemId::from(req.catalog_item_id),
        sku: req.sku,
        name: req.name,
        unit_price: req.unit_price,
        quantity: 1,
        weight: req.weight,
        product_type: req.product_type,
    };
    manager.add_item(item, req.quantity)?;
    Ok(respond(&state, &session, &manager).await)
}

/// PATCH /cart/items/{id}: set a line's quantity; zero removes it.
#[tracing::instrument(skip(state, req), fields(session = %session.id()))]
pub async fn update_quantity(
    State(state): State<Arc<AppState>>,
    session: CartSession,
    Path(id): Path<String>,
    Json(req): Json<UpdateQuantityRequest>,
) -> Result<CartReply, ApiError> {
    let mut manager = state.open_cart(&session).await;
    manager.update_quantity(&CatalogItemId::from(id), req.quantity)?;
    Ok(respond(&state, &session, &manager).await)
}

/// DELETE /cart/items/{id}: remove a line.
#[tracing::instrument(skip(state), fields(session = %session.id()))]
pub async fn remove_item(
    State(state): State<Arc<AppState>>,
    session: CartSession,
    Path(id): Path<String>,
) -> Result<CartReply, ApiError> {
    let mut manager = state.open_cart(&session).await;
    manager.remove_item(&CatalogItemId::from(id))?;
    Ok(respond(&state, &session, &manager).await)
}

/// DELETE /cart: empty the cart.
pub async fn clear(State(state): State<Arc<AppState>>, session: CartSession) -> CartReply {
    let mut manager = state.open_cart(&session).await;
    manager.clear();
    respond(&state, &session, &manager).await
}

/// PUT /cart/address: set the shipping address. Drops any selected rate.
pub async fn set_address(
    State(state): State<Arc<AppState>>,
    session: CartSession,
    Json(address): Json<ShippingAddress>,
) -> Result<CartReply, ApiError> {
    fulfillment::validation::check_address(&address).map_err(ApiError::Validation)?;
    let mut manager = state.open_cart(&session).await;
    manager.set_shipping_address(address);
    Ok(respond(&state, &session, &manager).await)
}

/// PUT /cart/shipping-rate: pick one of the rates currently offered for
/// the cart.
#[tracing::instrument(skip(state, req), fields(session = %session.id(), rate_id = %req.rate_id))]
pub async fn select_shipping_rate(
    State(state): State<Arc<AppState>>,
    session: CartSession,
    Json(req): Json<SelectRateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let mut manager = state.open_cart(&session).await;
    let address = manager
        .cart()
        .shipping_address()
        .cloned()
        .ok_or_else(|| ApiError::BadRequest("set a shipping address first".into()))?;

    let available = state.calculator().calculate(
        &address,
        manager.cart().subtotal(),
        manager.cart().total_weight(),
    )?;
    let rate = available
        .iter()
        .find(|rate| rate.id == req.rate_id)
        .cloned()
        .ok_or_else(|| ApiError::BadRequest(format!("rate {} is not offered", req.rate_id)))?;

    manager.select_shipping_rate(rate);
    state.save_cart(&session, &manager).await;
    Ok((
        session.header(),
        Json(ShippingRateSelection {
            cart: CartResponse::new(&session, &manager),
            available,
        }),
    ))
}

/// POST /cart/identity: sign the cart in as the authenticated identity,
/// merging any stored cart.
#[tracing::instrument(skip(state), fields(session = %session.id(), identity = %identity))]
pub async fn bind_identity(
    State(state): State<Arc<AppState>>,
    session: CartSession,
    Authenticated(identity): Authenticated,
) -> Result<impl IntoResponse, ApiError> {
    let mut manager = state.open_cart(&session).await;
    let outcome = manager.bind_identity(identity).await?;
    state.save_cart(&session, &manager).await;

    let (outcome, stored_lines) = match outcome {
        BindOutcome::Adopted => ("adopted", 0),
        BindOutcome::Merged { stored_lines } => ("merged", stored_lines),
        BindOutcome::AlreadyMerged => ("already_merged", 0),
    };
    Ok((
        session.header(),
        Json(BindResponse {
            outcome,
            stored_lines,
            cart: CartResponse::new(&session, &manager),
        }),
    ))
}

/// DELETE /cart/identity: sign out, leaving an empty anonymous cart.
pub async fn unbind_identity(
    State(state): State<Arc<AppState>>,
    session: CartSession,
) -> CartReply {
    let mut manager = state.open_cart(&session).await;
    if let Some(identity) = manager.unbind_identity() {
        tracing::info!(session = %session.id(), %identity, "cart signed out");
    }
    respond(&state, &session, &manager).await
}
