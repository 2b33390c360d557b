//! HTTP front end for the order fulfillment engine.
//!
//! Serves session carts, shipping quotes, checkout (synchronous or through a
//! payment intent), the payment webhook and order lookups, with structured
//! logging (tracing) and Prometheus metrics.

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;
pub mod session;
pub mod state;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, patch, post, put};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use config::{Config, ConfigError};
use state::{AppState, Backends};

/// Creates the Axum application router with all routes and shared state.
pub fn create_app(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::render))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/cart", get(routes::cart::get).delete(routes::cart::clear))
        .route("/cart/items", post(routes::cart::add_item))
        .route(
            "/cart/items/{id}",
            patch(routes::cart::update_quantity).delete(routes::cart::remove_item),
        )
        .route("/cart/address", put(routes::cart::set_address))
        .route("/cart/shipping-rate", put(routes::cart::select_shipping_rate))
        .route(
            "/cart/identity",
            post(routes::cart::bind_identity).delete(routes::cart::unbind_identity),
        )
        .route("/shipping/rates", post(routes::shipping::quote))
        .route("/checkout", post(routes::checkout::submit))
        .route(
            "/checkout/payment-intent",
            post(routes::checkout::create_payment_intent),
        )
        .route(
            "/checkout/payment-intent/{id}",
            get(routes::checkout::payment_status),
        )
        .route("/webhooks/payment", post(routes::webhooks::payment))
        .route("/orders/{po_number}", get(routes::orders::get))
        .route(
            "/orders/{po_number}/submission",
            get(routes::orders::submission),
        )
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
                .expose_headers([axum::http::HeaderName::from_static(
                    session::SESSION_HEADER,
                )]),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates application state over the backends `config` selects.
pub fn create_default_state(config: &Config) -> Result<Arc<AppState>, ConfigError> {
    let backends = Backends::from_config(config)?;
    Ok(AppState::new(config, backends))
}
