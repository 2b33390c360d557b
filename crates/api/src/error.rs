//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use cart::CartError;
use fulfillment::{SubmissionError, ValidationErrors};
use gateway::GatewayError;
use reconciler::ReconcileError;
use shipping::ShippingError;

/// Shown when an order fails after validation. Nothing was charged.
const SUBMISSION_FAILED: &str = "Order could not be submitted, no charge was made";

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found.
    NotFound(String),
    /// Bad request from the client.
    BadRequest(String),
    /// Per-field validation failures.
    Validation(ValidationErrors),
    Cart(CartError),
    Submission(SubmissionError),
    /// An external system failed.
    Gateway(GatewayError),
    /// Webhook could not be verified.
    Unverified,
    /// No valid access token.
    Unauthorized,
    /// Internal server error.
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, error_body(msg)),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, error_body(msg)),
            ApiError::Validation(errors) => validation_response(errors),
            ApiError::Cart(err) => cart_error_to_response(err),
            ApiError::Submission(err) => submission_error_to_response(err),
            ApiError::Gateway(err) => gateway_error_to_response(err),
            ApiError::Unverified => (StatusCode::BAD_REQUEST, error_body("invalid signature")),
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, error_body("authentication required")),
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, error_body(msg))
            }
        };

        (status, axum::Json(body)).into_response()
    }
}

fn error_body(message: impl Into<String>) -> serde_json::Value {
    serde_json::json!({ "error": message.into() })
}

fn validation_response(errors: ValidationErrors) -> (StatusCode, serde_json::Value) {
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        serde_json::json!({ "error": "validation failed", "fields": errors }),
    )
}

fn cart_error_to_response(err: CartError) -> (StatusCode, serde_json::Value) {
    match err {
        CartError::ZeroQuantity => (StatusCode::BAD_REQUEST, error_body(err.to_string())),
        CartError::ItemNotFound(_) => (StatusCode::NOT_FOUND, error_body(err.to_string())),
        CartError::AlreadyBound { .. } => (StatusCode::CONFLICT, error_body(err.to_string())),
        CartError::Store(source) => gateway_error_to_response(source),
        CartError::Corrupt(_) => {
            tracing::error!(error = %err, "stored cart is unreadable");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_body(err.to_string()),
            )
        }
    }
}

fn submission_error_to_response(err: SubmissionError) -> (StatusCode, serde_json::Value) {
    match err {
        SubmissionError::Validation(errors) => validation_response(errors),
        SubmissionError::PoNumberCollision(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            error_body(SUBMISSION_FAILED),
        ),
        SubmissionError::StepFailed { po_number, .. } => (
            StatusCode::BAD_GATEWAY,
            serde_json::json!({ "error": SUBMISSION_FAILED, "po_number": po_number }),
        ),
    }
}

fn gateway_error_to_response(err: GatewayError) -> (StatusCode, serde_json::Value) {
    match &err {
        GatewayError::NotFound { resource, .. } => (
            StatusCode::NOT_FOUND,
            error_body(format!("{resource} not found")),
        ),
        _ => {
            tracing::warn!(error = %err, "upstream call failed");
            (StatusCode::BAD_GATEWAY, error_body(err.to_string()))
        }
    }
}

impl From<CartError> for ApiError {
    fn from(err: CartError) -> Self {
        ApiError::Cart(err)
    }
}

impl From<SubmissionError> for ApiError {
    fn from(err: SubmissionError) -> Self {
        ApiError::Submission(err)
    }
}

impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        ApiError::Gateway(err)
    }
}

impl From<ShippingError> for ApiError {
    fn from(err: ShippingError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl From<ReconcileError> for ApiError {
    fn from(err: ReconcileError) -> Self {
        match err {
            ReconcileError::Signature(_) => ApiError::Unverified,
            ReconcileError::Validation(errors) => ApiError::Validation(errors),
            ReconcileError::Gateway(err) => ApiError::Gateway(err),
            ReconcileError::Aborted(msg) => ApiError::Internal(msg),
        }
    }
}
