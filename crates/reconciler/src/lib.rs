//! Payment reconciliation for the order engine.
//!
//! Checkout can start asynchronously: a payment intent is created whose
//! metadata describes the order, and the order is only placed once the
//! processor reports the payment captured. [`PaymentReconciler`] handles both
//! ends of that flow and makes webhook redelivery safe.

pub mod error;
pub mod idempotency;
pub mod metadata;
pub mod reconciler;

pub use error::{ReconcileError, ReconciliationGap, Result};
pub use idempotency::{Claim, EventLedger, EventRecord};
pub use metadata::{
    encode_order_metadata, parse_order_metadata, OrderMetadata, ParsedOrderMetadata, SelectedRate,
};
pub use reconciler::{Association, PaymentReconciler, ReconcileOutcome, ReconcilerConfig};
