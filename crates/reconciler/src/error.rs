//! Reconciler error and gap types.

use common::{IdentityId, PoNumber};
use fulfillment::ValidationErrors;
use gateway::{GatewayError, SignatureError};
use thiserror::Error;

/// Errors returned to the caller of the reconciler.
///
/// Only failures that happen before anything is trusted or charged are
/// errors. Problems after a payment was captured are [`ReconciliationGap`]s.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("webhook rejected: {0}")]
    Signature(#[from] SignatureError),

    #[error("invalid checkout: {0}")]
    Validation(#[from] ValidationErrors),

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// The reconciliation task panicked or was cancelled by the runtime.
    #[error("reconciliation aborted: {0}")]
    Aborted(String),
}

pub type Result<T> = std::result::Result<T, ReconcileError>;

/// A captured payment whose order or order-history entry could not be
/// produced. Reported to operators, never to the payer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReconciliationGap {
    #[error("payment {payment_intent} carries unusable order metadata: {reason}")]
    InvalidMetadata {
        payment_intent: String,
        reason: String,
    },

    #[error("payment {payment_intent} captured but the order was not created: {reason}")]
    OrderNotCreated {
        payment_intent: String,
        reason: String,
    },

    #[error("order {po_number} created but not associated with {identity_id}: {reason}")]
    AssociationFailed {
        po_number: PoNumber,
        identity_id: IdentityId,
        reason: String,
    },
}

impl ReconciliationGap {
    /// Short label used on metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ReconciliationGap::InvalidMetadata { .. } => "invalid_metadata",
            ReconciliationGap::OrderNotCreated { .. } => "order_not_created",
            ReconciliationGap::AssociationFailed { .. } => "association_failed",
        }
    }
}
