//! Submission error types.

use common::PoNumber;
use gateway::GatewayError;
use thiserror::Error;

use crate::events::SubmissionStep;
use crate::validation::ValidationErrors;

/// The compensating cart delete itself failed. The external cart may be
/// left behind and needs an operator.
#[derive(Debug, Clone, Error)]
#[error("Could not delete external cart {po_number}: {source}")]
pub struct CleanupFailed {
    pub po_number: PoNumber,
    pub source: GatewayError,
}

/// Errors that can occur during order submission.
#[derive(Debug, Clone, Error)]
pub enum SubmissionError {
    /// The request was rejected before any distributor call.
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationErrors),

    /// A freshly generated poNumber was already issued. Not retryable.
    #[error("Generated poNumber {0} collides with an issued one")]
    PoNumberCollision(PoNumber),

    /// A distributor call failed.
    ///
    /// `cleanup` is `None` when nothing had to be undone (the cart was never
    /// created), otherwise the outcome of the compensating delete.
    #[error("Order {po_number} failed at {step}: {source}")]
    StepFailed {
        po_number: PoNumber,
        step: SubmissionStep,
        source: GatewayError,
        cleanup: Option<std::result::Result<(), CleanupFailed>>,
    },
}

impl SubmissionError {
    /// The poNumber the failure belongs to, when one was issued.
    pub fn po_number(&self) -> Option<&PoNumber> {
        match self {
            SubmissionError::PoNumberCollision(po) => Some(po),
            SubmissionError::StepFailed { po_number, .. } => Some(po_number),
            SubmissionError::Validation(_) => None,
        }
    }

    /// The failed compensation, if cleanup was attempted and failed.
    pub fn cleanup_failed(&self) -> Option<&CleanupFailed> {
        match self {
            SubmissionError::StepFailed {
                cleanup: Some(Err(failed)),
                ..
            } => Some(failed),
            _ => None,
        }
    }
}

/// Convenience type alias for submission results.
pub type Result<T> = std::result::Result<T, SubmissionError>;
