//! Submission state machine.

use serde::{Deserialize, Serialize};

/// The state of one order submission.
///
/// State transitions:
/// ```text
/// Validating ──► CartCreated ──► ItemsAdded ──► OrderCreated
///     │               │              │
///     └───────────────┴──────────────┴──► Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum SubmissionState {
    /// poNumber issued, request being validated.
    #[default]
    Validating,

    /// The external cart exists; lines are being added.
    CartCreated,

    /// Every line was added to the external cart.
    ItemsAdded,

    /// The distributor created the order (terminal state).
    OrderCreated,

    /// The submission ended without an order (terminal state).
    Failed,
}

impl SubmissionState {
    /// Returns true if lines may be added to the external cart.
    pub fn can_add_items(&self) -> bool {
        matches!(self, SubmissionState::CartCreated)
    }

    /// Returns true if the external cart may be turned into an order.
    pub fn can_create_order(&self) -> bool {
        matches!(self, SubmissionState::ItemsAdded)
    }

    /// Returns true if an external cart may exist that a failure must undo.
    pub fn needs_compensation(&self) -> bool {
        matches!(
            self,
            SubmissionState::CartCreated | SubmissionState::ItemsAdded
        )
    }

    /// Returns true if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SubmissionState::OrderCreated | SubmissionState::Failed)
    }

    /// Returns the state name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionState::Validating => "Validating",
            SubmissionState::CartCreated => "CartCreated",
            SubmissionState::ItemsAdded => "ItemsAdded",
            SubmissionState::OrderCreated => "OrderCreated",
            SubmissionState::Failed => "Failed",
        }
    }
}

impl std::fmt::Display for SubmissionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_state_is_validating() {
        assert_eq!(SubmissionState::default(), SubmissionState::Validating);
    }

    #[test]
    fn test_can_create_order_only_after_items() {
        assert!(!SubmissionState::Validating.can_create_order());
        assert!(!SubmissionState::CartCreated.can_create_order());
        assert!(SubmissionState::ItemsAdded.can_create_order());
        assert!(!SubmissionState::OrderCreated.can_create_order());
        assert!(!SubmissionState::Failed.can_create_order());
    }

    #[test]
    fn test_needs_compensation() {
        assert!(!SubmissionState::Validating.needs_compensation());
        assert!(SubmissionState::CartCreated.needs_compensation());
        assert!(SubmissionState::ItemsAdded.needs_compensation());
        assert!(!SubmissionState::OrderCreated.needs_compensation());
    }

    #[test]
    fn test_terminal_states() {
        assert!(!SubmissionState::Validating.is_terminal());
        assert!(!SubmissionState::CartCreated.is_terminal());
        assert!(!SubmissionState::ItemsAdded.is_terminal());
        assert!(SubmissionState::OrderCreated.is_terminal());
        assert!(SubmissionState::Failed.is_terminal());
    }

    #[test]
    fn test_display() {
        assert_eq!(SubmissionState::CartCreated.to_string(), "CartCreated");
        assert_eq!(SubmissionState::Failed.to_string(), "Failed");
    }
}
