//! Submission events.

use chrono::{DateTime, Utc};
use common::{Money, PoNumber};
use serde::{Deserialize, Serialize};

/// A step of the submission sequence that can fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStep {
    Validate,
    CreateCart,
    AddItem,
    CreateOrder,
}

impl SubmissionStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionStep::Validate => "validate",
            SubmissionStep::CreateCart => "create_cart",
            SubmissionStep::AddItem => "add_item",
            SubmissionStep::CreateOrder => "create_order",
        }
    }
}

impl std::fmt::Display for SubmissionStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Events that can occur during one order submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum SubmissionEvent {
    /// A poNumber was issued and the submission began.
    Started(StartedData),

    /// Customer, address and lines passed validation.
    Validated,

    /// The external cart exists.
    CartCreated(CartCreatedData),

    /// One line was added to the external cart.
    ItemAdded(ItemAddedData),

    /// The distributor accepted the order (terminal success).
    OrderCreated(OrderCreatedData),

    /// A step failed.
    StepFailed(StepFailedData),

    /// The external cart was deleted after a failure.
    CompensationSucceeded,

    /// The compensating delete failed; the external cart may be orphaned.
    CompensationFailed(CompensationFailedData),

    /// The submission ended without an order (terminal failure).
    Failed(FailedData),
}

impl SubmissionEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            SubmissionEvent::Started(_) => "Started",
            SubmissionEvent::Validated => "Validated",
            SubmissionEvent::CartCreated(_) => "CartCreated",
            SubmissionEvent::ItemAdded(_) => "ItemAdded",
            SubmissionEvent::OrderCreated(_) => "OrderCreated",
            SubmissionEvent::StepFailed(_) => "StepFailed",
            SubmissionEvent::CompensationSucceeded => "CompensationSucceeded",
            SubmissionEvent::CompensationFailed(_) => "CompensationFailed",
            SubmissionEvent::Failed(_) => "Failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartedData {
    pub po_number: PoNumber,
    /// Number of lines the submission will add.
    pub line_count: usize,
    pub test_mode: bool,
    pub started_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartCreatedData {
    /// Distributor-assigned cart id.
    pub cart_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemAddedData {
    pub sku: String,
    pub quantity: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCreatedData {
    pub order_number: String,
    pub status: String,
    pub total: Money,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepFailedData {
    pub step: SubmissionStep,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompensationFailedData {
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedData {
    pub reason: String,
    pub failed_at: DateTime<Utc>,
}

// Convenience constructors
impl SubmissionEvent {
    pub fn started(
        po_number: PoNumber,
        line_count: usize,
        test_mode: bool,
        started_at: DateTime<Utc>,
    ) -> Self {
        SubmissionEvent::Started(StartedData {
            po_number,
            line_count,
            test_mode,
            started_at,
        })
    }

    pub fn cart_created(cart_id: impl Into<String>) -> Self {
        SubmissionEvent::CartCreated(CartCreatedData {
            cart_id: cart_id.into(),
        })
    }

    pub fn item_added(sku: impl Into<String>, quantity: u32) -> Self {
        SubmissionEvent::ItemAdded(ItemAddedData {
            sku: sku.into(),
            quantity,
        })
    }

    pub fn order_created(
        order_number: impl Into<String>,
        status: impl Into<String>,
        total: Money,
        created_at: DateTime<Utc>,
    ) -> Self {
        SubmissionEvent::OrderCreated(OrderCreatedData {
            order_number: order_number.into(),
            status: status.into(),
            total,
            created_at,
        })
    }

    pub fn step_failed(step: SubmissionStep, error: impl Into<String>) -> Self {
        SubmissionEvent::StepFailed(StepFailedData {
            step,
            error: error.into(),
        })
    }

    pub fn compensation_failed(error: impl Into<String>) -> Self {
        SubmissionEvent::CompensationFailed(CompensationFailedData {
            error: error.into(),
        })
    }

    pub fn failed(reason: impl Into<String>, failed_at: DateTime<Utc>) -> Self {
        SubmissionEvent::Failed(FailedData {
            reason: reason.into(),
            failed_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialization_is_tagged() {
        let event = SubmissionEvent::item_added("SKU-1", 2);
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "ItemAdded");
        assert_eq!(json["data"]["sku"], "SKU-1");

        let back: SubmissionEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn test_unit_variants_serialize() {
        let json = serde_json::to_value(SubmissionEvent::Validated).unwrap();
        assert_eq!(json["type"], "Validated");
        assert_eq!(SubmissionEvent::CompensationSucceeded.event_type(), "CompensationSucceeded");
    }

    #[test]
    fn test_step_names() {
        assert_eq!(SubmissionStep::AddItem.to_string(), "add_item");
        assert_eq!(
            serde_json::to_string(&SubmissionStep::CreateOrder).unwrap(),
            "\"create_order\""
        );
    }
}
