//! Distributor order API contract.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{Money, PoNumber, ShippingAddress};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Cart header sent when opening an external cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistributorCart {
    pub po_number: PoNumber,
    pub warehouse: String,
    pub payment_type: String,
    pub ship_to: ShippingAddress,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shipping_service: Option<String>,
}

/// One line added to an external cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistributorLineItem {
    pub sku: String,
    pub quantity: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Acknowledgement of a created external cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartCreated {
    pub id: String,
}

/// Result of converting an external cart into an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCreated {
    pub order_number: String,
    pub status: String,
    pub total: Money,
}

/// The distributor's view of an order.
///
/// Owned by the distributor; anything held locally is a possibly-stale copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalOrderRecord {
    pub po_number: PoNumber,
    #[serde(default)]
    pub external_order_number: Option<String>,
    pub status: String,
    pub total: Money,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Operations against the distributor's order-management system.
///
/// Every cart operation is addressed by poNumber. Callers never issue
/// concurrent writes for the same poNumber.
#[async_trait]
pub trait DistributorApi: Send + Sync {
    /// Opens an external cart keyed by the cart's poNumber.
    async fn create_cart(&self, cart: &DistributorCart) -> Result<CartCreated>;

    /// Adds one line to an open cart.
    async fn add_item(&self, po_number: &PoNumber, item: &DistributorLineItem) -> Result<()>;

    /// Converts an open cart into an order.
    async fn create_order(&self, po_number: &PoNumber) -> Result<OrderCreated>;

    /// Deletes an open cart. Used as the compensating action.
    async fn delete_cart(&self, po_number: &PoNumber) -> Result<()>;

    /// Fetches an order by poNumber.
    async fn get_order(&self, po_number: &PoNumber) -> Result<ExternalOrderRecord>;
}

#[async_trait]
impl<T: DistributorApi + ?Sized> DistributorApi for Arc<T> {
    async fn create_cart(&self, cart: &DistributorCart) -> Result<CartCreated> {
        (**self).create_cart(cart).await
    }

    async fn add_item(&self, po_number: &PoNumber, item: &DistributorLineItem) -> Result<()> {
        (**self).add_item(po_number, item).await
    }

    async fn create_order(&self, po_number: &PoNumber) -> Result<OrderCreated> {
        (**self).create_order(po_number).await
    }

    async fn delete_cart(&self, po_number: &PoNumber) -> Result<()> {
        (**self).delete_cart(po_number).await
    }

    async fn get_order(&self, po_number: &PoNumber) -> Result<ExternalOrderRecord> {
        (**self).get_order(po_number).await
    }
}
