//! Cart line items.

use common::{CatalogItemId, Money};
use serde::{Deserialize, Serialize};

/// One line in a cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    pub catalog_item_id: CatalogItemId,
    pub sku: String,
    pub name: String,
    pub unit_price: Money,
    pub quantity: u32,
    /// Weight of one unit in pounds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_type: Option<String>,
}

impl CartItem {
    /// Creates a line with quantity 1.
    pub fn new(
        catalog_item_id: impl Into<CatalogItemId>,
        sku: impl Into<String>,
        name: impl Into<String>,
        unit_price: Money,
    ) -> Self {
        Self {
            catalog_item_id: catalog_item_id.into(),
            sku: sku.into(),
            name: name.into(),
            unit_price,
            quantity: 1,
            weight: None,
            product_type: None,
        }
    }

    pub fn with_quantity(mut self, quantity: u32) -> Self {
        self.quantity = quantity;
        self
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = Some(weight);
        self
    }

    /// Returns the line total (unit price times quantity).
    pub fn line_total(&self) -> Money {
        self.unit_price.multiply(self.quantity)
    }

    /// Returns the line weight; a missing unit weight counts as zero.
    pub fn line_weight(&self) -> f64 {
        self.weight.unwrap_or(0.0) * f64::from(self.quantity)
    }
}
