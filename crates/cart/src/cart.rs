//! The cart value and its derived totals.

use common::{CatalogItemId, IdentityId, Money, ShippingAddress};
use serde::{Deserialize, Serialize};
use shipping::ShippingRate;

use crate::item::CartItem;

/// Totals derived from a cart. Never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartTotals {
    pub subtotal: Money,
    /// `None` until a shipping rate is selected. Counts as zero in
    /// `grand_total`; it means "not yet known", not "free".
    pub shipping: Option<Money>,
    pub tax: Money,
    pub grand_total: Money,
}

/// A shopping cart.
///
/// Read access is public; every change goes through
/// [`CartStateManager`](crate::CartStateManager).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Cart {
    items: Vec<CartItem>,
    owner: Option<IdentityId>,
    shipping_address: Option<ShippingAddress>,
    selected_rate: Option<ShippingRate>,
}

impl Cart {
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    pub fn owner(&self) -> Option<&IdentityId> {
        self.owner.as_ref()
    }

    pub fn shipping_address(&self) -> Option<&ShippingAddress> {
        self.shipping_address.as_ref()
    }

    pub fn selected_rate(&self) -> Option<&ShippingRate> {
        self.selected_rate.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Returns the line for a catalog item.
    pub fn item(&self, id: &CatalogItemId) -> Option<&CartItem> {
        self.items.iter().find(|item| &item.catalog_item_id == id)
    }

    /// Total number of units across all lines.
    pub fn item_count(&self) -> u32 {
        self.items.iter().map(|item| item.quantity).sum()
    }

    /// Σ unit price × quantity.
    pub fn subtotal(&self) -> Money {
        self.items.iter().map(CartItem::line_total).sum()
    }

    /// Σ unit weight × quantity, in pounds.
    pub fn total_weight(&self) -> f64 {
        self.items.iter().map(CartItem::line_weight).sum()
    }

    /// Computes the cart totals with tax at `tax_rate_bps` basis points of
    /// the subtotal.
    pub fn totals(&self, tax_rate_bps: u32) -> CartTotals {
        let subtotal = self.subtotal();
        let shipping = self.selected_rate.as_ref().map(|rate| rate.rate);
        let tax = subtotal.percent_bps(tax_rate_bps);
        CartTotals {
            subtotal,
            shipping,
            tax,
            grand_total: subtotal + shipping.unwrap_or_default() + tax,
        }
    }

    pub(crate) fn items_mut(&mut self) -> &mut Vec<CartItem> {
        &mut self.items
    }

    pub(crate) fn set_owner(&mut self, owner: Option<IdentityId>) {
        self.owner = owner;
    }

    pub(crate) fn set_shipping_address(&mut self, address: Option<ShippingAddress>) {
        self.shipping_address = address;
        self.selected_rate = None;
    }

    pub(crate) fn set_selected_rate(&mut self, rate: Option<ShippingRate>) {
        self.selected_rate = rate;
    }

    /// Adds `quantity` of `item`, summing into an existing line with the
    /// same catalog id.
    pub(crate) fn merge_line(&mut self, item: CartItem, quantity: u32) {
        match self
            .items
            .iter_mut()
            .find(|line| line.catalog_item_id == item.catalog_item_id)
        {
            Some(line) => line.quantity = line.quantity.saturating_add(quantity),
            None => self.items.push(CartItem { quantity, ..item }),
        }
    }
}
