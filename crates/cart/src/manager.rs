//! Cart state manager.

use std::sync::Arc;

use common::{CatalogItemId, IdentityId, ShippingAddress};
use serde::{Deserialize, Serialize};
use shipping::ShippingRate;

use crate::cart::{Cart, CartTotals};
use crate::error::{CartError, Result};
use crate::item::CartItem;
use crate::persister::CartPersister;
use crate::store::CartStore;

/// Cart configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CartConfig {
    /// Tax rate applied to the subtotal, in basis points.
    pub tax_rate_bps: u32,
}

/// Serializable session state of a cart, for keeping it between requests.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CartSnapshot {
    pub cart: Cart,
    /// Identity whose stored cart has already been merged in.
    pub last_merged: Option<IdentityId>,
}

/// What `bind_identity` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindOutcome {
    /// The identity had no stored cart; the anonymous items were kept as-is.
    Adopted,
    /// The anonymous items were merged into the stored cart.
    Merged { stored_lines: usize },
    /// This identity was already merged into the cart; nothing changed.
    AlreadyMerged,
}

/// Owns the cart of one browsing session.
///
/// Item changes on an owned cart are queued for persistence and never wait
/// for it.
pub struct CartStateManager {
    cart: Cart,
    last_merged: Option<IdentityId>,
    config: CartConfig,
    store: Arc<dyn CartStore>,
    persister: CartPersister,
}

impl std::fmt::Debug for CartStateManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartStateManager")
            .field("cart", &self.cart)
            .field("last_merged", &self.last_merged)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl CartStateManager {
    /// Creates a manager holding an empty anonymous cart.
    pub fn new(config: CartConfig, store: Arc<dyn CartStore>, persister: CartPersister) -> Self {
        Self::restore(CartSnapshot::default(), config, store, persister)
    }

    /// Recreates a manager from a snapshot taken earlier in the session.
    pub fn restore(
        snapshot: CartSnapshot,
        config: CartConfig,
        store: Arc<dyn CartStore>,
        persister: CartPersister,
    ) -> Self {
        Self {
            cart: snapshot.cart,
            last_merged: snapshot.last_merged,
            config,
            store,
            persister,
        }
    }

    pub fn snapshot(&self) -> CartSnapshot {
        CartSnapshot {
            cart: self.cart.clone(),
            last_merged: self.last_merged.clone(),
        }
    }

    pub fn cart(&self) -> &Cart {
        &self.cart
    }

    pub fn totals(&self) -> CartTotals {
        self.cart.totals(self.config.tax_rate_bps)
    }

    /// Adds `quantity` units of `item`. An existing line for the same catalog
    /// item has its quantity increased.
    pub fn add_item(&mut self, item: CartItem, quantity: u32) -> Result<()> {
        if quantity == 0 {
            return Err(CartError::ZeroQuantity);
        }
        self.cart.merge_line(item, quantity);
        self.persist_if_owned();
        Ok(())
    }

    /// Removes the line for `id`.
    pub fn remove_item(&mut self, id: &CatalogItemId) -> Result<CartItem> {
        let items = self.cart.items_mut();
        let index = items
            .iter()
            .position(|item| &item.catalog_item_id == id)
            .ok_or_else(|| CartError::ItemNotFound(id.clone()))?;
        let removed = items.remove(index);
        self.persist_if_owned();
        Ok(removed)
    }

    /// Sets the quantity of the line for `id`; zero removes the line.
    pub fn update_quantity(&mut self, id: &CatalogItemId, quantity: u32) -> Result<()> {
        if quantity == 0 {
            return self.remove_item(id).map(|_| ());
        }
        let line = self
            .cart
            .items_mut()
            .iter_mut()
            .find(|item| &item.catalog_item_id == id)
            .ok_or_else(|| CartError::ItemNotFound(id.clone()))?;
        line.quantity = quantity;
        self.persist_if_owned();
        Ok(())
    }

    /// Empties the cart and drops the selected shipping rate.
    pub fn clear(&mut self) {
        self.cart.items_mut().clear();
        self.cart.set_selected_rate(None);
        self.persist_if_owned();
    }

    /// Attaches a shipping address. Any selected rate is dropped.
    pub fn set_shipping_address(&mut self, address: ShippingAddress) {
        self.cart.set_shipping_address(Some(address));
    }

    pub fn select_shipping_rate(&mut self, rate: ShippingRate) {
        self.cart.set_selected_rate(Some(rate));
    }

    pub fn clear_shipping_rate(&mut self) {
        self.cart.set_selected_rate(None);
    }

    /// Binds the cart to a signed-in identity, merging the anonymous items
    /// into the identity's stored cart.
    ///
    /// Quantities of lines with the same catalog id are summed; other lines
    /// are appended after the stored ones. Calling again with the same
    /// identity before `unbind_identity` changes nothing. If the stored cart
    /// cannot be loaded the cart stays anonymous and untouched, so a retry
    /// can still merge.
    #[tracing::instrument(skip(self), fields(identity = %identity))]
    pub async fn bind_identity(&mut self, identity: IdentityId) -> Result<BindOutcome> {
        if self.last_merged.as_ref() == Some(&identity) {
            return Ok(BindOutcome::AlreadyMerged);
        }
        if let Some(current) = self.cart.owner() {
            return Err(CartError::AlreadyBound {
                current: current.clone(),
                requested: identity,
            });
        }

        let stored = self.store.load(&identity).await?;

        let outcome = match stored {
            None => BindOutcome::Adopted,
            Some(stored_items) => {
                // Stored lines are re-merged so empty or repeated entries
                // written elsewhere never enter the cart.
                let guest = std::mem::take(self.cart.items_mut());
                for item in stored_items {
                    if item.quantity == 0 {
                        tracing::warn!(
                            catalog_item_id = %item.catalog_item_id,
                            "Dropping stored line with zero quantity"
                        );
                        continue;
                    }
                    let quantity = item.quantity;
                    self.cart.merge_line(item, quantity);
                }
                let stored_lines = self.cart.items().len();
                for item in guest {
                    let quantity = item.quantity;
                    self.cart.merge_line(item, quantity);
                }
                BindOutcome::Merged { stored_lines }
            }
        };

        self.cart.set_owner(Some(identity.clone()));
        self.last_merged = Some(identity);
        self.persist_if_owned();

        tracing::info!(?outcome, lines = self.cart.items().len(), "Cart bound to identity");
        Ok(outcome)
    }

    /// Signs the cart out. The session continues with an empty anonymous
    /// cart; the items stay only in the prior identity's stored cart.
    pub fn unbind_identity(&mut self) -> Option<IdentityId> {
        let previous = self.cart.owner().cloned();
        self.cart = Cart::default();
        self.last_merged = None;
        previous
    }

    /// Waits for queued persistence writes.
    pub async fn flush(&self) {
        self.persister.flush().await;
    }

    fn persist_if_owned(&self) {
        if let Some(owner) = self.cart.owner() {
            self.persister
                .persist(owner.clone(), self.cart.items().to_vec());
        }
    }
}
