//! Where owned carts are persisted.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use common::IdentityId;
use gateway::{IdentityProvider, METADATA_CART};
use serde_json::{Map, Value};

use crate::error::{CartError, Result};
use crate::item::CartItem;

/// Persistent storage of the item list of an identity's cart.
#[async_trait]
pub trait CartStore: Send + Sync {
    /// Loads the stored items. `None` means the identity never had a cart.
    async fn load(&self, identity: &IdentityId) -> Result<Option<Vec<CartItem>>>;

    /// Replaces the stored items.
    async fn save(&self, identity: &IdentityId, items: &[CartItem]) -> Result<()>;
}

#[async_trait]
impl<T: CartStore + ?Sized> CartStore for Arc<T> {
    async fn load(&self, identity: &IdentityId) -> Result<Option<Vec<CartItem>>> {
        (**self).load(identity).await
    }

    async fn save(&self, identity: &IdentityId, items: &[CartItem]) -> Result<()> {
        (**self).save(identity, items).await
    }
}

/// Keeps carts in the identity provider's user metadata under `cart`.
#[derive(Debug, Clone)]
pub struct IdentityCartStore<P> {
    provider: P,
}

impl<P: IdentityProvider> IdentityCartStore<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl<P: IdentityProvider> CartStore for IdentityCartStore<P> {
    async fn load(&self, identity: &IdentityId) -> Result<Option<Vec<CartItem>>> {
        let user = self.provider.get_user(identity).await?;
        match user.metadata.get(METADATA_CART) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => serde_json::from_value(value.clone())
                .map(Some)
                .map_err(|e| CartError::Corrupt(e.to_string())),
        }
    }

    async fn save(&self, identity: &IdentityId, items: &[CartItem]) -> Result<()> {
        let value =
            serde_json::to_value(items).map_err(|e| CartError::Corrupt(e.to_string()))?;
        let mut patch = Map::new();
        patch.insert(METADATA_CART.to_string(), value);
        self.provider.update_user_metadata(identity, patch).await?;
        Ok(())
    }
}

#[derive(Debug, Default)]
struct InMemoryCartState {
    carts: HashMap<IdentityId, Vec<CartItem>>,
    saves: usize,
    fail_on_load: bool,
    fail_on_save: bool,
}

/// In-memory cart store for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCartStore {
    state: Arc<RwLock<InMemoryCartState>>,
}

impl InMemoryCartStore {
    /// Creates a new in-memory cart store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a stored cart.
    pub fn insert(&self, identity: &IdentityId, items: Vec<CartItem>) {
        self.state
            .write()
            .unwrap()
            .carts
            .insert(identity.clone(), items);
    }

    /// Returns the stored cart of an identity.
    pub fn stored(&self, identity: &IdentityId) -> Option<Vec<CartItem>> {
        self.state.read().unwrap().carts.get(identity).cloned()
    }

    /// Returns the number of save calls, failed ones included.
    pub fn save_count(&self) -> usize {
        self.state.read().unwrap().saves
    }

    /// Configures load to fail.
    pub fn set_fail_on_load(&self, fail: bool) {
        self.state.write().unwrap().fail_on_load = fail;
    }

    /// Configures save to fail.
    pub fn set_fail_on_save(&self, fail: bool) {
        self.state.write().unwrap().fail_on_save = fail;
    }
}

#[async_trait]
impl CartStore for InMemoryCartStore {
    async fn load(&self, identity: &IdentityId) -> Result<Option<Vec<CartItem>>> {
        let state = self.state.read().unwrap();
        if state.fail_on_load {
            return Err(CartError::Corrupt("load failed".to_string()));
        }
        Ok(state.carts.get(identity).cloned())
    }

    async fn save(&self, identity: &IdentityId, items: &[CartItem]) -> Result<()> {
        let mut state = self.state.write().unwrap();
        state.saves += 1;
        if state.fail_on_save {
            return Err(CartError::Corrupt("save failed".to_string()));
        }
        state.carts.insert(identity.clone(), items.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::Money;
    use gateway::InMemoryIdentityProvider;
    use serde_json::json;

    #[tokio::test]
    async fn test_identity_store_roundtrip_keeps_other_metadata() {
        let provider = InMemoryIdentityProvider::new();
        let id = IdentityId::new("user_1");
        provider.set_metadata(&id, "orderNumbers", json!(["WEB-1"]));
        let store = IdentityCartStore::new(provider.clone());

        assert_eq!(store.load(&id).await.unwrap(), None);

        let items = vec![CartItem::new("7", "SKU-7", "Lamp", Money::from_cents(1500)).with_quantity(2)];
        store.save(&id, &items).await.unwrap();

        assert_eq!(store.load(&id).await.unwrap(), Some(items));
        assert_eq!(provider.metadata(&id, "orderNumbers"), Some(json!(["WEB-1"])));
    }

    #[tokio::test]
    async fn test_identity_store_rejects_corrupt_cart() {
        let provider = InMemoryIdentityProvider::new();
        let id = IdentityId::new("user_1");
        provider.set_metadata(&id, METADATA_CART, json!("not a list"));
        let store = IdentityCartStore::new(provider);

        assert!(matches!(
            store.load(&id).await,
            Err(CartError::Corrupt(_))
        ));
    }

    #[tokio::test]
    async fn test_identity_store_surfaces_provider_failure() {
        let provider = InMemoryIdentityProvider::new();
        provider.set_fail_on_get(true);
        let store = IdentityCartStore::new(provider);

        assert!(matches!(
            store.load(&IdentityId::new("user_1")).await,
            Err(CartError::Store(_))
        ));
    }
}
