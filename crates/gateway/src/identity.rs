//! Identity provider contract.

use std::sync::Arc;

use async_trait::async_trait;
use common::IdentityId;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Result;

/// Metadata key holding the persisted cart item array.
pub const METADATA_CART: &str = "cart";

/// Metadata key holding the user's poNumbers.
pub const METADATA_ORDER_NUMBERS: &str = "orderNumbers";

/// A user's profile record as stored by the identity provider.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: String,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl UserRecord {
    /// The stored order numbers; malformed entries are skipped.
    pub fn order_numbers(&self) -> Vec<String> {
        self.metadata
            .get(METADATA_ORDER_NUMBERS)
            .and_then(Value::as_array)
            .map(|values| {
                values
                    .iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Operations against the identity provider.
///
/// `update_user_metadata` replaces the given top-level keys and leaves the
/// others untouched. It is read-modify-write on the provider side, not an
/// atomic merge of nested values.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Resolves an access token issued by the provider to the user it was
    /// issued for. An unknown or expired token is an HTTP 401 error.
    async fn authenticate(&self, access_token: &str) -> Result<IdentityId>;

    async fn get_user(&self, id: &IdentityId) -> Result<UserRecord>;

    async fn update_user_metadata(&self, id: &IdentityId, patch: Map<String, Value>) -> Result<()>;
}

#[async_trait]
impl<T: IdentityProvider + ?Sized> IdentityProvider for Arc<T> {
    async fn authenticate(&self, access_token: &str) -> Result<IdentityId> {
        (**self).authenticate(access_token).await
    }

    async fn get_user(&self, id: &IdentityId) -> Result<UserRecord> {
        (**self).get_user(id).await
    }

    async fn update_user_metadata(&self, id: &IdentityId, patch: Map<String, Value>) -> Result<()> {
        (**self).update_user_metadata(id, patch).await
    }
}
