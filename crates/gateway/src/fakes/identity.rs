//! In-memory identity provider.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use common::IdentityId;
use serde_json::{Map, Value};

use crate::error::{GatewayError, Result, Service};
use crate::identity::{IdentityProvider, UserRecord};

#[derive(Debug, Default)]
struct InMemoryIdentityState {
    users: HashMap<String, Map<String, Value>>,
    tokens: HashMap<String, IdentityId>,
    get_calls: usize,
    update_calls: usize,
    fail_on_get: bool,
    fail_on_update: bool,
}

/// In-memory identity provider for testing.
///
/// Users spring into existence with empty metadata on first access.
#[derive(Debug, Clone, Default)]
pub struct InMemoryIdentityProvider {
    state: Arc<RwLock<InMemoryIdentityState>>,
}

impl InMemoryIdentityProvider {
    /// Creates a new in-memory identity provider.
    pub fn new() -> Self {
        Self::default()
    }

    /// Issues an access token that authenticates as `id`.
    pub fn issue_token(&self, id: &IdentityId) -> String {
        let token = format!("tok_{}", uuid::Uuid::new_v4().simple());
        self.state
            .write()
            .unwrap()
            .tokens
            .insert(token.clone(), id.clone());
        token
    }

    /// Replaces one metadata key of a user directly.
    pub fn set_metadata(&self, id: &IdentityId, key: &str, value: Value) {
        self.state
            .write()
            .unwrap()
            .users
            .entry(id.as_str().to_string())
            .or_default()
            .insert(key.to_string(), value);
    }

    /// Returns one metadata key of a user.
    pub fn metadata(&self, id: &IdentityId, key: &str) -> Option<Value> {
        self.state
            .read()
            .unwrap()
            .users
            .get(id.as_str())
            .and_then(|m| m.get(key).cloned())
    }

    /// Configures get_user to fail.
    pub fn set_fail_on_get(&self, fail: bool) {
        self.state.write().unwrap().fail_on_get = fail;
    }

    /// Configures update_user_metadata to fail.
    pub fn set_fail_on_update(&self, fail: bool) {
        self.state.write().unwrap().fail_on_update = fail;
    }

    /// Returns the number of get_user calls.
    pub fn get_count(&self) -> usize {
        self.state.read().unwrap().get_calls
    }

    /// Returns the number of update_user_metadata calls.
    pub fn update_count(&self) -> usize {
        self.state.read().unwrap().update_calls
    }
}

#[async_trait]
impl IdentityProvider for InMemoryIdentityProvider {
    async fn authenticate(&self, access_token: &str) -> Result<IdentityId> {
        self.state
            .read()
            .unwrap()
            .tokens
            .get(access_token)
            .cloned()
            .ok_or_else(|| GatewayError::http(Service::Identity, 401, "invalid access token"))
    }

    async fn get_user(&self, id: &IdentityId) -> Result<UserRecord> {
        let mut state = self.state.write().unwrap();
        state.get_calls += 1;

        if state.fail_on_get {
            return Err(GatewayError::http(Service::Identity, 500, "lookup failed"));
        }

        Ok(UserRecord {
            id: id.as_str().to_string(),
            metadata: state.users.get(id.as_str()).cloned().unwrap_or_default(),
        })
    }

    async fn update_user_metadata(&self, id: &IdentityId, patch: Map<String, Value>) -> Result<()> {
        let mut state = self.state.write().unwrap();
        state.update_calls += 1;

        if state.fail_on_update {
            return Err(GatewayError::http(Service::Identity, 500, "update failed"));
        }

        let metadata = state.users.entry(id.as_str().to_string()).or_default();
        for (key, value) in patch {
            metadata.insert(key, value);
        }
        Ok(())
    }
}
