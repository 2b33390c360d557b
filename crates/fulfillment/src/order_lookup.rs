//! Cached reads of distributor orders.

use std::sync::Arc;

use chrono::Duration;
use common::{InMemoryTtlStore, PoNumber, TtlStore};
use gateway::{DistributorApi, ExternalOrderRecord, Result};

/// Default time a fetched order is served from the cache.
pub const DEFAULT_CACHE_TTL_SECS: i64 = 60;

/// Looks up distributor orders by poNumber through a short-lived cache.
///
/// The distributor owns order state; a cached record can be up to one TTL
/// stale.
pub struct OrderLookup<D> {
    distributor: D,
    cache: Arc<dyn TtlStore<ExternalOrderRecord>>,
    ttl: Duration,
}

impl<D: DistributorApi> OrderLookup<D> {
    pub fn new(distributor: D) -> Self {
        Self {
            distributor,
            cache: Arc::new(InMemoryTtlStore::new()),
            ttl: Duration::seconds(DEFAULT_CACHE_TTL_SECS),
        }
    }

    pub fn with_cache(mut self, cache: Arc<dyn TtlStore<ExternalOrderRecord>>, ttl: Duration) -> Self {
        self.cache = cache;
        self.ttl = ttl;
        self
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_order(&self, po_number: &PoNumber) -> Result<ExternalOrderRecord> {
        if let Some(record) = self.cache.get(po_number.as_str()).await {
            tracing::debug!("Order served from cache");
            return Ok(record);
        }

        let record = self.distributor.get_order(po_number).await?;
        self.cache
            .set(po_number.as_str(), record.clone(), self.ttl)
            .await;
        Ok(record)
    }

    /// Drops the cached copy so the next lookup hits the distributor.
    pub async fn invalidate(&self, po_number: &PoNumber) {
        self.cache.remove(po_number.as_str()).await;
    }
}
