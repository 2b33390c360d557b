//! Per-event idempotency records for webhook processing.

use std::sync::Arc;

use chrono::Duration;
use common::{InMemoryTtlStore, PoNumber, TtlStore};
use serde::{Deserialize, Serialize};

/// What is known about a webhook event id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "po_number", rename_all = "snake_case")]
pub enum EventRecord {
    /// A delivery claimed the event and may be talking to the distributor.
    InFlight,
    /// The order for this event exists under the given poNumber.
    Completed(PoNumber),
}

/// Result of claiming an event id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Claim {
    /// This delivery owns the event and must create the order.
    Acquired,
    InFlight,
    Completed(PoNumber),
}

/// Claims webhook event ids before any external side effect.
///
/// The record is written before the distributor call, so a redelivery that
/// arrives after the order was created finds `Completed` and never creates a
/// second order. Durability is whatever the injected store provides.
///
/// An `InFlight` claim is a lease: it expires after `lease` so that a claim
/// left behind by a process that died mid-call can be taken over by the next
/// redelivery. `Completed` records are kept for the full `ttl`.
#[derive(Clone)]
pub struct EventLedger {
    store: Arc<dyn TtlStore<EventRecord>>,
    lease: Duration,
    ttl: Duration,
}

impl EventLedger {
    pub fn new(store: Arc<dyn TtlStore<EventRecord>>, lease: Duration, ttl: Duration) -> Self {
        Self { store, lease, ttl }
    }

    pub fn in_memory(lease: Duration, ttl: Duration) -> Self {
        Self::new(Arc::new(InMemoryTtlStore::new()), lease, ttl)
    }

    /// Claims `event_id` for this delivery.
    pub async fn claim(&self, event_id: &str) -> Claim {
        // A release can land between the failed insert and the read; retry
        // the insert once in that case.
        for _ in 0..2 {
            if self
                .store
                .set_if_absent(event_id, EventRecord::InFlight, self.lease)
                .await
            {
                return Claim::Acquired;
            }
            match self.store.get(event_id).await {
                Some(EventRecord::InFlight) => return Claim::InFlight,
                Some(EventRecord::Completed(po_number)) => return Claim::Completed(po_number),
                None => continue,
            }
        }
        Claim::InFlight
    }

    /// Marks the event as done under `po_number`.
    pub async fn complete(&self, event_id: &str, po_number: &PoNumber) {
        self.store
            .set(event_id, EventRecord::Completed(po_number.clone()), self.ttl)
            .await;
    }

    /// Drops an in-flight claim so a later delivery can retry.
    pub async fn release(&self, event_id: &str) {
        self.store.remove(event_id).await;
    }

    pub async fn record(&self, event_id: &str) -> Option<EventRecord> {
        self.store.get(event_id).await
    }
}
