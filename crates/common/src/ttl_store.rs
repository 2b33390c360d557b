//! Key/value store with explicit time-to-live eviction.
//!
//! Stands in for process-global lookup tables (session carts, idempotency
//! records, issued poNumbers, cached distributor orders). Expiry is checked
//! against an injected [`Clock`], never against process lifetime.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use crate::clock::{SharedClock, SystemClock};

/// Key/value store whose entries expire.
#[async_trait]
pub trait TtlStore<V>: Send + Sync
where
    V: Clone + Send + Sync + 'static,
{
    /// Returns the live value for `key`, if any.
    async fn get(&self, key: &str) -> Option<V>;

    /// Inserts or replaces `key`, expiring `ttl` from now.
    async fn set(&self, key: &str, value: V, ttl: Duration);

    /// Inserts `key` only if no live entry exists. Returns true if inserted.
    async fn set_if_absent(&self, key: &str, value: V, ttl: Duration) -> bool;

    /// Removes `key`, returning its live value.
    async fn remove(&self, key: &str) -> Option<V>;

    /// Drops every expired entry. Returns how many were dropped.
    async fn purge_expired(&self) -> usize;
}

struct Slot<V> {
    key: String,
    value: V,
    expires_at: DateTime<Utc>,
}

struct Arena<V> {
    slots: Vec<Option<Slot<V>>>,
    free: Vec<usize>,
    index: HashMap<String, usize>,
}

impl<V> Default for Arena<V> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl<V> Arena<V> {
    fn live(&self, key: &str, now: DateTime<Utc>) -> Option<&Slot<V>> {
        let idx = *self.index.get(key)?;
        self.slots[idx].as_ref().filter(|slot| slot.expires_at > now)
    }

    fn insert(&mut self, key: &str, value: V, expires_at: DateTime<Utc>) {
        let slot = Slot {
            key: key.to_string(),
            value,
            expires_at,
        };
        if let Some(&idx) = self.index.get(key) {
            self.slots[idx] = Some(slot);
            return;
        }
        let idx = match self.free.pop() {
            Some(idx) => {
                self.slots[idx] = Some(slot);
                idx
            }
            None => {
                self.slots.push(Some(slot));
                self.slots.len() - 1
            }
        };
        self.index.insert(key.to_string(), idx);
    }

    fn take(&mut self, key: &str) -> Option<Slot<V>> {
        let idx = self.index.remove(key)?;
        self.free.push(idx);
        self.slots[idx].take()
    }
}

/// Slot-arena implementation of [`TtlStore`].
///
/// Entries live in a `Vec` of slots with a free list for reuse; a key index
/// maps keys to slots. Expired entries are invisible to reads and reclaimed
/// by [`TtlStore::purge_expired`] or when their key is written again.
#[derive(Clone)]
pub struct InMemoryTtlStore<V> {
    arena: Arc<Mutex<Arena<V>>>,
    clock: SharedClock,
}

impl<V> InMemoryTtlStore<V> {
    /// Creates an empty store on the system clock.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Creates an empty store on the given clock.
    pub fn with_clock(clock: SharedClock) -> Self {
        Self {
            arena: Arc::new(Mutex::new(Arena::default())),
            clock,
        }
    }

    /// Number of occupied slots, including expired entries not yet purged.
    pub fn occupied(&self) -> usize {
        self.arena.lock().unwrap().index.len()
    }

    /// Number of allocated slots, free or occupied.
    pub fn capacity(&self) -> usize {
        self.arena.lock().unwrap().slots.len()
    }
}

impl<V> Default for InMemoryTtlStore<V> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<V> TtlStore<V> for InMemoryTtlStore<V>
where
    V: Clone + Send + Sync + 'static,
{
    async fn get(&self, key: &str) -> Option<V> {
        let now = self.clock.now();
        let arena = self.arena.lock().unwrap();
        arena.live(key, now).map(|slot| slot.value.clone())
    }

    async fn set(&self, key: &str, value: V, ttl: Duration) {
        let expires_at = self.clock.now() + ttl;
        self.arena.lock().unwrap().insert(key, value, expires_at);
    }

    async fn set_if_absent(&self, key: &str, value: V, ttl: Duration) -> bool {
        let now = self.clock.now();
        let mut arena = self.arena.lock().unwrap();
        if arena.live(key, now).is_some() {
            return false;
        }
        arena.insert(key, value, now + ttl);
        true
    }

    async fn remove(&self, key: &str) -> Option<V> {
        let now = self.clock.now();
        let mut arena = self.arena.lock().unwrap();
        arena
            .take(key)
            .filter(|slot| slot.expires_at > now)
            .map(|slot| slot.value)
    }

    async fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let mut arena = self.arena.lock().unwrap();
        let expired: Vec<String> = arena
            .slots
            .iter()
            .flatten()
            .filter(|slot| slot.expires_at <= now)
            .map(|slot| slot.key.clone())
            .collect();
        for key in &expired {
            arena.take(key);
        }
        expired.len()
    }
}
