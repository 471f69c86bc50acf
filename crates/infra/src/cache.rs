//! Process-local cache of whole document collections.
//!
//! A collection is either fully loaded or absent. Writers touch single entries
//! (upsert/remove by id) of an already-loaded collection; only a full load
//! replaces a collection wholesale. An optional TTL bounds how long changes
//! made by other processes stay invisible.

use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use aula_core::Entity;

/// Time source, injectable for tests.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug)]
struct CachedCollection {
    loaded_at: DateTime<Utc>,
    entries: BTreeMap<String, Value>,
}

pub struct CollectionCache {
    collections: RwLock<HashMap<String, CachedCollection>>,
    clock: Box<dyn Clock>,
    ttl: Option<Duration>,
}

impl core::fmt::Debug for CollectionCache {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CollectionCache").field("ttl", &self.ttl).finish_non_exhaustive()
    }
}

impl Default for CollectionCache {
    fn default() -> Self {
        Self::new(SystemClock, None)
    }
}

impl CollectionCache {
    pub fn new(clock: impl Clock + 'static, ttl: Option<Duration>) -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
            clock: Box::new(clock),
            ttl,
        }
    }

    fn is_fresh(&self, cached: &CachedCollection) -> bool {
        match self.ttl {
            Some(ttl) => self.clock.now() - cached.loaded_at < ttl,
            None => true,
        }
    }

    /// Cached documents of `T`'s collection, or `None` on miss/expiry.
    ///
    /// A document that no longer deserializes as `T` counts as a miss so the
    /// caller reloads from the store.
    pub fn get<T: Entity + DeserializeOwned>(&self) -> Option<Vec<T>> {
        let map = self.collections.read().ok()?;
        let cached = map.get(T::COLLECTION)?;
        if !self.is_fresh(cached) {
            tracing::debug!(collection = T::COLLECTION, "cached collection expired");
            return None;
        }

        let mut out = Vec::with_capacity(cached.entries.len());
        for (id, value) in &cached.entries {
            match serde_json::from_value(value.clone()) {
                Ok(item) => out.push(item),
                Err(e) => {
                    tracing::warn!(collection = T::COLLECTION, id = %id, error = %e, "cached document no longer decodes");
                    return None;
                }
            }
        }
        Some(out)
    }

    /// Replace `T`'s whole collection.
    pub fn set<T: Entity + Serialize>(&self, items: &[T]) {
        let mut entries = BTreeMap::new();
        for item in items {
            match serde_json::to_value(item) {
                Ok(value) => {
                    entries.insert(item.document_id(), value);
                }
                Err(e) => {
                    tracing::warn!(collection = T::COLLECTION, error = %e, "not caching collection");
                    self.invalidate(T::COLLECTION);
                    return;
                }
            }
        }

        if let Ok(mut map) = self.collections.write() {
            map.insert(
                T::COLLECTION.to_string(),
                CachedCollection {
                    loaded_at: self.clock.now(),
                    entries,
                },
            );
        }
    }

    /// Insert or replace one entry of a loaded collection.
    ///
    /// No-op when the collection is not loaded: a partial collection would
    /// otherwise be served as if it were complete.
    pub fn upsert<T: Entity + Serialize>(&self, item: &T) {
        let value = match serde_json::to_value(item) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(collection = T::COLLECTION, error = %e, "dropping cached collection");
                self.invalidate(T::COLLECTION);
                return;
            }
        };

        if let Ok(mut map) = self.collections.write() {
            if let Some(cached) = map.get_mut(T::COLLECTION) {
                cached.entries.insert(item.document_id(), value);
            }
        }
    }

    pub fn remove(&self, collection: &str, id: &str) {
        if let Ok(mut map) = self.collections.write() {
            if let Some(cached) = map.get_mut(collection) {
                cached.entries.remove(id);
            }
        }
    }

    pub fn invalidate(&self, collection: &str) {
        if let Ok(mut map) = self.collections.write() {
            map.remove(collection);
        }
    }

    pub fn is_loaded(&self, collection: &str) -> bool {
        self.collections
            .read()
            .map(|map| map.contains_key(collection))
            .unwrap_or(false)
    }
}
