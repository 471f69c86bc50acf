use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use serde_json::Value;

use super::r#trait::{DocumentStore, StoreError};

/// In-memory document store.
///
/// Intended for tests/dev. Collections are ordered maps so listings are
/// deterministic.
#[derive(Debug, Default)]
pub struct InMemoryDocumentStore {
    collections: RwLock<HashMap<String, BTreeMap<String, Value>>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned() -> StoreError {
    StoreError::Backend("in-memory store lock poisoned".to_string())
}

#[async_trait::async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, StoreError> {
        let map = self.collections.read().map_err(|_| poisoned())?;
        Ok(map.get(collection).and_then(|c| c.get(id)).cloned())
    }

    async fn put(&self, collection: &str, id: &str, document: Value) -> Result<(), StoreError> {
        let mut map = self.collections.write().map_err(|_| poisoned())?;
        map.entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), document);
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<bool, StoreError> {
        let mut map = self.collections.write().map_err(|_| poisoned())?;
        Ok(map
            .get_mut(collection)
            .and_then(|c| c.remove(id))
            .is_some())
    }

    async fn list(&self, collection: &str) -> Result<Vec<Value>, StoreError> {
        let map = self.collections.read().map_err(|_| poisoned())?;
        Ok(map
            .get(collection)
            .map(|c| c.values().cloned().collect())
            .unwrap_or_default())
    }
}
