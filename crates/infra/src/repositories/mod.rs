//! Typed, cache-aware access to document collections.
//!
//! Reads go to the [`CollectionCache`] first and fall back to a full load from
//! the [`DocumentStore`]. Writes go to the store, then update the single
//! affected cache entry.

mod catalog;
mod messaging;
mod roles;
mod users;

use std::marker::PhantomData;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

use aula_auth::{Role, UserAccount};
use aula_catalog::{Course, Ebook, Section};
use aula_core::Entity;
use aula_messaging::{Message, Tag};

use crate::cache::CollectionCache;
use crate::document_store::{DocumentStore, StoreError};

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("failed to decode '{collection}' document: {message}")]
    Decode { collection: &'static str, message: String },

    #[error("failed to encode '{collection}' document: {message}")]
    Encode { collection: &'static str, message: String },
}

/// Repository over one entity type.
pub struct Repository<T> {
    store: Arc<dyn DocumentStore>,
    cache: Arc<CollectionCache>,
    _entity: PhantomData<fn() -> T>,
}

impl<T> Clone for Repository<T> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            cache: self.cache.clone(),
            _entity: PhantomData,
        }
    }
}

impl<T> Repository<T>
where
    T: Entity + Serialize + DeserializeOwned + Clone + Send + Sync,
{
    pub fn new(store: Arc<dyn DocumentStore>, cache: Arc<CollectionCache>) -> Self {
        Self {
            store,
            cache,
            _entity: PhantomData,
        }
    }

    /// Every document of the collection (cache first).
    pub async fn all(&self) -> Result<Vec<T>, RepositoryError> {
        if let Some(items) = self.cache.get::<T>() {
            return Ok(items);
        }

        let docs = self.store.list(T::COLLECTION).await?;
        let items = docs
            .into_iter()
            .map(|doc| {
                serde_json::from_value::<T>(doc).map_err(|e| RepositoryError::Decode {
                    collection: T::COLLECTION,
                    message: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        self.cache.set(&items);
        tracing::debug!(collection = T::COLLECTION, count = items.len(), "collection loaded into cache");
        Ok(items)
    }

    pub async fn get(&self, id: &T::Id) -> Result<Option<T>, RepositoryError> {
        let key = id.to_string();
        if let Some(items) = self.cache.get::<T>() {
            return Ok(items.into_iter().find(|item| item.document_id() == key));
        }

        match self.store.get(T::COLLECTION, &key).await? {
            Some(doc) => serde_json::from_value(doc)
                .map(Some)
                .map_err(|e| RepositoryError::Decode {
                    collection: T::COLLECTION,
                    message: e.to_string(),
                }),
            None => Ok(None),
        }
    }

    pub async fn find<F>(&self, predicate: F) -> Result<Option<T>, RepositoryError>
    where
        F: Fn(&T) -> bool + Send,
    {
        Ok(self.all().await?.into_iter().find(|item| predicate(item)))
    }

    pub async fn filter<F>(&self, predicate: F) -> Result<Vec<T>, RepositoryError>
    where
        F: Fn(&T) -> bool + Send,
    {
        Ok(self
            .all()
            .await?
            .into_iter()
            .filter(|item| predicate(item))
            .collect())
    }

    /// Upsert the document, then its cache entry.
    pub async fn save(&self, item: &T) -> Result<(), RepositoryError> {
        let doc = serde_json::to_value(item).map_err(|e| RepositoryError::Encode {
            collection: T::COLLECTION,
            message: e.to_string(),
        })?;
        self.store.put(T::COLLECTION, &item.document_id(), doc).await?;
        self.cache.upsert(item);
        Ok(())
    }

    /// Returns `false` if nothing was stored under `id`.
    pub async fn delete(&self, id: &T::Id) -> Result<bool, RepositoryError> {
        let key = id.to_string();
        let existed = self.store.delete(T::COLLECTION, &key).await?;
        self.cache.remove(T::COLLECTION, &key);
        Ok(existed)
    }
}

/// All repositories of the application, sharing one store and one cache.
#[derive(Clone)]
pub struct Repositories {
    pub users: Repository<UserAccount>,
    pub roles: Repository<Role>,
    pub messages: Repository<Message>,
    pub tags: Repository<Tag>,
    pub courses: Repository<Course>,
    pub ebooks: Repository<Ebook>,
    pub sections: Repository<Section>,
}

impl Repositories {
    pub fn new(store: Arc<dyn DocumentStore>, cache: Arc<CollectionCache>) -> Self {
        Self {
            users: Repository::new(store.clone(), cache.clone()),
            roles: Repository::new(store.clone(), cache.clone()),
            messages: Repository::new(store.clone(), cache.clone()),
            tags: Repository::new(store.clone(), cache.clone()),
            courses: Repository::new(store.clone(), cache.clone()),
            ebooks: Repository::new(store.clone(), cache.clone()),
            sections: Repository::new(store, cache),
        }
    }
}
