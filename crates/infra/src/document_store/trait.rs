use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("storage backend error: {0}")]
    Backend(String),

    #[error("document is not valid JSON for its collection: {0}")]
    Corrupt(String),
}

/// Collection-oriented document store.
///
/// Implementations must make single-document writes atomic; nothing else is
/// guaranteed across calls.
#[async_trait::async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, StoreError>;

    /// Insert or replace a document.
    async fn put(&self, collection: &str, id: &str, document: Value) -> Result<(), StoreError>;

    /// Returns `false` if the document did not exist.
    async fn delete(&self, collection: &str, id: &str) -> Result<bool, StoreError>;

    /// All documents of a collection, ordered by id.
    async fn list(&self, collection: &str) -> Result<Vec<Value>, StoreError>;

    /// Documents whose top-level `field` equals `value`.
    async fn find_by(&self, collection: &str, field: &str, value: &Value) -> Result<Vec<Value>, StoreError> {
        let docs = self.list(collection).await?;
        Ok(docs.into_iter().filter(|d| d.get(field) == Some(value)).collect())
    }
}

#[async_trait::async_trait]
impl<S> DocumentStore for Arc<S>
where
    S: DocumentStore + ?Sized,
{
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, StoreError> {
        (**self).get(collection, id).await
    }

    async fn put(&self, collection: &str, id: &str, document: Value) -> Result<(), StoreError> {
        (**self).put(collection, id, document).await
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<bool, StoreError> {
        (**self).delete(collection, id).await
    }

    async fn list(&self, collection: &str) -> Result<Vec<Value>, StoreError> {
        (**self).list(collection).await
    }

    async fn find_by(&self, collection: &str, field: &str, value: &Value) -> Result<Vec<Value>, StoreError> {
        (**self).find_by(collection, field, value).await
    }
}
