//! JSON document persistence boundary.
//!
//! Documents are open JSON objects grouped in named collections and keyed by a
//! string id. Writes are per-document upserts; there are no transactions.

pub mod in_memory;
pub mod postgres;
pub mod r#trait;

pub use in_memory::InMemoryDocumentStore;
pub use postgres::PostgresDocumentStore;
pub use r#trait::{DocumentStore, StoreError};
