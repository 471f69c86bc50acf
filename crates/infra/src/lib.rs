//! Infrastructure layer: document persistence, collection cache, rule lookup.

pub mod cache;
pub mod document_store;
pub mod repositories;
pub mod rule_store;

pub use cache::{CollectionCache, Clock, SystemClock};
pub use document_store::{DocumentStore, InMemoryDocumentStore, PostgresDocumentStore, StoreError};
pub use repositories::{Repositories, Repository, RepositoryError};
pub use rule_store::{DocumentRuleSource, RuleSource, RuleStoreError};
