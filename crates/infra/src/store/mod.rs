//! Entity store: typed, filter-based persistent collections.
//!
//! One capability trait, implemented once per backing technology:
//! - [`InMemoryEntityStore`] for tests/dev
//! - [`PostgresEntityStore`] for persistent deployments (JSONB documents)
//!
//! Stores hit their backend on every call; there is no caching layer.

pub mod filter;
pub mod in_memory;
pub mod postgres;

use async_trait::async_trait;
use futures::future::join_all;
use std::sync::Arc;
use thiserror::Error;

use videopalace_core::{DomainError, Entity};

pub use filter::{Filter, FilterValue};
pub use in_memory::InMemoryEntityStore;
pub use postgres::PostgresEntityStore;

#[derive(Debug, Error)]
pub enum StoreError {
    /// An absent/invalid entity was passed to a write. Never retried.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    /// The backing store failed (connection, query, lock poisoning).
    #[error("store backend error: {0}")]
    Backend(String),
}

impl From<DomainError> for StoreError {
    fn from(value: DomainError) -> Self {
        StoreError::InvalidArgument(value.to_string())
    }
}

/// Typed collection of entities, keyed by the entity's identity.
///
/// ## Caveats
///
/// - `create` does **not** check for an existing entity with the same id; uniqueness of
///   anything other than the backend's own primary key is the caller's business.
/// - `find` returns *a* match when several entities satisfy the filter; which one is
///   unspecified.
/// - There are no multi-entity transactions; `bulk_create` can partially succeed.
#[async_trait]
pub trait EntityStore<T>: Send + Sync
where
    T: Entity + Clone + Send + Sync + 'static,
{
    /// Full scan. Order is not meaningful.
    async fn get_all(&self) -> Result<Vec<T>, StoreError>;

    /// Filtered scan.
    async fn get_all_matching(&self, filter: &Filter) -> Result<Vec<T>, StoreError>;

    /// Lookup by identity. Absent is `Ok(None)`, never an error.
    async fn get(&self, id: T::Id) -> Result<Option<T>, StoreError>;

    /// First entity matching `filter` (tie-break unspecified).
    async fn find(&self, filter: &Filter) -> Result<Option<T>, StoreError>;

    /// Insert unconditionally. Rejects absent/invalid entities with `InvalidArgument`.
    async fn create(&self, entity: T) -> Result<(), StoreError>;

    /// Full replace keyed by identity; a missing entity is left missing.
    async fn update(&self, entity: T) -> Result<(), StoreError>;

    /// Remove if present; absent is not an error.
    async fn delete(&self, id: T::Id) -> Result<(), StoreError>;

    /// Create every entity concurrently.
    ///
    /// Succeeds only if every create succeeds. Entities created before a failure stay
    /// persisted (no rollback); the first failure in input order is returned.
    async fn bulk_create(&self, entities: Vec<T>) -> Result<(), StoreError> {
        let results = join_all(entities.into_iter().map(|e| self.create(e))).await;
        results.into_iter().collect::<Result<Vec<()>, _>>().map(|_| ())
    }

    async fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.get_all().await?.is_empty())
    }
}

#[async_trait]
impl<T, S> EntityStore<T> for Arc<S>
where
    T: Entity + Clone + Send + Sync + 'static,
    S: EntityStore<T> + ?Sized,
{
    async fn get_all(&self) -> Result<Vec<T>, StoreError> {
        (**self).get_all().await
    }

    async fn get_all_matching(&self, filter: &Filter) -> Result<Vec<T>, StoreError> {
        (**self).get_all_matching(filter).await
    }

    async fn get(&self, id: T::Id) -> Result<Option<T>, StoreError> {
        (**self).get(id).await
    }

    async fn find(&self, filter: &Filter) -> Result<Option<T>, StoreError> {
        (**self).find(filter).await
    }

    async fn create(&self, entity: T) -> Result<(), StoreError> {
        (**self).create(entity).await
    }

    async fn update(&self, entity: T) -> Result<(), StoreError> {
        (**self).update(entity).await
    }

    async fn delete(&self, id: T::Id) -> Result<(), StoreError> {
        (**self).delete(id).await
    }

    async fn bulk_create(&self, entities: Vec<T>) -> Result<(), StoreError> {
        (**self).bulk_create(entities).await
    }

    async fn is_empty(&self) -> Result<bool, StoreError> {
        (**self).is_empty().await
    }
}
