//! Postgres-backed entity store.
//!
//! Each collection is one table holding the entity's serde JSON form:
//!
//! ```sql
//! CREATE TABLE <collection> (id UUID PRIMARY KEY, document JSONB NOT NULL)
//! ```
//!
//! Filters are translated to JSONB containment (`document @> $1`), so a
//! [`Filter`] behaves the same here as against the in-memory store.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError |
//! |------------|-----------------------|------------|
//! | `Database` | `23505` (unique violation) | `Backend` (duplicate id) |
//! | `Database` | other | `Backend` |
//! | `PoolClosed` / I/O | n/a | `Backend` |
//! | bad `document` | n/a | `Serialization` |

use std::marker::PhantomData;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use tracing::instrument;
use uuid::Uuid;

use videopalace_core::Entity;

use super::{EntityStore, Filter, StoreError};

/// Postgres-backed entity store for one collection.
///
/// ## Thread Safety
///
/// Wraps an SQLx connection pool, which is cheap to clone and safe to share. Each
/// operation is a single statement; there are no multi-row transactions.
pub struct PostgresEntityStore<T> {
    pool: PgPool,
    collection: String,
    _entity: PhantomData<fn() -> T>,
}

impl<T> Clone for PostgresEntityStore<T> {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
            collection: self.collection.clone(),
            _entity: PhantomData,
        }
    }
}

impl<T> std::fmt::Debug for PostgresEntityStore<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresEntityStore")
            .field("collection", &self.collection)
            .finish()
    }
}

impl<T> PostgresEntityStore<T> {
    /// Bind a store to `collection`. The name is spliced into SQL, so only
    /// `[a-z_][a-z0-9_]*` is accepted.
    pub fn new(pool: PgPool, collection: impl Into<String>) -> Result<Self, StoreError> {
        let collection = collection.into();
        if !is_valid_collection_name(&collection) {
            return Err(StoreError::InvalidArgument(format!(
                "invalid collection name: {collection:?}"
            )));
        }

        Ok(Self {
            pool,
            collection,
            _entity: PhantomData,
        })
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Create the collection table if it does not exist yet.
    ///
    /// Bootstrapping only; schema changes are not managed here.
    #[instrument(skip(self), fields(collection = %self.collection), err)]
    pub async fn ensure_collection(&self) -> Result<(), StoreError> {
        let sql = format!(
            "CREATE TABLE IF NOT EXISTS {} (id UUID PRIMARY KEY, document JSONB NOT NULL)",
            self.collection
        );
        sqlx::query(&sql)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("ensure_collection", e))?;
        Ok(())
    }
}

fn is_valid_collection_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_lowercase() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

fn decode<T: DeserializeOwned>(row: &sqlx::postgres::PgRow) -> Result<T, StoreError> {
    let Json(document): Json<JsonValue> = row
        .try_get("document")
        .map_err(|e| StoreError::Serialization(format!("failed to read document column: {e}")))?;
    serde_json::from_value(document)
        .map_err(|e| StoreError::Serialization(format!("failed to deserialize document: {e}")))
}

fn encode<T: Serialize>(entity: &T) -> Result<JsonValue, StoreError> {
    serde_json::to_value(entity).map_err(|e| StoreError::Serialization(e.to_string()))
}

#[async_trait]
impl<T> EntityStore<T> for PostgresEntityStore<T>
where
    T: Entity + Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    #[instrument(skip(self), fields(collection = %self.collection), err)]
    async fn get_all(&self) -> Result<Vec<T>, StoreError> {
        let sql = format!("SELECT document FROM {}", self.collection);
        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_all", e))?;
        rows.iter().map(decode).collect()
    }

    #[instrument(skip(self), fields(collection = %self.collection), err)]
    async fn get_all_matching(&self, filter: &Filter) -> Result<Vec<T>, StoreError> {
        let sql = format!("SELECT document FROM {} WHERE document @> $1", self.collection);
        let rows = sqlx::query(&sql)
            .bind(Json(filter.as_document()))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_all_matching", e))?;
        rows.iter().map(decode).collect()
    }

    #[instrument(skip(self), fields(collection = %self.collection, id = %id), err)]
    async fn get(&self, id: T::Id) -> Result<Option<T>, StoreError> {
        let sql = format!("SELECT document FROM {} WHERE id = $1", self.collection);
        let id: Uuid = id.into();
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("get", e))?;
        row.as_ref().map(decode).transpose()
    }

    #[instrument(skip(self), fields(collection = %self.collection), err)]
    async fn find(&self, filter: &Filter) -> Result<Option<T>, StoreError> {
        let sql = format!(
            "SELECT document FROM {} WHERE document @> $1 LIMIT 1",
            self.collection
        );
        let row = sqlx::query(&sql)
            .bind(Json(filter.as_document()))
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("find", e))?;
        row.as_ref().map(decode).transpose()
    }

    #[instrument(skip(self, entity), fields(collection = %self.collection, id = %entity.id()), err)]
    async fn create(&self, entity: T) -> Result<(), StoreError> {
        entity.ensure_writable()?;
        let sql = format!("INSERT INTO {} (id, document) VALUES ($1, $2)", self.collection);
        let id: Uuid = entity.id().into();
        sqlx::query(&sql)
            .bind(id)
            .bind(Json(encode(&entity)?))
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("create", e))?;
        Ok(())
    }

    #[instrument(skip(self, entity), fields(collection = %self.collection, id = %entity.id()), err)]
    async fn update(&self, entity: T) -> Result<(), StoreError> {
        entity.ensure_writable()?;
        let sql = format!("UPDATE {} SET document = $2 WHERE id = $1", self.collection);
        let id: Uuid = entity.id().into();
        sqlx::query(&sql)
            .bind(id)
            .bind(Json(encode(&entity)?))
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("update", e))?;
        Ok(())
    }

    #[instrument(skip(self), fields(collection = %self.collection, id = %id), err)]
    async fn delete(&self, id: T::Id) -> Result<(), StoreError> {
        let sql = format!("DELETE FROM {} WHERE id = $1", self.collection);
        let id: Uuid = id.into();
        sqlx::query(&sql)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete", e))?;
        Ok(())
    }

    #[instrument(skip(self), fields(collection = %self.collection), err)]
    async fn is_empty(&self) -> Result<bool, StoreError> {
        let sql = format!("SELECT EXISTS (SELECT 1 FROM {}) AS present", self.collection);
        let row = sqlx::query(&sql)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("is_empty", e))?;
        let present: bool = row
            .try_get("present")
            .map_err(|e| map_sqlx_error("is_empty", e))?;
        Ok(!present)
    }
}

/// Map SQLx errors to StoreError.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            if db_err.code().as_deref() == Some("23505") {
                StoreError::Backend(format!(
                    "duplicate id in {}: {}",
                    operation,
                    db_err.message()
                ))
            } else {
                StoreError::Backend(format!("database error in {}: {}", operation, db_err.message()))
            }
        }
        sqlx::Error::PoolClosed => {
            StoreError::Backend(format!("connection pool closed in {}", operation))
        }
        _ => StoreError::Backend(format!("sqlx error in {}: {}", operation, err)),
    }
}
