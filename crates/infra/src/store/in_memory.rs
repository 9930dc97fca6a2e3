use std::sync::RwLock;

use async_trait::async_trait;
use serde::Serialize;

use videopalace_core::Entity;

use super::{EntityStore, Filter, StoreError};

/// In-memory entity store for tests/dev.
///
/// Backed by a plain vector so that, like the persistent stores, nothing here enforces
/// uniqueness beyond what callers check themselves.
#[derive(Debug)]
pub struct InMemoryEntityStore<T> {
    inner: RwLock<Vec<T>>,
}

impl<T> InMemoryEntityStore<T> {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Vec::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.read().map(|v| v.len()).unwrap_or(0)
    }
}

impl<T> Default for InMemoryEntityStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned() -> StoreError {
    StoreError::Backend("in-memory store lock poisoned".to_string())
}

fn matches<T: Serialize>(filter: &Filter, entity: &T) -> Result<bool, StoreError> {
    if filter.is_empty() {
        return Ok(true);
    }
    let doc = serde_json::to_value(entity).map_err(|e| StoreError::Serialization(e.to_string()))?;
    Ok(filter.matches(&doc))
}

#[async_trait]
impl<T> EntityStore<T> for InMemoryEntityStore<T>
where
    T: Entity + Serialize + Clone + Send + Sync + 'static,
{
    async fn get_all(&self) -> Result<Vec<T>, StoreError> {
        Ok(self.inner.read().map_err(|_| poisoned())?.clone())
    }

    async fn get_all_matching(&self, filter: &Filter) -> Result<Vec<T>, StoreError> {
        let items = self.inner.read().map_err(|_| poisoned())?;
        let mut out = Vec::new();
        for item in items.iter() {
            if matches(filter, item)? {
                out.push(item.clone());
            }
        }
        Ok(out)
    }

    async fn get(&self, id: T::Id) -> Result<Option<T>, StoreError> {
        let items = self.inner.read().map_err(|_| poisoned())?;
        Ok(items.iter().find(|e| e.id() == id).cloned())
    }

    async fn find(&self, filter: &Filter) -> Result<Option<T>, StoreError> {
        let items = self.inner.read().map_err(|_| poisoned())?;
        for item in items.iter() {
            if matches(filter, item)? {
                return Ok(Some(item.clone()));
            }
        }
        Ok(None)
    }

    async fn create(&self, entity: T) -> Result<(), StoreError> {
        entity.ensure_writable()?;
        self.inner.write().map_err(|_| poisoned())?.push(entity);
        Ok(())
    }

    async fn update(&self, entity: T) -> Result<(), StoreError> {
        entity.ensure_writable()?;
        let mut items = self.inner.write().map_err(|_| poisoned())?;
        if let Some(slot) = items.iter_mut().find(|e| e.id() == entity.id()) {
            *slot = entity;
        }
        Ok(())
    }

    async fn delete(&self, id: T::Id) -> Result<(), StoreError> {
        let mut items = self.inner.write().map_err(|_| poisoned())?;
        if let Some(pos) = items.iter().position(|e| e.id() == id) {
            items.remove(pos);
        }
        Ok(())
    }
}
