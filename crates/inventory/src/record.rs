use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use videopalace_core::{CatalogItemId, DomainError, DomainResult, Entity, InventoryRecordId};

/// Stock materialized for every catalog item synchronized through events.
pub const UNITS_PER_CATALOG_ITEM: i32 = 1;

/// Stock-tracking record for one catalog item.
///
/// `title` is a denormalized copy taken at creation time; it is not re-synced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryRecord {
    pub id: InventoryRecordId,
    /// Id of the catalog item this record was derived from.
    pub source_id: CatalogItemId,
    pub title: String,
    pub total_quantity: i32,
    pub available_quantity: i32,
    pub created_at: DateTime<Utc>,
}

/// Direct-create input: stock supplied explicitly by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewInventoryRecord {
    pub source_id: CatalogItemId,
    pub title: String,
    pub total_quantity: i32,
}

impl NewInventoryRecord {
    pub fn validate(&self) -> DomainResult<()> {
        if self.title.trim().is_empty() {
            return Err(DomainError::validation("title cannot be empty"));
        }
        if self.total_quantity < 0 {
            return Err(DomainError::validation("total quantity cannot be negative"));
        }
        Ok(())
    }
}

impl InventoryRecord {
    /// Materialize a record with everything in stock available (`available == total`).
    pub fn create(input: NewInventoryRecord, created_at: DateTime<Utc>) -> DomainResult<Self> {
        input.validate()?;
        Ok(Self {
            id: InventoryRecordId::new(),
            source_id: input.source_id,
            title: input.title,
            total_quantity: input.total_quantity,
            available_quantity: input.total_quantity,
            created_at,
        })
    }

    /// Record for a newly announced catalog item: one unit, all available.
    pub fn for_catalog_item(
        source_id: CatalogItemId,
        title: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: InventoryRecordId::new(),
            source_id,
            title: title.into(),
            total_quantity: UNITS_PER_CATALOG_ITEM,
            available_quantity: UNITS_PER_CATALOG_ITEM,
            created_at,
        }
    }
}

impl Entity for InventoryRecord {
    type Id = InventoryRecordId;

    fn id(&self) -> Self::Id {
        self.id
    }

    fn validate(&self) -> DomainResult<()> {
        if self.available_quantity > self.total_quantity {
            return Err(DomainError::invariant("available quantity exceeds total quantity"));
        }
        Ok(())
    }
}
