use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use videopalace_catalog::{CatalogItem, NewCatalogItem};
use videopalace_core::{CatalogItemId, InventoryRecordId};
use videopalace_inventory::{InventoryRecord, NewInventoryRecord};

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCatalogItemRequest {
    pub title: String,
    pub description: String,
    pub category: String,
    pub rating: String,
    pub release_year: i32,
}

impl From<CreateCatalogItemRequest> for NewCatalogItem {
    fn from(body: CreateCatalogItemRequest) -> Self {
        NewCatalogItem {
            title: body.title,
            description: body.description,
            category: body.category,
            rating: body.rating,
            release_year: body.release_year,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateInventoryRecordRequest {
    pub source_id: CatalogItemId,
    pub title: String,
    pub total_quantity: i32,
}

impl From<CreateInventoryRecordRequest> for NewInventoryRecord {
    fn from(body: CreateInventoryRecordRequest) -> Self {
        NewInventoryRecord {
            source_id: body.source_id,
            title: body.title,
            total_quantity: body.total_quantity,
        }
    }
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogItemResponse {
    pub id: CatalogItemId,
    pub title: String,
    pub description: String,
    pub category: String,
    pub rating: String,
    pub release_year: i32,
    pub created_at: DateTime<Utc>,
}

impl From<CatalogItem> for CatalogItemResponse {
    fn from(item: CatalogItem) -> Self {
        Self {
            id: item.id,
            title: item.title,
            description: item.description,
            category: item.category,
            rating: item.rating,
            release_year: item.release_year,
            created_at: item.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryRecordResponse {
    pub id: InventoryRecordId,
    pub source_id: CatalogItemId,
    pub title: String,
    pub total_quantity: i32,
    pub available_quantity: i32,
    pub created_at: DateTime<Utc>,
}

impl From<InventoryRecord> for InventoryRecordResponse {
    fn from(record: InventoryRecord) -> Self {
        Self {
            id: record.id,
            source_id: record.source_id,
            title: record.title,
            total_quantity: record.total_quantity,
            available_quantity: record.available_quantity,
            created_at: record.created_at,
        }
    }
}
