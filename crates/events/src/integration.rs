//! Integration events meant for external consumers / message brokers.

use serde::{Deserialize, Serialize};

use videopalace_core::CatalogItemId;

use crate::Event;

/// Published by the catalog service after a catalog item is persisted.
///
/// Carries only what the inventory side needs to materialize a record. It is a
/// trigger, not a log: consumers must tolerate duplicates and reordering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogItemAdded {
    pub source_id: CatalogItemId,
    pub title: String,
}

impl Event for CatalogItemAdded {
    fn event_type(&self) -> &'static str {
        "catalog.item.added"
    }

    fn version(&self) -> u32 {
        1
    }
}
