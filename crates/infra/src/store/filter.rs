use serde_json::{Map, Value as JsonValue};

use videopalace_core::{CatalogItemId, InventoryRecordId};

/// A value a filter clause compares against, in the same JSON form the
/// entity's field serializes to.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterValue(JsonValue);

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        Self(JsonValue::from(value))
    }
}

impl From<String> for FilterValue {
    fn from(value: String) -> Self {
        Self(JsonValue::from(value))
    }
}

impl From<bool> for FilterValue {
    fn from(value: bool) -> Self {
        Self(JsonValue::from(value))
    }
}

impl From<i32> for FilterValue {
    fn from(value: i32) -> Self {
        Self(JsonValue::from(value))
    }
}

impl From<i64> for FilterValue {
    fn from(value: i64) -> Self {
        Self(JsonValue::from(value))
    }
}

// Ids serialize as their hyphenated uuid string.
impl From<CatalogItemId> for FilterValue {
    fn from(value: CatalogItemId) -> Self {
        Self(JsonValue::String(value.to_string()))
    }
}

impl From<InventoryRecordId> for FilterValue {
    fn from(value: InventoryRecordId) -> Self {
        Self(JsonValue::String(value.to_string()))
    }
}

/// Field-equality filter over an entity's serialized (serde JSON) form.
///
/// Every clause must match. An empty filter matches everything. Field names are
/// the entity's serde field names (e.g. `source_id`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    clauses: Map<String, JsonValue>,
}

impl Filter {
    /// Matches every entity.
    pub fn all() -> Self {
        Self::default()
    }

    /// Matches entities whose `field` serializes equal to `value`.
    pub fn eq(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::all().and_eq(field, value)
    }

    pub fn and_eq(mut self, field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        self.clauses.insert(field.into(), value.into().0);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Evaluate against an already-serialized document.
    pub fn matches(&self, document: &JsonValue) -> bool {
        self.clauses
            .iter()
            .all(|(field, expected)| document.get(field) == Some(expected))
    }

    /// The filter as a JSON object, suitable for JSONB containment (`@>`).
    pub fn as_document(&self) -> JsonValue {
        JsonValue::Object(self.clauses.clone())
    }
}
