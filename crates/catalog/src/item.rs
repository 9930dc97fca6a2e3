use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use videopalace_core::{CatalogItemId, DomainError, DomainResult, Entity};

/// A catalog entry, as persisted by the catalog service.
///
/// Created once by the write path and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub id: CatalogItemId,
    pub title: String,
    pub description: String,
    pub category: String,
    pub rating: String,
    pub release_year: i32,
    pub created_at: DateTime<Utc>,
}

/// Input for creating a catalog item (everything except identity and timestamp).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCatalogItem {
    pub title: String,
    pub description: String,
    pub category: String,
    pub rating: String,
    pub release_year: i32,
}

impl NewCatalogItem {
    /// Minimal presence checks; the catalog does not judge content.
    pub fn validate(&self) -> DomainResult<()> {
        let fields = [
            ("title", &self.title),
            ("description", &self.description),
            ("category", &self.category),
            ("rating", &self.rating),
        ];
        for (name, value) in fields {
            if value.trim().is_empty() {
                return Err(DomainError::validation(format!("{name} cannot be empty")));
            }
        }
        Ok(())
    }
}

impl CatalogItem {
    /// Build a brand-new item with a fresh id, stamped at `created_at`.
    pub fn create(input: NewCatalogItem, created_at: DateTime<Utc>) -> DomainResult<Self> {
        input.validate()?;
        Ok(Self {
            id: CatalogItemId::new(),
            title: input.title,
            description: input.description,
            category: input.category,
            rating: input.rating,
            release_year: input.release_year,
            created_at,
        })
    }
}

impl Entity for CatalogItem {
    type Id = CatalogItemId;

    fn id(&self) -> Self::Id {
        self.id
    }

    fn validate(&self) -> DomainResult<()> {
        if self.title.trim().is_empty() {
            return Err(DomainError::invalid_argument("catalog item title cannot be empty"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ghostbusters() -> NewCatalogItem {
        NewCatalogItem {
            title: "Ghostbusters".into(),
            description: "A movie about ghosts and the men who bust them.".into(),
            category: "Comedy".into(),
            rating: "PG".into(),
            release_year: 1984,
        }
    }

    #[test]
    fn create_stamps_id_and_timestamp() {
        let now = Utc::now();
        let item = CatalogItem::create(ghostbusters(), now).unwrap();

        assert_eq!(item.title, "Ghostbusters");
        assert_eq!(item.release_year, 1984);
        assert_eq!(item.created_at, now);
        assert!(!item.id.as_uuid().is_nil());
    }

    #[test]
    fn blank_fields_are_rejected() {
        let mut input = ghostbusters();
        input.category = "   ".into();

        match CatalogItem::create(input, Utc::now()) {
            Err(DomainError::Validation(msg)) => assert!(msg.contains("category")),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn entity_validation_rejects_blank_title() {
        let mut item = CatalogItem::create(ghostbusters(), Utc::now()).unwrap();
        item.title = String::new();
        assert!(matches!(item.ensure_writable(), Err(DomainError::InvalidArgument(_))));
    }

    #[test]
    fn stored_document_uses_snake_case_fields() {
        let item = CatalogItem::create(ghostbusters(), Utc::now()).unwrap();
        let doc = serde_json::to_value(&item).unwrap();
        assert_eq!(doc["release_year"], 1984);
        assert_eq!(doc["id"], serde_json::json!(item.id.to_string()));
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 256,
                ..ProptestConfig::default()
            })]

            /// Property: every valid input yields an item with a fresh, distinct id.
            #[test]
            fn create_always_generates_a_fresh_id(
                title in "[A-Za-z][A-Za-z0-9 ]{0,40}",
                year in 1888i32..2100,
            ) {
                let input = NewCatalogItem {
                    title: title.clone(),
                    description: "d".into(),
                    category: "c".into(),
                    rating: "PG".into(),
                    release_year: year,
                };

                let a = CatalogItem::create(input.clone(), Utc::now()).unwrap();
                let b = CatalogItem::create(input, Utc::now()).unwrap();

                prop_assert_ne!(a.id, b.id);
                prop_assert_eq!(a.title, title);
                prop_assert_eq!(a.release_year, year);
            }
        }
    }
}
