//! Entity trait: identity + continuity across state changes.

use uuid::Uuid;

use crate::error::{DomainError, DomainResult};

/// Entity marker + minimal interface.
///
/// Anything persisted through an entity store implements this. Identity access is
/// a required capability of the type, so stores never have to look fields up by
/// name to find the key.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Copy
        + Eq
        + core::hash::Hash
        + core::fmt::Debug
        + core::fmt::Display
        + Into<Uuid>
        + Send
        + Sync
        + 'static;

    /// Returns the entity identifier.
    fn id(&self) -> Self::Id;

    /// Entity-specific sanity checks run before every store write.
    fn validate(&self) -> DomainResult<()> {
        Ok(())
    }

    /// Rejects entities that must not reach a store (the "absent" entity).
    ///
    /// A nil identity stands for an entity that was never constructed properly.
    fn ensure_writable(&self) -> DomainResult<()> {
        let id: Uuid = self.id().into();
        if id.is_nil() {
            return Err(DomainError::invalid_argument("entity identity is nil"));
        }
        self.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::CatalogItemId;

    struct Probe {
        id: CatalogItemId,
        name: String,
    }

    impl Entity for Probe {
        type Id = CatalogItemId;

        fn id(&self) -> Self::Id {
            self.id
        }

        fn validate(&self) -> DomainResult<()> {
            if self.name.is_empty() {
                return Err(DomainError::invalid_argument("name is empty"));
            }
            Ok(())
        }
    }

    #[test]
    fn nil_identity_is_rejected() {
        let probe = Probe {
            id: CatalogItemId::from_uuid(Uuid::nil()),
            name: "x".into(),
        };
        assert!(matches!(probe.ensure_writable(), Err(DomainError::InvalidArgument(_))));
    }

    #[test]
    fn validation_runs_after_identity_check() {
        let probe = Probe {
            id: CatalogItemId::new(),
            name: String::new(),
        };
        assert!(probe.ensure_writable().is_err());

        let probe = Probe {
            id: CatalogItemId::new(),
            name: "ok".into(),
        };
        assert!(probe.ensure_writable().is_ok());
    }
}
