//! Core identifier types shared across the crate.

use serde::{Deserialize, Serialize};

/// Identifier of a related entity (owner or member side).
pub type EntityId = i64;

/// Reference to a member entity passed into a mutation.
///
/// A bare id carries no kind or store tag and skips validation, like passing
/// a raw primary key. A typed reference declares the entity kind it points at
/// and optionally the backing store it is bound to; the mutation protocol
/// rejects references whose kind or store does not match the association.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberRef {
    /// Member entity identifier.
    pub id: EntityId,
    /// Entity kind this reference claims to point at.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Backing store the referenced entity is bound to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store: Option<String>,
}

impl MemberRef {
    /// Create an untyped reference from a raw id.
    pub fn new(id: EntityId) -> Self {
        Self {
            id,
            kind: None,
            store: None,
        }
    }

    /// Create a typed reference.
    pub fn typed(id: EntityId, kind: impl Into<String>) -> Self {
        Self {
            id,
            kind: Some(kind.into()),
            store: None,
        }
    }

    /// Builder: bind the reference to a named backing store.
    pub fn bound_to(mut self, store: impl Into<String>) -> Self {
        self.store = Some(store.into());
        self
    }
}

impl From<EntityId> for MemberRef {
    fn from(id: EntityId) -> Self {
        Self::new(id)
    }
}
