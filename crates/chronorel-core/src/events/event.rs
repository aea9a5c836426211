//! Membership change events.
//!
//! One event is emitted per mutation phase with the set of member ids the
//! mutation actually affected; no-op phases emit nothing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::types::EntityId;

/// Mutation phase that produced an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeAction {
    PreAdd,
    PostAdd,
    PreRemove,
    PostRemove,
    PreClear,
    PostClear,
}

impl ChangeAction {
    /// Convert to string for storage and filtering.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PreAdd => "pre_add",
            Self::PostAdd => "post_add",
            Self::PreRemove => "pre_remove",
            Self::PostRemove => "post_remove",
            Self::PreClear => "pre_clear",
            Self::PostClear => "post_clear",
        }
    }

    /// Parse from string.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pre_add" => Some(Self::PreAdd),
            "post_add" => Some(Self::PostAdd),
            "pre_remove" => Some(Self::PreRemove),
            "post_remove" => Some(Self::PostRemove),
            "pre_clear" => Some(Self::PreClear),
            "post_clear" => Some(Self::PostClear),
            _ => None,
        }
    }

    /// Whether this is a post-phase action (the kind the version ledger
    /// records).
    pub fn is_post(&self) -> bool {
        matches!(self, Self::PostAdd | Self::PostRemove | Self::PostClear)
    }
}

/// A committed (or about-to-commit) membership change on one association.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MembershipChangeEvent {
    /// Unique event ID.
    pub event_id: String,
    /// Owning entity of the association.
    pub owner_id: EntityId,
    /// Association field name.
    pub field_name: String,
    /// Mutation phase.
    pub action: ChangeAction,
    /// Member ids the mutation actually affected.
    pub member_ids: BTreeSet<EntityId>,
    /// Transaction time of the mutation.
    pub time: DateTime<Utc>,
}

impl MembershipChangeEvent {
    pub fn new(
        owner_id: EntityId,
        field_name: impl Into<String>,
        action: ChangeAction,
        member_ids: BTreeSet<EntityId>,
        time: DateTime<Utc>,
    ) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            owner_id,
            field_name: field_name.into(),
            action,
            member_ids,
            time,
        }
    }
}
