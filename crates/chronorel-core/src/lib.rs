//! chronorel-core - Temporal many-to-many relationship store.
//!
//! This crate persists many-to-many associations as interval edges instead of
//! plain rows: each edge records the continuous period during which a member
//! belonged to an owner's association, so current membership and membership
//! at any past instant are both first-class queries. Mutations emit change
//! events and optionally record version snapshots; snapshots can be deleted
//! out of order, reflowing the underlying edges.
//!
//! # Example
//!
//! ```ignore
//! use chronorel_core::{AssociationConfig, Database, EventBus, TemporalAssociation};
//!
//! let db = Database::open("relations.db")?;
//! let bus = EventBus::new();
//! let group = TemporalAssociation::new(
//!     db, bus, group_id,
//!     AssociationConfig::new("members").with_versions(),
//! )?;
//!
//! group.add(&[10.into(), 11.into()])?;
//! group.remove(&[10.into()])?;
//!
//! let now = group.members()?;
//! let then = group.were_at(yesterday)?;
//! ```

pub mod association;
pub mod config;
pub mod db;
pub mod edges;
pub mod error;
pub mod events;
pub mod types;
pub mod versioning;

// Re-export commonly used types
pub use association::TemporalAssociation;
pub use config::{AssociationConfig, StoreConfig, DEFAULT_STORE_TAG};
pub use db::Database;
pub use edges::{EdgeStore, MembershipEdge};
pub use error::{ChronoRelError, ChronoRelResult, ErrorCode};
pub use events::{ChangeAction, EventBus, EventSubscriber, MembershipChangeEvent};
pub use types::{EntityId, MemberRef};
pub use versioning::{VersionLedger, VersionSnapshot};
