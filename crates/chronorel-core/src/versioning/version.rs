//! Version snapshot type.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::EntityId;

/// A checkpoint of one association's state at a specific instant.
///
/// Keyed by `(owner_id, field_name, time)`. `count` is the total current
/// membership at that instant; `added_count` / `removed_count` are the deltas
/// against the previous snapshot. The neighbouring snapshots (`prev`/`next`)
/// are not stored — the ledger computes them by time ordering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionSnapshot {
    /// Owning entity of the association.
    pub owner_id: EntityId,
    /// Association field name.
    pub field_name: String,
    /// Transaction time of the mutation that produced this snapshot.
    pub time: DateTime<Utc>,
    /// Total current members at `time`.
    pub count: u32,
    /// Members added at `time`.
    pub added_count: u32,
    /// Members removed at `time`.
    pub removed_count: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_serde_round_trip() {
        let snapshot = VersionSnapshot {
            owner_id: 1,
            field_name: "publications".to_string(),
            time: Utc::now(),
            count: 3,
            added_count: 2,
            removed_count: 1,
        };
        let json = serde_json::to_string(&snapshot).unwrap();
        let back: VersionSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, snapshot);
    }
}
