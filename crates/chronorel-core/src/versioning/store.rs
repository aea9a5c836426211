//! Snapshot persistence and the public version ledger.

use chrono::{DateTime, Utc};
use std::collections::BTreeSet;

use crate::db::{fmt_time, Database};
use crate::edges::MembershipEdge;
use crate::error::ChronoRelResult;
use crate::types::EntityId;
use crate::versioning::{compactor, VersionSnapshot};

/// SQL primitives over the snapshot table, composable inside a transaction.
pub(crate) mod ops {
    use rusqlite::{params, Connection, OptionalExtension};

    use crate::db::parse_time;
    use crate::error::ChronoRelResult;
    use crate::types::EntityId;
    use crate::versioning::VersionSnapshot;

    const VERSION_COLUMNS: &str =
        "owner_id, field_name, time, count, added_count, removed_count";

    fn row_to_version(row: &rusqlite::Row<'_>) -> ChronoRelResult<VersionSnapshot> {
        let time: String = row.get(2)?;
        Ok(VersionSnapshot {
            owner_id: row.get(0)?,
            field_name: row.get(1)?,
            time: parse_time(&time)?,
            count: row.get(3)?,
            added_count: row.get(4)?,
            removed_count: row.get(5)?,
        })
    }

    fn query_one(
        conn: &Connection,
        sql: &str,
        owner_id: EntityId,
        field_name: &str,
        time: Option<&str>,
    ) -> ChronoRelResult<Option<VersionSnapshot>> {
        let result = match time {
            Some(t) => conn
                .query_row(sql, params![owner_id, field_name, t], |row| {
                    Ok(row_to_version(row))
                })
                .optional()?,
            None => conn
                .query_row(sql, params![owner_id, field_name], |row| {
                    Ok(row_to_version(row))
                })
                .optional()?,
        };
        result.transpose()
    }

    /// Insert or update the snapshot at `(owner, field, time)`.
    ///
    /// `count` always takes the new value; `added` / `removed` update only
    /// when supplied, so a clear and an add sharing one transaction time
    /// merge their deltas into a single row.
    pub(crate) fn upsert_version(
        conn: &Connection,
        owner_id: EntityId,
        field_name: &str,
        time: &str,
        count: usize,
        added: Option<usize>,
        removed: Option<usize>,
    ) -> ChronoRelResult<()> {
        conn.execute(
            "INSERT INTO history_versions
                 (owner_id, field_name, time, count, added_count, removed_count)
             VALUES (?1, ?2, ?3, ?4, COALESCE(?5, 0), COALESCE(?6, 0))
             ON CONFLICT(owner_id, field_name, time) DO UPDATE SET
                 count = excluded.count,
                 added_count = COALESCE(?5, added_count),
                 removed_count = COALESCE(?6, removed_count)",
            params![
                owner_id,
                field_name,
                time,
                count as i64,
                added.map(|n| n as i64),
                removed.map(|n| n as i64),
            ],
        )?;
        Ok(())
    }

    /// Snapshot at exactly `time`.
    pub(crate) fn get_version(
        conn: &Connection,
        owner_id: EntityId,
        field_name: &str,
        time: &str,
    ) -> ChronoRelResult<Option<VersionSnapshot>> {
        query_one(
            conn,
            &format!(
                "SELECT {} FROM history_versions
                 WHERE owner_id = ?1 AND field_name = ?2 AND time = ?3",
                VERSION_COLUMNS
            ),
            owner_id,
            field_name,
            Some(time),
        )
    }

    /// Nearest snapshot strictly before `time`.
    pub(crate) fn prev_version(
        conn: &Connection,
        owner_id: EntityId,
        field_name: &str,
        time: &str,
    ) -> ChronoRelResult<Option<VersionSnapshot>> {
        query_one(
            conn,
            &format!(
                "SELECT {} FROM history_versions
                 WHERE owner_id = ?1 AND field_name = ?2 AND time < ?3
                 ORDER BY time DESC LIMIT 1",
                VERSION_COLUMNS
            ),
            owner_id,
            field_name,
            Some(time),
        )
    }

    /// Nearest snapshot strictly after `time`.
    pub(crate) fn next_version(
        conn: &Connection,
        owner_id: EntityId,
        field_name: &str,
        time: &str,
    ) -> ChronoRelResult<Option<VersionSnapshot>> {
        query_one(
            conn,
            &format!(
                "SELECT {} FROM history_versions
                 WHERE owner_id = ?1 AND field_name = ?2 AND time > ?3
                 ORDER BY time ASC LIMIT 1",
                VERSION_COLUMNS
            ),
            owner_id,
            field_name,
            Some(time),
        )
    }

    /// Chronologically last snapshot of the association.
    pub(crate) fn last_version(
        conn: &Connection,
        owner_id: EntityId,
        field_name: &str,
    ) -> ChronoRelResult<Option<VersionSnapshot>> {
        query_one(
            conn,
            &format!(
                "SELECT {} FROM history_versions
                 WHERE owner_id = ?1 AND field_name = ?2
                 ORDER BY time DESC LIMIT 1",
                VERSION_COLUMNS
            ),
            owner_id,
            field_name,
            None,
        )
    }

    /// All snapshots of the association, ascending by time.
    pub(crate) fn list_versions(
        conn: &Connection,
        owner_id: EntityId,
        field_name: &str,
    ) -> ChronoRelResult<Vec<VersionSnapshot>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM history_versions
             WHERE owner_id = ?1 AND field_name = ?2
             ORDER BY time ASC",
            VERSION_COLUMNS
        ))?;
        let rows = stmt.query_map(params![owner_id, field_name], |row| {
            Ok(row_to_version(row))
        })?;
        rows.map(|r| r.map_err(Into::into).and_then(|inner| inner))
            .collect()
    }

    /// Number of snapshots recorded for the association.
    pub(crate) fn count_versions(
        conn: &Connection,
        owner_id: EntityId,
        field_name: &str,
    ) -> ChronoRelResult<usize> {
        let n: i64 = conn.query_row(
            "SELECT COUNT(*) FROM history_versions
             WHERE owner_id = ?1 AND field_name = ?2",
            params![owner_id, field_name],
            |row| row.get(0),
        )?;
        Ok(n as usize)
    }

    /// Overwrite the delta counts of the snapshot at `time`.
    pub(crate) fn set_delta_counts(
        conn: &Connection,
        owner_id: EntityId,
        field_name: &str,
        time: &str,
        added: usize,
        removed: usize,
    ) -> ChronoRelResult<()> {
        conn.execute(
            "UPDATE history_versions SET added_count = ?4, removed_count = ?5
             WHERE owner_id = ?1 AND field_name = ?2 AND time = ?3",
            params![owner_id, field_name, time, added as i64, removed as i64],
        )?;
        Ok(())
    }

    /// Delete the snapshot row at `time`. Returns rows deleted.
    pub(crate) fn delete_version_row(
        conn: &Connection,
        owner_id: EntityId,
        field_name: &str,
        time: &str,
    ) -> ChronoRelResult<usize> {
        conn.execute(
            "DELETE FROM history_versions
             WHERE owner_id = ?1 AND field_name = ?2 AND time = ?3",
            params![owner_id, field_name, time],
        )
        .map_err(Into::into)
    }
}

/// Read surface over recorded snapshots plus out-of-order deletion.
///
/// Snapshot rows are written by the mutation protocol inside the mutation's
/// own transaction; the ledger only reads them back and, on deletion of a
/// non-last snapshot, runs the compaction reflow.
pub struct VersionLedger {
    db: Database,
}

impl VersionLedger {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Snapshot recorded at exactly `time`.
    pub fn get(
        &self,
        owner_id: EntityId,
        field_name: &str,
        time: DateTime<Utc>,
    ) -> ChronoRelResult<Option<VersionSnapshot>> {
        let ts = fmt_time(time);
        self.db
            .with_conn(|conn| ops::get_version(conn, owner_id, field_name, &ts))
    }

    /// The most recent snapshot of the association.
    pub fn last(
        &self,
        owner_id: EntityId,
        field_name: &str,
    ) -> ChronoRelResult<Option<VersionSnapshot>> {
        self.db
            .with_conn(|conn| ops::last_version(conn, owner_id, field_name))
    }

    /// Nearest snapshot before `time`.
    pub fn prev(
        &self,
        owner_id: EntityId,
        field_name: &str,
        time: DateTime<Utc>,
    ) -> ChronoRelResult<Option<VersionSnapshot>> {
        let ts = fmt_time(time);
        self.db
            .with_conn(|conn| ops::prev_version(conn, owner_id, field_name, &ts))
    }

    /// Nearest snapshot after `time`.
    pub fn next(
        &self,
        owner_id: EntityId,
        field_name: &str,
        time: DateTime<Utc>,
    ) -> ChronoRelResult<Option<VersionSnapshot>> {
        let ts = fmt_time(time);
        self.db
            .with_conn(|conn| ops::next_version(conn, owner_id, field_name, &ts))
    }

    /// All snapshots of the association, ascending by time.
    pub fn list(
        &self,
        owner_id: EntityId,
        field_name: &str,
    ) -> ChronoRelResult<Vec<VersionSnapshot>> {
        self.db
            .with_conn(|conn| ops::list_versions(conn, owner_id, field_name))
    }

    /// Number of snapshots recorded for the association.
    pub fn count(&self, owner_id: EntityId, field_name: &str) -> ChronoRelResult<usize> {
        self.db
            .with_conn(|conn| ops::count_versions(conn, owner_id, field_name))
    }

    /// Member set at the snapshot's instant.
    pub fn items(&self, snapshot: &VersionSnapshot) -> ChronoRelResult<BTreeSet<EntityId>> {
        self.edges_to_ids(crate::edges::ops::edges_were_at, snapshot)
    }

    /// Members added at the snapshot's instant.
    pub fn added(&self, snapshot: &VersionSnapshot) -> ChronoRelResult<BTreeSet<EntityId>> {
        self.edges_to_ids(crate::edges::ops::edges_added_at, snapshot)
    }

    /// Members removed at the snapshot's instant.
    pub fn removed(&self, snapshot: &VersionSnapshot) -> ChronoRelResult<BTreeSet<EntityId>> {
        self.edges_to_ids(crate::edges::ops::edges_removed_at, snapshot)
    }

    /// Delete the snapshot at `time`, reflowing edges when it is not the last.
    ///
    /// Fails with `VersionNotFound` when no snapshot exists at `time`.
    pub fn delete(
        &self,
        owner_id: EntityId,
        field_name: &str,
        time: DateTime<Utc>,
    ) -> ChronoRelResult<()> {
        compactor::delete_version(&self.db, owner_id, field_name, time)
    }

    fn edges_to_ids(
        &self,
        query: fn(
            &rusqlite::Connection,
            EntityId,
            &str,
            &str,
        ) -> ChronoRelResult<Vec<MembershipEdge>>,
        snapshot: &VersionSnapshot,
    ) -> ChronoRelResult<BTreeSet<EntityId>> {
        let ts = fmt_time(snapshot.time);
        let edges = self
            .db
            .with_conn(|conn| query(conn, snapshot.owner_id, &snapshot.field_name, &ts))?;
        Ok(edges.into_iter().map(|e| e.member_id).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const F: &str = "members";

    fn t(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_upsert_merges_partial_deltas() {
        let db = Database::in_memory().unwrap();
        let ts = fmt_time(t(1));
        db.with_conn(|conn| {
            // clear phase records the removal delta...
            ops::upsert_version(conn, 1, F, &ts, 0, None, Some(2))?;
            // ...then the add phase at the same instant records the addition
            ops::upsert_version(conn, 1, F, &ts, 3, Some(3), None)?;
            Ok(())
        })
        .unwrap();

        let ledger = VersionLedger::new(db);
        let snapshot = ledger.get(1, F, t(1)).unwrap().unwrap();
        assert_eq!(snapshot.count, 3);
        assert_eq!(snapshot.added_count, 3);
        assert_eq!(snapshot.removed_count, 2);
    }

    #[test]
    fn test_prev_next_last() {
        let db = Database::in_memory().unwrap();
        db.with_conn(|conn| {
            for day in [1, 2, 3] {
                ops::upsert_version(conn, 1, F, &fmt_time(t(day)), day as usize, Some(1), None)?;
            }
            Ok(())
        })
        .unwrap();

        let ledger = VersionLedger::new(db);
        assert_eq!(ledger.last(1, F).unwrap().unwrap().time, t(3));
        assert_eq!(ledger.prev(1, F, t(2)).unwrap().unwrap().time, t(1));
        assert_eq!(ledger.next(1, F, t(2)).unwrap().unwrap().time, t(3));
        assert!(ledger.prev(1, F, t(1)).unwrap().is_none());
        assert!(ledger.next(1, F, t(3)).unwrap().is_none());

        let all = ledger.list(1, F).unwrap();
        assert_eq!(all.len(), 3);
        assert!(all.windows(2).all(|w| w[0].time < w[1].time));
        assert_eq!(ledger.count(1, F).unwrap(), 3);
    }

    #[test]
    fn test_versions_scoped_per_association() {
        let db = Database::in_memory().unwrap();
        db.with_conn(|conn| {
            ops::upsert_version(conn, 1, "a", &fmt_time(t(1)), 1, Some(1), None)?;
            ops::upsert_version(conn, 1, "b", &fmt_time(t(1)), 5, Some(5), None)?;
            ops::upsert_version(conn, 2, "a", &fmt_time(t(1)), 9, Some(9), None)?;
            Ok(())
        })
        .unwrap();

        let ledger = VersionLedger::new(db);
        assert_eq!(ledger.list(1, "a").unwrap().len(), 1);
        assert_eq!(ledger.get(1, "b", t(1)).unwrap().unwrap().count, 5);
        assert_eq!(ledger.get(2, "a", t(1)).unwrap().unwrap().count, 9);
    }
}
