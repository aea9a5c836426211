//! SQL primitives over the membership edge table.
//!
//! All functions operate on a borrowed connection so they compose inside one
//! transaction. Timestamps are passed pre-formatted (see `db::fmt_time`).

use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use std::collections::BTreeSet;

use crate::db::parse_opt_time;
use crate::edges::MembershipEdge;
use crate::error::ChronoRelResult;
use crate::types::EntityId;

const EDGE_COLUMNS: &str = "owner_id, field_name, member_id, time_from, time_to";

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

fn row_to_edge(row: &rusqlite::Row<'_>) -> ChronoRelResult<MembershipEdge> {
    let time_from: Option<String> = row.get(3)?;
    let time_to: Option<String> = row.get(4)?;
    Ok(MembershipEdge {
        owner_id: row.get(0)?,
        field_name: row.get(1)?,
        member_id: row.get(2)?,
        time_from: parse_opt_time(&time_from)?,
        time_to: parse_opt_time(&time_to)?,
    })
}

fn select_edges(
    conn: &Connection,
    owner_id: EntityId,
    field_name: &str,
    condition: &str,
    times: &[&str],
) -> ChronoRelResult<Vec<MembershipEdge>> {
    let sql = format!(
        "SELECT {} FROM membership_edges
         WHERE owner_id = ? AND field_name = ? AND {}
         ORDER BY member_id ASC, time_from ASC",
        EDGE_COLUMNS, condition
    );
    let mut params: Vec<Value> = vec![owner_id.into(), field_name.to_string().into()];
    params.extend(times.iter().map(|t| Value::from(t.to_string())));

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(params), |row| Ok(row_to_edge(row)))?;
    rows.map(|r| r.map_err(Into::into).and_then(|inner| inner))
        .collect()
}

/// Insert a new edge. `time_from = None` means "since before recorded history".
pub(crate) fn insert_edge(
    conn: &Connection,
    owner_id: EntityId,
    field_name: &str,
    member_id: EntityId,
    time_from: Option<&str>,
) -> ChronoRelResult<()> {
    conn.execute(
        "INSERT INTO membership_edges (owner_id, field_name, member_id, time_from, time_to)
         VALUES (?1, ?2, ?3, ?4, NULL)",
        params![owner_id, field_name, member_id, time_from],
    )?;
    Ok(())
}

/// Member ids with an open edge, deduplicated.
pub(crate) fn open_member_ids(
    conn: &Connection,
    owner_id: EntityId,
    field_name: &str,
) -> ChronoRelResult<BTreeSet<EntityId>> {
    let mut stmt = conn.prepare(
        "SELECT DISTINCT member_id FROM membership_edges
         WHERE owner_id = ?1 AND field_name = ?2 AND time_to IS NULL",
    )?;
    let rows = stmt.query_map(params![owner_id, field_name], |row| row.get(0))?;
    rows.collect::<Result<BTreeSet<_>, _>>().map_err(Into::into)
}

/// `time_from` of the open edge for a member, if one exists.
///
/// Outer `None` means no open edge; inner `None` means the open edge started
/// before recorded history.
pub(crate) fn open_edge_start(
    conn: &Connection,
    owner_id: EntityId,
    field_name: &str,
    member_id: EntityId,
) -> ChronoRelResult<Option<Option<String>>> {
    conn.query_row(
        "SELECT time_from FROM membership_edges
         WHERE owner_id = ?1 AND field_name = ?2 AND member_id = ?3 AND time_to IS NULL
         LIMIT 1",
        params![owner_id, field_name, member_id],
        |row| row.get(0),
    )
    .optional()
    .map_err(Into::into)
}

/// Close the open edges of the given members at `at`. Returns rows updated.
pub(crate) fn close_members(
    conn: &Connection,
    owner_id: EntityId,
    field_name: &str,
    members: &[EntityId],
    at: &str,
) -> ChronoRelResult<usize> {
    if members.is_empty() {
        return Ok(0);
    }
    let sql = format!(
        "UPDATE membership_edges SET time_to = ?
         WHERE owner_id = ? AND field_name = ? AND time_to IS NULL AND member_id IN ({})",
        placeholders(members.len())
    );
    let mut params: Vec<Value> = vec![
        at.to_string().into(),
        owner_id.into(),
        field_name.to_string().into(),
    ];
    params.extend(members.iter().map(|m| Value::from(*m)));
    conn.execute(&sql, params_from_iter(params)).map_err(Into::into)
}

/// Whether the member has an edge closed exactly at `at`.
pub(crate) fn member_closed_at(
    conn: &Connection,
    owner_id: EntityId,
    field_name: &str,
    member_id: EntityId,
    at: &str,
) -> ChronoRelResult<bool> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM membership_edges
             WHERE owner_id = ?1 AND field_name = ?2 AND member_id = ?3 AND time_to = ?4
             LIMIT 1",
            params![owner_id, field_name, member_id, at],
            |row| row.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

/// Close open mirror edges pointing at `member_id` (the symmetrical reverse
/// direction), excluding mirrors owned by `except_owners`. Returns the owner
/// ids whose mirrors were closed.
pub(crate) fn close_mirrors_of(
    conn: &Connection,
    field_name: &str,
    member_id: EntityId,
    except_owners: &[EntityId],
    at: &str,
) -> ChronoRelResult<Vec<EntityId>> {
    let not_in = if except_owners.is_empty() {
        String::new()
    } else {
        format!(" AND owner_id NOT IN ({})", placeholders(except_owners.len()))
    };
    let select = format!(
        "SELECT DISTINCT owner_id FROM membership_edges
         WHERE field_name = ? AND member_id = ? AND time_to IS NULL{}",
        not_in
    );
    let mut params: Vec<Value> = vec![field_name.to_string().into(), member_id.into()];
    params.extend(except_owners.iter().map(|o| Value::from(*o)));

    let mut stmt = conn.prepare(&select)?;
    let owners: Vec<EntityId> = stmt
        .query_map(params_from_iter(params.clone()), |row| row.get(0))?
        .collect::<Result<_, _>>()?;

    if !owners.is_empty() {
        let update = format!(
            "UPDATE membership_edges SET time_to = ?
             WHERE field_name = ? AND member_id = ? AND time_to IS NULL{}",
            not_in
        );
        let mut update_params: Vec<Value> = vec![Value::from(at.to_string())];
        update_params.extend(params);
        conn.execute(&update, params_from_iter(update_params))?;
    }
    Ok(owners)
}

// ---- temporal queries (§ query engine) ----

/// Edges covering instant `t` under `[time_from, time_to)` semantics.
pub(crate) fn edges_were_at(
    conn: &Connection,
    owner_id: EntityId,
    field_name: &str,
    t: &str,
) -> ChronoRelResult<Vec<MembershipEdge>> {
    select_edges(
        conn,
        owner_id,
        field_name,
        "(time_from IS NULL OR time_from <= ?) AND (time_to IS NULL OR time_to > ?)",
        &[t, t],
    )
}

/// Edges opened exactly at `t`.
pub(crate) fn edges_added_at(
    conn: &Connection,
    owner_id: EntityId,
    field_name: &str,
    t: &str,
) -> ChronoRelResult<Vec<MembershipEdge>> {
    select_edges(conn, owner_id, field_name, "time_from = ?", &[t])
}

/// Edges closed exactly at `t`.
pub(crate) fn edges_removed_at(
    conn: &Connection,
    owner_id: EntityId,
    field_name: &str,
    t: &str,
) -> ChronoRelResult<Vec<MembershipEdge>> {
    select_edges(conn, owner_id, field_name, "time_to = ?", &[t])
}

/// Edges whose interval overlaps `[t1, t2]` (inclusive overlap).
pub(crate) fn edges_were_between(
    conn: &Connection,
    owner_id: EntityId,
    field_name: &str,
    t1: &str,
    t2: &str,
) -> ChronoRelResult<Vec<MembershipEdge>> {
    select_edges(
        conn,
        owner_id,
        field_name,
        "(time_to IS NULL OR time_to > ?) AND (time_from IS NULL OR time_from <= ?)",
        &[t1, t2],
    )
}

/// Edges opened within `[t1, t2]` inclusive.
pub(crate) fn edges_added_between(
    conn: &Connection,
    owner_id: EntityId,
    field_name: &str,
    t1: &str,
    t2: &str,
) -> ChronoRelResult<Vec<MembershipEdge>> {
    select_edges(
        conn,
        owner_id,
        field_name,
        "time_from >= ? AND time_from <= ?",
        &[t1, t2],
    )
}

/// Edges closed within `[t1, t2]` inclusive.
pub(crate) fn edges_removed_between(
    conn: &Connection,
    owner_id: EntityId,
    field_name: &str,
    t1: &str,
    t2: &str,
) -> ChronoRelResult<Vec<MembershipEdge>> {
    select_edges(
        conn,
        owner_id,
        field_name,
        "time_to >= ? AND time_to <= ?",
        &[t1, t2],
    )
}

/// Most recent mutation instant: max over all non-null interval bounds.
pub(crate) fn last_update_time(
    conn: &Connection,
    owner_id: EntityId,
    field_name: &str,
) -> ChronoRelResult<Option<String>> {
    conn.query_row(
        "SELECT MAX(t) FROM (
             SELECT time_from AS t FROM membership_edges
                 WHERE owner_id = ?1 AND field_name = ?2 AND time_from IS NOT NULL
             UNION ALL
             SELECT time_to FROM membership_edges
                 WHERE owner_id = ?1 AND field_name = ?2 AND time_to IS NOT NULL
         )",
        params![owner_id, field_name],
        |row| row.get(0),
    )
    .map_err(Into::into)
}

// ---- reflow primitives (compactor) ----

/// Delete every edge of the association. Returns rows deleted.
pub(crate) fn delete_all_edges(
    conn: &Connection,
    owner_id: EntityId,
    field_name: &str,
) -> ChronoRelResult<usize> {
    conn.execute(
        "DELETE FROM membership_edges WHERE owner_id = ?1 AND field_name = ?2",
        params![owner_id, field_name],
    )
    .map_err(Into::into)
}

/// Member ids of edges opened exactly at `t`.
pub(crate) fn members_opened_at(
    conn: &Connection,
    owner_id: EntityId,
    field_name: &str,
    t: &str,
) -> ChronoRelResult<BTreeSet<EntityId>> {
    let mut stmt = conn.prepare(
        "SELECT DISTINCT member_id FROM membership_edges
         WHERE owner_id = ?1 AND field_name = ?2 AND time_from = ?3",
    )?;
    let rows = stmt.query_map(params![owner_id, field_name, t], |row| row.get(0))?;
    rows.collect::<Result<BTreeSet<_>, _>>().map_err(Into::into)
}

/// Member ids of edges closed exactly at `t`.
pub(crate) fn members_closed_at(
    conn: &Connection,
    owner_id: EntityId,
    field_name: &str,
    t: &str,
) -> ChronoRelResult<BTreeSet<EntityId>> {
    let mut stmt = conn.prepare(
        "SELECT DISTINCT member_id FROM membership_edges
         WHERE owner_id = ?1 AND field_name = ?2 AND time_to = ?3",
    )?;
    let rows = stmt.query_map(params![owner_id, field_name, t], |row| row.get(0))?;
    rows.collect::<Result<BTreeSet<_>, _>>().map_err(Into::into)
}

/// `time_to` of the member's edge opened exactly at `t`, if such an edge exists.
pub(crate) fn closure_of_edge_opened_at(
    conn: &Connection,
    owner_id: EntityId,
    field_name: &str,
    member_id: EntityId,
    t: &str,
) -> ChronoRelResult<Option<Option<String>>> {
    conn.query_row(
        "SELECT time_to FROM membership_edges
         WHERE owner_id = ?1 AND field_name = ?2 AND member_id = ?3 AND time_from = ?4
         LIMIT 1",
        params![owner_id, field_name, member_id, t],
        |row| row.get(0),
    )
    .optional()
    .map_err(Into::into)
}

/// Re-point the closure of the member's edge closed at `closed_at`.
/// `new_to = None` reopens the edge.
pub(crate) fn repoint_closure(
    conn: &Connection,
    owner_id: EntityId,
    field_name: &str,
    member_id: EntityId,
    closed_at: &str,
    new_to: Option<&str>,
) -> ChronoRelResult<usize> {
    conn.execute(
        "UPDATE membership_edges SET time_to = ?5
         WHERE owner_id = ?1 AND field_name = ?2 AND member_id = ?3 AND time_to = ?4",
        params![owner_id, field_name, member_id, closed_at, new_to],
    )
    .map_err(Into::into)
}

/// Delete the member's edge opened exactly at `t`.
pub(crate) fn delete_edge_opened_at(
    conn: &Connection,
    owner_id: EntityId,
    field_name: &str,
    member_id: EntityId,
    t: &str,
) -> ChronoRelResult<usize> {
    conn.execute(
        "DELETE FROM membership_edges
         WHERE owner_id = ?1 AND field_name = ?2 AND member_id = ?3 AND time_from = ?4",
        params![owner_id, field_name, member_id, t],
    )
    .map_err(Into::into)
}

/// Delete all edges opened exactly at `t`. Returns rows deleted.
pub(crate) fn delete_edges_opened_at(
    conn: &Connection,
    owner_id: EntityId,
    field_name: &str,
    t: &str,
) -> ChronoRelResult<usize> {
    conn.execute(
        "DELETE FROM membership_edges
         WHERE owner_id = ?1 AND field_name = ?2 AND time_from = ?3",
        params![owner_id, field_name, t],
    )
    .map_err(Into::into)
}

/// Reopen edges closed exactly at `t`. Returns rows updated.
pub(crate) fn reopen_edges_closed_at(
    conn: &Connection,
    owner_id: EntityId,
    field_name: &str,
    t: &str,
) -> ChronoRelResult<usize> {
    conn.execute(
        "UPDATE membership_edges SET time_to = NULL
         WHERE owner_id = ?1 AND field_name = ?2 AND time_to = ?3",
        params![owner_id, field_name, t],
    )
    .map_err(Into::into)
}

/// Reopen edges closed exactly at `t`, skipping members that already have
/// another open edge (keeps the one-open-edge-per-member invariant).
pub(crate) fn reopen_edges_closed_at_without_open(
    conn: &Connection,
    owner_id: EntityId,
    field_name: &str,
    t: &str,
) -> ChronoRelResult<usize> {
    conn.execute(
        "UPDATE membership_edges SET time_to = NULL
         WHERE owner_id = ?1 AND field_name = ?2 AND time_to = ?3
           AND NOT EXISTS (
               SELECT 1 FROM membership_edges open
               WHERE open.owner_id = membership_edges.owner_id
                 AND open.field_name = membership_edges.field_name
                 AND open.member_id = membership_edges.member_id
                 AND open.time_to IS NULL
           )",
        params![owner_id, field_name, t],
    )
    .map_err(Into::into)
}

/// Move the closure of edges closed at `t` forward to `to`, excluding the
/// given members. Returns rows updated.
pub(crate) fn extend_closures(
    conn: &Connection,
    owner_id: EntityId,
    field_name: &str,
    t: &str,
    to: &str,
    exclude: &BTreeSet<EntityId>,
) -> ChronoRelResult<usize> {
    let not_in = if exclude.is_empty() {
        String::new()
    } else {
        format!(" AND member_id NOT IN ({})", placeholders(exclude.len()))
    };
    let sql = format!(
        "UPDATE membership_edges SET time_to = ?
         WHERE owner_id = ? AND field_name = ? AND time_to = ?{}",
        not_in
    );
    let mut params: Vec<Value> = vec![
        to.to_string().into(),
        owner_id.into(),
        field_name.to_string().into(),
        t.to_string().into(),
    ];
    params.extend(exclude.iter().map(|m| Value::from(*m)));
    conn.execute(&sql, params_from_iter(params)).map_err(Into::into)
}

/// Move the start of edges opened at `t` forward to `to`, restricted to the
/// given members. Returns rows updated.
pub(crate) fn shift_openings(
    conn: &Connection,
    owner_id: EntityId,
    field_name: &str,
    t: &str,
    to: &str,
    members: &BTreeSet<EntityId>,
) -> ChronoRelResult<usize> {
    if members.is_empty() {
        return Ok(0);
    }
    let sql = format!(
        "UPDATE membership_edges SET time_from = ?
         WHERE owner_id = ? AND field_name = ? AND time_from = ? AND member_id IN ({})",
        placeholders(members.len())
    );
    let mut params: Vec<Value> = vec![
        to.to_string().into(),
        owner_id.into(),
        field_name.to_string().into(),
        t.to_string().into(),
    ];
    params.extend(members.iter().map(|m| Value::from(*m)));
    conn.execute(&sql, params_from_iter(params)).map_err(Into::into)
}

/// Delete edges opened at `t` whose member is not in `keep`. Returns rows deleted.
pub(crate) fn delete_openings_except(
    conn: &Connection,
    owner_id: EntityId,
    field_name: &str,
    t: &str,
    keep: &BTreeSet<EntityId>,
) -> ChronoRelResult<usize> {
    let not_in = if keep.is_empty() {
        String::new()
    } else {
        format!(" AND member_id NOT IN ({})", placeholders(keep.len()))
    };
    let sql = format!(
        "DELETE FROM membership_edges
         WHERE owner_id = ? AND field_name = ? AND time_from = ?{}",
        not_in
    );
    let mut params: Vec<Value> = vec![
        owner_id.into(),
        field_name.to_string().into(),
        t.to_string().into(),
    ];
    params.extend(keep.iter().map(|m| Value::from(*m)));
    conn.execute(&sql, params_from_iter(params)).map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;

    const F: &str = "members";
    const T1: &str = "2024-01-01T00:00:00.000000Z";
    const T2: &str = "2024-01-02T00:00:00.000000Z";
    const T3: &str = "2024-01-03T00:00:00.000000Z";

    #[test]
    fn test_open_close_cycle() {
        let db = Database::in_memory().unwrap();
        db.with_conn(|conn| {
            insert_edge(conn, 1, F, 10, Some(T1))?;
            insert_edge(conn, 1, F, 11, Some(T1))?;
            assert_eq!(open_member_ids(conn, 1, F)?, BTreeSet::from([10, 11]));

            let closed = close_members(conn, 1, F, &[10], T2)?;
            assert_eq!(closed, 1);
            assert_eq!(open_member_ids(conn, 1, F)?, BTreeSet::from([11]));
            assert!(member_closed_at(conn, 1, F, 10, T2)?);
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_point_queries() {
        let db = Database::in_memory().unwrap();
        db.with_conn(|conn| {
            insert_edge(conn, 1, F, 10, Some(T1))?;
            close_members(conn, 1, F, &[10], T2)?;
            insert_edge(conn, 1, F, 11, Some(T2))?;

            let at_t1: Vec<_> = edges_were_at(conn, 1, F, T1)?
                .into_iter()
                .map(|e| e.member_id)
                .collect();
            assert_eq!(at_t1, vec![10]);

            // member 10 closed at T2 is no longer covered, member 11 is
            let at_t2: Vec<_> = edges_were_at(conn, 1, F, T2)?
                .into_iter()
                .map(|e| e.member_id)
                .collect();
            assert_eq!(at_t2, vec![11]);

            assert_eq!(edges_added_at(conn, 1, F, T2)?.len(), 1);
            assert_eq!(edges_removed_at(conn, 1, F, T2)?.len(), 1);
            assert!(edges_removed_at(conn, 1, F, T1)?.is_empty());
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_range_queries_overlap() {
        let db = Database::in_memory().unwrap();
        db.with_conn(|conn| {
            insert_edge(conn, 1, F, 10, Some(T1))?;
            close_members(conn, 1, F, &[10], T2)?;
            insert_edge(conn, 1, F, 11, Some(T3))?;

            // [T2, T3]: edge [T1, T2) ends at the range start, excluded;
            // edge [T3, ∞) starts at the range end, included
            let between: Vec<_> = edges_were_between(conn, 1, F, T2, T3)?
                .into_iter()
                .map(|e| e.member_id)
                .collect();
            assert_eq!(between, vec![11]);

            // [T1, T2] overlaps both
            let between: Vec<_> = edges_were_between(conn, 1, F, T1, T2)?
                .into_iter()
                .map(|e| e.member_id)
                .collect();
            assert_eq!(between, vec![10]);

            assert_eq!(edges_added_between(conn, 1, F, T1, T3)?.len(), 2);
            assert_eq!(edges_removed_between(conn, 1, F, T1, T3)?.len(), 1);
            assert_eq!(edges_added_between(conn, 1, F, T2, T3)?.len(), 1);
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_last_update_time() {
        let db = Database::in_memory().unwrap();
        db.with_conn(|conn| {
            assert_eq!(last_update_time(conn, 1, F)?, None);
            insert_edge(conn, 1, F, 10, Some(T1))?;
            assert_eq!(last_update_time(conn, 1, F)?.as_deref(), Some(T1));
            close_members(conn, 1, F, &[10], T3)?;
            assert_eq!(last_update_time(conn, 1, F)?.as_deref(), Some(T3));
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_mirror_close_excludes_owners() {
        let db = Database::in_memory().unwrap();
        db.with_conn(|conn| {
            // two mirror edges pointing at member 5, owned by 1 and 2
            insert_edge(conn, 1, F, 5, Some(T1))?;
            insert_edge(conn, 2, F, 5, Some(T1))?;

            let closed = close_mirrors_of(conn, F, 5, &[2], T2)?;
            assert_eq!(closed, vec![1]);
            assert_eq!(open_member_ids(conn, 2, F)?, BTreeSet::from([5]));
            assert!(open_member_ids(conn, 1, F)?.is_empty());
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_reopen_without_open_skips_readded_member() {
        let db = Database::in_memory().unwrap();
        db.with_conn(|conn| {
            // member 10: closed at T2, then re-added at T3 (open)
            insert_edge(conn, 1, F, 10, Some(T1))?;
            close_members(conn, 1, F, &[10], T2)?;
            insert_edge(conn, 1, F, 10, Some(T3))?;
            // member 11: closed at T2, never re-added
            insert_edge(conn, 1, F, 11, Some(T1))?;
            close_members(conn, 1, F, &[11], T2)?;

            let reopened = reopen_edges_closed_at_without_open(conn, 1, F, T2)?;
            assert_eq!(reopened, 1);
            assert_eq!(open_member_ids(conn, 1, F)?, BTreeSet::from([10, 11]));
            // member 10 still has exactly one open edge
            let open_10: i64 = conn.query_row(
                "SELECT COUNT(*) FROM membership_edges
                 WHERE owner_id = 1 AND field_name = ?1 AND member_id = 10 AND time_to IS NULL",
                params![F],
                |row| row.get(0),
            )?;
            assert_eq!(open_10, 1);
            Ok(())
        })
        .unwrap();
    }
}
