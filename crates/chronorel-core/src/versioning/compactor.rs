//! Reflow of membership edges after an out-of-order snapshot deletion.
//!
//! Deleting a snapshot erases one recorded instant from history; the edges
//! that were opened or closed at that instant must be re-spliced so every
//! remaining snapshot still reconstructs correctly. The three positional
//! cases (only / first / last / middle snapshot) each run as one batch of
//! read-then-write steps inside a single IMMEDIATE transaction.

use chrono::{DateTime, Utc};
use std::collections::BTreeSet;

use crate::db::{fmt_time, Database};
use crate::edges::ops as edge_ops;
use crate::error::{ChronoRelError, ChronoRelResult};
use crate::types::EntityId;
use crate::versioning::version_ops;

/// Delete the snapshot at `time`, reflowing the association's edges.
pub(crate) fn delete_version(
    db: &Database,
    owner_id: EntityId,
    field_name: &str,
    time: DateTime<Utc>,
) -> ChronoRelResult<()> {
    let ts = fmt_time(time);
    db.with_tx(|tx| {
        if version_ops::get_version(tx, owner_id, field_name, &ts)?.is_none() {
            return Err(ChronoRelError::version_not_found(owner_id, field_name, time));
        }

        let prev = version_ops::prev_version(tx, owner_id, field_name, &ts)?;
        let next = version_ops::next_version(tx, owner_id, field_name, &ts)?;

        match (prev, next) {
            (None, None) => {
                // only snapshot: the association has no recorded history left
                tracing::debug!(owner_id, field_name, "deleting only snapshot, full edge reset");
                edge_ops::delete_all_edges(tx, owner_id, field_name)?;
            }
            (Some(_), None) => {
                // last snapshot: arrivals never happened, departures are undone
                tracing::debug!(owner_id, field_name, time = %ts, "deleting last snapshot");
                edge_ops::delete_edges_opened_at(tx, owner_id, field_name, &ts)?;
                edge_ops::reopen_edges_closed_at(tx, owner_id, field_name, &ts)?;
            }
            (None, Some(_)) => {
                // first snapshot: same treatment, but a departure is only
                // undone when the member was not re-added later
                tracing::debug!(owner_id, field_name, time = %ts, "deleting first snapshot");
                edge_ops::delete_edges_opened_at(tx, owner_id, field_name, &ts)?;
                edge_ops::reopen_edges_closed_at_without_open(tx, owner_id, field_name, &ts)?;
            }
            (Some(_), Some(next)) => {
                reflow_middle(tx, owner_id, field_name, &ts, &fmt_time(next.time))?;
            }
        }

        version_ops::delete_version_row(tx, owner_id, field_name, &ts)?;
        Ok(())
    })
}

/// Splice out a mid-sequence instant, merging its interval into `next`.
fn reflow_middle(
    tx: &rusqlite::Transaction<'_>,
    owner_id: EntityId,
    field_name: &str,
    ts: &str,
    next_ts: &str,
) -> ChronoRelResult<()> {
    tracing::debug!(owner_id, field_name, time = %ts, next = %next_ts, "reflowing middle snapshot");

    // Members who left at the deleted instant and re-entered at next: merge
    // the two intervals, carrying the later edge's closure (possibly open).
    let closed_here = edge_ops::members_closed_at(tx, owner_id, field_name, ts)?;
    let reopened_at_next = edge_ops::members_opened_at(tx, owner_id, field_name, next_ts)?;
    for member in closed_here.intersection(&reopened_at_next) {
        let later_closure = edge_ops::closure_of_edge_opened_at(
            tx, owner_id, field_name, *member, next_ts,
        )?
        .ok_or_else(|| {
            ChronoRelError::Internal(format!(
                "edge opened at {} vanished during reflow for member {}",
                next_ts, member
            ))
        })?;
        edge_ops::repoint_closure(
            tx,
            owner_id,
            field_name,
            *member,
            ts,
            later_closure.as_deref(),
        )?;
        edge_ops::delete_edge_opened_at(tx, owner_id, field_name, *member, next_ts)?;
    }

    // Membership as of next's instant, after the merge.
    let current_at_next: BTreeSet<EntityId> =
        edge_ops::edges_were_at(tx, owner_id, field_name, next_ts)?
            .into_iter()
            .map(|e| e.member_id)
            .collect();

    // Members who left here and are absent at next: they stay through the
    // gap and leave at next instead.
    edge_ops::extend_closures(tx, owner_id, field_name, ts, next_ts, &current_at_next)?;

    // Members who entered here and are absent at next never persisted past
    // the deleted instant.
    edge_ops::delete_openings_except(tx, owner_id, field_name, ts, &current_at_next)?;

    // Members who entered here and are present at next entered at next.
    let remaining_openings = edge_ops::members_opened_at(tx, owner_id, field_name, ts)?;
    edge_ops::shift_openings(
        tx,
        owner_id,
        field_name,
        ts,
        next_ts,
        &remaining_openings,
    )?;

    // The merged edge set changes next's deltas; its count does not change.
    let added = edge_ops::members_opened_at(tx, owner_id, field_name, next_ts)?.len();
    let removed = edge_ops::members_closed_at(tx, owner_id, field_name, next_ts)?.len();
    version_ops::set_delta_counts(tx, owner_id, field_name, next_ts, added, removed)?;
    Ok(())
}
