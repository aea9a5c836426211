//! Public edge store: interval writes and temporal queries.

use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet};

use crate::db::{fmt_time, parse_time, Database};
use crate::edges::{ops, MembershipEdge};
use crate::error::{ChronoRelError, ChronoRelResult};
use crate::types::EntityId;

/// Persistent store of membership interval edges with a temporal query
/// surface.
///
/// Writes here are edge-level primitives; the mutation protocol in
/// [`crate::association::TemporalAssociation`] layers add/remove/clear
/// semantics, events, and versioning on top. Queries return deduplicated
/// member id sets; each has an `_edges` sibling returning one full record per
/// member.
pub struct EdgeStore {
    db: Database,
}

impl EdgeStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Open a new edge at `at`.
    ///
    /// Fails with `DuplicateEdge` if the member already has an open edge,
    /// unless that edge was opened at exactly `at` (idempotent re-call).
    pub fn open_edge(
        &self,
        owner_id: EntityId,
        field_name: &str,
        member_id: EntityId,
        at: DateTime<Utc>,
    ) -> ChronoRelResult<()> {
        let ts = fmt_time(at);
        self.db.with_tx(|tx| {
            match ops::open_edge_start(tx, owner_id, field_name, member_id)? {
                Some(start) if start.as_deref() == Some(ts.as_str()) => Ok(()),
                Some(_) => Err(ChronoRelError::duplicate_edge(
                    owner_id, field_name, member_id,
                )),
                None => ops::insert_edge(tx, owner_id, field_name, member_id, Some(&ts)),
            }
        })
    }

    /// Close the member's open edge at `at`.
    ///
    /// An edge already closed at exactly `at` makes the call an idempotent
    /// no-op, even when the member has since been re-added. Fails with
    /// `NoOpenEdge` when no open edge exists, and also when the open edge
    /// started at or after `at` — a close can only land after its opening.
    pub fn close_edge(
        &self,
        owner_id: EntityId,
        field_name: &str,
        member_id: EntityId,
        at: DateTime<Utc>,
    ) -> ChronoRelResult<()> {
        let ts = fmt_time(at);
        self.db.with_tx(|tx| {
            // replayed close: leave any newer open edge untouched
            if ops::member_closed_at(tx, owner_id, field_name, member_id, &ts)? {
                return Ok(());
            }
            match ops::open_edge_start(tx, owner_id, field_name, member_id)? {
                Some(Some(start)) if start.as_str() >= ts.as_str() => Err(
                    ChronoRelError::no_open_edge(owner_id, field_name, member_id),
                ),
                Some(_) => {
                    ops::close_members(tx, owner_id, field_name, &[member_id], &ts)?;
                    Ok(())
                }
                None => Err(ChronoRelError::no_open_edge(owner_id, field_name, member_id)),
            }
        })
    }

    /// Member ids with an open edge (current membership).
    pub fn query_open(
        &self,
        owner_id: EntityId,
        field_name: &str,
    ) -> ChronoRelResult<BTreeSet<EntityId>> {
        self.db
            .with_conn(|conn| ops::open_member_ids(conn, owner_id, field_name))
    }

    /// Members whose interval covers instant `t`.
    pub fn were_at(
        &self,
        owner_id: EntityId,
        field_name: &str,
        t: DateTime<Utc>,
    ) -> ChronoRelResult<BTreeSet<EntityId>> {
        Ok(member_ids(self.were_at_edges(owner_id, field_name, t)?))
    }

    /// Full edge records covering instant `t`, one per member.
    pub fn were_at_edges(
        &self,
        owner_id: EntityId,
        field_name: &str,
        t: DateTime<Utc>,
    ) -> ChronoRelResult<Vec<MembershipEdge>> {
        let ts = fmt_time(t);
        self.db
            .with_conn(|conn| ops::edges_were_at(conn, owner_id, field_name, &ts))
            .map(dedup_by_member)
    }

    /// Members added exactly at `t`.
    pub fn added_at(
        &self,
        owner_id: EntityId,
        field_name: &str,
        t: DateTime<Utc>,
    ) -> ChronoRelResult<BTreeSet<EntityId>> {
        Ok(member_ids(self.added_at_edges(owner_id, field_name, t)?))
    }

    /// Full edge records opened exactly at `t`, one per member.
    pub fn added_at_edges(
        &self,
        owner_id: EntityId,
        field_name: &str,
        t: DateTime<Utc>,
    ) -> ChronoRelResult<Vec<MembershipEdge>> {
        let ts = fmt_time(t);
        self.db
            .with_conn(|conn| ops::edges_added_at(conn, owner_id, field_name, &ts))
            .map(dedup_by_member)
    }

    /// Members removed exactly at `t`.
    pub fn removed_at(
        &self,
        owner_id: EntityId,
        field_name: &str,
        t: DateTime<Utc>,
    ) -> ChronoRelResult<BTreeSet<EntityId>> {
        Ok(member_ids(self.removed_at_edges(owner_id, field_name, t)?))
    }

    /// Full edge records closed exactly at `t`, one per member.
    pub fn removed_at_edges(
        &self,
        owner_id: EntityId,
        field_name: &str,
        t: DateTime<Utc>,
    ) -> ChronoRelResult<Vec<MembershipEdge>> {
        let ts = fmt_time(t);
        self.db
            .with_conn(|conn| ops::edges_removed_at(conn, owner_id, field_name, &ts))
            .map(dedup_by_member)
    }

    /// Members whose interval overlaps `[t1, t2]`. Requires `t2 > t1`.
    pub fn were_between(
        &self,
        owner_id: EntityId,
        field_name: &str,
        t1: DateTime<Utc>,
        t2: DateTime<Utc>,
    ) -> ChronoRelResult<BTreeSet<EntityId>> {
        Ok(member_ids(self.were_between_edges(owner_id, field_name, t1, t2)?))
    }

    /// Full edge records overlapping `[t1, t2]`, one per member.
    pub fn were_between_edges(
        &self,
        owner_id: EntityId,
        field_name: &str,
        t1: DateTime<Utc>,
        t2: DateTime<Utc>,
    ) -> ChronoRelResult<Vec<MembershipEdge>> {
        let (ts1, ts2) = check_range(t1, t2)?;
        self.db
            .with_conn(|conn| ops::edges_were_between(conn, owner_id, field_name, &ts1, &ts2))
            .map(dedup_by_member)
    }

    /// Members added within `[t1, t2]` inclusive. Requires `t2 > t1`.
    pub fn added_between(
        &self,
        owner_id: EntityId,
        field_name: &str,
        t1: DateTime<Utc>,
        t2: DateTime<Utc>,
    ) -> ChronoRelResult<BTreeSet<EntityId>> {
        Ok(member_ids(self.added_between_edges(owner_id, field_name, t1, t2)?))
    }

    /// Full edge records opened within `[t1, t2]`, one per member.
    pub fn added_between_edges(
        &self,
        owner_id: EntityId,
        field_name: &str,
        t1: DateTime<Utc>,
        t2: DateTime<Utc>,
    ) -> ChronoRelResult<Vec<MembershipEdge>> {
        let (ts1, ts2) = check_range(t1, t2)?;
        self.db
            .with_conn(|conn| ops::edges_added_between(conn, owner_id, field_name, &ts1, &ts2))
            .map(dedup_by_member)
    }

    /// Members removed within `[t1, t2]` inclusive. Requires `t2 > t1`.
    pub fn removed_between(
        &self,
        owner_id: EntityId,
        field_name: &str,
        t1: DateTime<Utc>,
        t2: DateTime<Utc>,
    ) -> ChronoRelResult<BTreeSet<EntityId>> {
        Ok(member_ids(self.removed_between_edges(owner_id, field_name, t1, t2)?))
    }

    /// Full edge records closed within `[t1, t2]`, one per member.
    pub fn removed_between_edges(
        &self,
        owner_id: EntityId,
        field_name: &str,
        t1: DateTime<Utc>,
        t2: DateTime<Utc>,
    ) -> ChronoRelResult<Vec<MembershipEdge>> {
        let (ts1, ts2) = check_range(t1, t2)?;
        self.db
            .with_conn(|conn| ops::edges_removed_between(conn, owner_id, field_name, &ts1, &ts2))
            .map(dedup_by_member)
    }

    /// The most recent mutation instant of the association, if any.
    pub fn last_update_time(
        &self,
        owner_id: EntityId,
        field_name: &str,
    ) -> ChronoRelResult<Option<DateTime<Utc>>> {
        let raw = self
            .db
            .with_conn(|conn| ops::last_update_time(conn, owner_id, field_name))?;
        raw.as_deref().map(parse_time).transpose()
    }
}

fn check_range(t1: DateTime<Utc>, t2: DateTime<Utc>) -> ChronoRelResult<(String, String)> {
    if t2 <= t1 {
        return Err(ChronoRelError::invalid_range(t1, t2));
    }
    Ok((fmt_time(t1), fmt_time(t2)))
}

fn member_ids(edges: Vec<MembershipEdge>) -> BTreeSet<EntityId> {
    edges.into_iter().map(|e| e.member_id).collect()
}

/// Collapse multiple matching edges per member into one record, keeping the
/// earliest interval.
fn dedup_by_member(edges: Vec<MembershipEdge>) -> Vec<MembershipEdge> {
    let mut by_member: BTreeMap<EntityId, MembershipEdge> = BTreeMap::new();
    for edge in edges {
        by_member.entry(edge.member_id).or_insert(edge);
    }
    by_member.into_values().collect()
}
