//! Mutation protocol for one temporal association.
//!
//! A [`TemporalAssociation`] binds an owner entity to one named many-to-many
//! field and layers the full mutation protocol over the edge store: member
//! reference validation, a single transaction time per top-level call,
//! pre/post change events, symmetrical mirroring, and version snapshots.
//!
//! Every top-level mutation picks one transaction time `T` and performs all
//! of its writes inside one IMMEDIATE transaction. Pre-phase events are
//! emitted inside the transaction before any write; post-phase events are
//! emitted only after commit, so subscribers never observe a change that was
//! rolled back. Phases that affect no members emit nothing and record no
//! snapshot.

use chrono::{DateTime, Utc};
use rusqlite::Transaction;
use std::collections::BTreeSet;

use crate::config::AssociationConfig;
use crate::db::{fmt_time, Database};
use crate::edges::{ops, EdgeStore, MembershipEdge};
use crate::error::{ChronoRelError, ChronoRelResult};
use crate::events::{ChangeAction, EventBus, MembershipChangeEvent};
use crate::types::{EntityId, MemberRef};
use crate::versioning::{version_ops, VersionLedger, VersionSnapshot};

/// One temporal many-to-many field on one owner entity.
pub struct TemporalAssociation {
    db: Database,
    bus: EventBus,
    edges: EdgeStore,
    owner_id: EntityId,
    config: AssociationConfig,
}

impl TemporalAssociation {
    /// Bind an association handle to an owner. Fails on invalid configuration.
    pub fn new(
        db: Database,
        bus: EventBus,
        owner_id: EntityId,
        config: AssociationConfig,
    ) -> ChronoRelResult<Self> {
        config.validate()?;
        Ok(Self {
            edges: EdgeStore::new(db.clone()),
            db,
            bus,
            owner_id,
            config,
        })
    }

    pub fn owner_id(&self) -> EntityId {
        self.owner_id
    }

    pub fn field_name(&self) -> &str {
        &self.config.field_name
    }

    // ---- mutations ----

    /// Add members, opening an edge at the shared transaction time.
    ///
    /// Members already present are skipped. Returns the ids actually added;
    /// an empty result means the call was a no-op (no events, no snapshot).
    pub fn add(&self, members: &[MemberRef]) -> ChronoRelResult<BTreeSet<EntityId>> {
        let targets = self.validate_refs(members)?;
        let time = Utc::now();
        let ts = fmt_time(time);
        let mut post = Vec::new();
        let added = self
            .db
            .with_tx(|tx| self.apply_add(tx, &targets, &ts, time, &mut post))?;
        self.flush(post);
        Ok(added)
    }

    /// Remove members, closing their open edge at the shared transaction time.
    ///
    /// Members not currently present are skipped. Returns the ids actually
    /// removed.
    pub fn remove(&self, members: &[MemberRef]) -> ChronoRelResult<BTreeSet<EntityId>> {
        let targets = self.validate_refs(members)?;
        let time = Utc::now();
        let ts = fmt_time(time);
        let mut post = Vec::new();
        let removed = self
            .db
            .with_tx(|tx| self.apply_remove(tx, &targets, &ts, time, &mut post))?;
        self.flush(post);
        Ok(removed)
    }

    /// Close every open edge at the shared transaction time.
    ///
    /// Returns the ids cleared; an empty association is a no-op.
    pub fn clear(&self) -> ChronoRelResult<BTreeSet<EntityId>> {
        self.clear_except(&[])
    }

    /// Close every open edge whose member is not in `keep`.
    ///
    /// Returns the ids cleared; kept members retain their open edge.
    pub fn clear_except(&self, keep: &[MemberRef]) -> ChronoRelResult<BTreeSet<EntityId>> {
        let keep = self.validate_refs(keep)?;
        let time = Utc::now();
        let ts = fmt_time(time);
        let mut post = Vec::new();
        let cleared = self
            .db
            .with_tx(|tx| self.apply_clear(tx, &keep, &ts, time, &mut post))?;
        self.flush(post);
        Ok(cleared)
    }

    /// Replace the current member set with `members`.
    ///
    /// Runs as a clear of everything outside the target set followed by an
    /// add of what is missing, both under one transaction time. Members in
    /// both the old and new set keep their open edge untouched, so their
    /// original arrival time survives. The clear and add deltas merge into a
    /// single version snapshot.
    pub fn set(&self, members: &[MemberRef]) -> ChronoRelResult<()> {
        let targets = self.validate_refs(members)?;
        let time = Utc::now();
        let ts = fmt_time(time);
        let mut post = Vec::new();
        self.db.with_tx(|tx| {
            self.apply_clear(tx, &targets, &ts, time, &mut post)?;
            self.apply_add(tx, &targets, &ts, time, &mut post)?;
            Ok(())
        })?;
        self.flush(post);
        Ok(())
    }

    // ---- queries ----

    /// Current member ids (open edges).
    pub fn members(&self) -> ChronoRelResult<BTreeSet<EntityId>> {
        self.edges.query_open(self.owner_id, &self.config.field_name)
    }

    /// Member ids present at instant `t`.
    pub fn were_at(&self, t: DateTime<Utc>) -> ChronoRelResult<BTreeSet<EntityId>> {
        self.edges.were_at(self.owner_id, &self.config.field_name, t)
    }

    /// Edge records present at instant `t`, one per member.
    pub fn were_at_edges(&self, t: DateTime<Utc>) -> ChronoRelResult<Vec<MembershipEdge>> {
        self.edges
            .were_at_edges(self.owner_id, &self.config.field_name, t)
    }

    /// Member ids added exactly at `t`.
    pub fn added_at(&self, t: DateTime<Utc>) -> ChronoRelResult<BTreeSet<EntityId>> {
        self.edges.added_at(self.owner_id, &self.config.field_name, t)
    }

    /// Edge records opened exactly at `t`.
    pub fn added_at_edges(&self, t: DateTime<Utc>) -> ChronoRelResult<Vec<MembershipEdge>> {
        self.edges
            .added_at_edges(self.owner_id, &self.config.field_name, t)
    }

    /// Member ids removed exactly at `t`.
    pub fn removed_at(&self, t: DateTime<Utc>) -> ChronoRelResult<BTreeSet<EntityId>> {
        self.edges
            .removed_at(self.owner_id, &self.config.field_name, t)
    }

    /// Edge records closed exactly at `t`.
    pub fn removed_at_edges(&self, t: DateTime<Utc>) -> ChronoRelResult<Vec<MembershipEdge>> {
        self.edges
            .removed_at_edges(self.owner_id, &self.config.field_name, t)
    }

    /// Member ids present at any point within `[t1, t2]`.
    pub fn were_between(
        &self,
        t1: DateTime<Utc>,
        t2: DateTime<Utc>,
    ) -> ChronoRelResult<BTreeSet<EntityId>> {
        self.edges
            .were_between(self.owner_id, &self.config.field_name, t1, t2)
    }

    /// Edge records overlapping `[t1, t2]`, one per member.
    pub fn were_between_edges(
        &self,
        t1: DateTime<Utc>,
        t2: DateTime<Utc>,
    ) -> ChronoRelResult<Vec<MembershipEdge>> {
        self.edges
            .were_between_edges(self.owner_id, &self.config.field_name, t1, t2)
    }

    /// Member ids added within `[t1, t2]` inclusive.
    pub fn added_between(
        &self,
        t1: DateTime<Utc>,
        t2: DateTime<Utc>,
    ) -> ChronoRelResult<BTreeSet<EntityId>> {
        self.edges
            .added_between(self.owner_id, &self.config.field_name, t1, t2)
    }

    /// Edge records opened within `[t1, t2]`.
    pub fn added_between_edges(
        &self,
        t1: DateTime<Utc>,
        t2: DateTime<Utc>,
    ) -> ChronoRelResult<Vec<MembershipEdge>> {
        self.edges
            .added_between_edges(self.owner_id, &self.config.field_name, t1, t2)
    }

    /// Member ids removed within `[t1, t2]` inclusive.
    pub fn removed_between(
        &self,
        t1: DateTime<Utc>,
        t2: DateTime<Utc>,
    ) -> ChronoRelResult<BTreeSet<EntityId>> {
        self.edges
            .removed_between(self.owner_id, &self.config.field_name, t1, t2)
    }

    /// Edge records closed within `[t1, t2]`.
    pub fn removed_between_edges(
        &self,
        t1: DateTime<Utc>,
        t2: DateTime<Utc>,
    ) -> ChronoRelResult<Vec<MembershipEdge>> {
        self.edges
            .removed_between_edges(self.owner_id, &self.config.field_name, t1, t2)
    }

    /// The most recent mutation instant of this association, if any.
    pub fn last_update_time(&self) -> ChronoRelResult<Option<DateTime<Utc>>> {
        self.edges
            .last_update_time(self.owner_id, &self.config.field_name)
    }

    // ---- versions ----

    /// Version ledger handle over this association's backing store.
    pub fn ledger(&self) -> VersionLedger {
        VersionLedger::new(self.db.clone())
    }

    /// All recorded snapshots of this association, ascending by time.
    pub fn versions(&self) -> ChronoRelResult<Vec<VersionSnapshot>> {
        self.ledger().list(self.owner_id, &self.config.field_name)
    }

    /// Delete the snapshot at `time`, reflowing edges when it is not the last.
    pub fn delete_version(&self, time: DateTime<Utc>) -> ChronoRelResult<()> {
        self.ledger()
            .delete(self.owner_id, &self.config.field_name, time)
    }

    // ---- internals ----

    /// Resolve member references to ids, rejecting kind and store mismatches.
    /// Bare ids pass through unchecked.
    fn validate_refs(&self, members: &[MemberRef]) -> ChronoRelResult<BTreeSet<EntityId>> {
        let mut ids = BTreeSet::new();
        for member in members {
            if let (Some(expected), Some(actual)) =
                (self.config.member_kind.as_deref(), member.kind.as_deref())
            {
                if expected != actual {
                    return Err(ChronoRelError::type_mismatch(expected, actual));
                }
            }
            if let Some(store) = member.store.as_deref() {
                if store != self.db.store_tag() {
                    return Err(ChronoRelError::cross_store(self.db.store_tag(), store));
                }
            }
            ids.insert(member.id);
        }
        Ok(ids)
    }

    fn apply_add(
        &self,
        tx: &Transaction<'_>,
        targets: &BTreeSet<EntityId>,
        ts: &str,
        time: DateTime<Utc>,
        post: &mut Vec<MembershipChangeEvent>,
    ) -> ChronoRelResult<BTreeSet<EntityId>> {
        let field = self.config.field_name.as_str();
        let open = ops::open_member_ids(tx, self.owner_id, field)?;
        let missing: BTreeSet<EntityId> = targets.difference(&open).copied().collect();
        if missing.is_empty() {
            return Ok(missing);
        }

        self.bus
            .emit(self.event(ChangeAction::PreAdd, &missing, time));
        for member in &missing {
            ops::insert_edge(tx, self.owner_id, field, *member, Some(ts))?;
            if self.config.symmetrical
                && ops::open_edge_start(tx, *member, field, self.owner_id)?.is_none()
            {
                ops::insert_edge(tx, *member, field, self.owner_id, Some(ts))?;
            }
        }
        self.record_version(tx, ts, Some(missing.len()), None)?;

        tracing::debug!(
            owner_id = self.owner_id,
            field,
            added = missing.len(),
            "opened membership edges"
        );
        post.push(self.event(ChangeAction::PostAdd, &missing, time));
        Ok(missing)
    }

    fn apply_remove(
        &self,
        tx: &Transaction<'_>,
        targets: &BTreeSet<EntityId>,
        ts: &str,
        time: DateTime<Utc>,
        post: &mut Vec<MembershipChangeEvent>,
    ) -> ChronoRelResult<BTreeSet<EntityId>> {
        let field = self.config.field_name.as_str();
        let open = ops::open_member_ids(tx, self.owner_id, field)?;
        let present: BTreeSet<EntityId> = targets.intersection(&open).copied().collect();
        if present.is_empty() {
            return Ok(present);
        }

        self.bus
            .emit(self.event(ChangeAction::PreRemove, &present, time));
        let members: Vec<EntityId> = present.iter().copied().collect();
        ops::close_members(tx, self.owner_id, field, &members, ts)?;
        if self.config.symmetrical {
            for member in &present {
                ops::close_members(tx, *member, field, &[self.owner_id], ts)?;
            }
        }
        self.record_version(tx, ts, None, Some(present.len()))?;

        tracing::debug!(
            owner_id = self.owner_id,
            field,
            removed = present.len(),
            "closed membership edges"
        );
        post.push(self.event(ChangeAction::PostRemove, &present, time));
        Ok(present)
    }

    /// Close every open edge whose member is not in `keep`.
    fn apply_clear(
        &self,
        tx: &Transaction<'_>,
        keep: &BTreeSet<EntityId>,
        ts: &str,
        time: DateTime<Utc>,
        post: &mut Vec<MembershipChangeEvent>,
    ) -> ChronoRelResult<BTreeSet<EntityId>> {
        let field = self.config.field_name.as_str();
        let open = ops::open_member_ids(tx, self.owner_id, field)?;
        let cleared: BTreeSet<EntityId> = open.difference(keep).copied().collect();
        if cleared.is_empty() {
            return Ok(cleared);
        }

        self.bus
            .emit(self.event(ChangeAction::PreClear, &cleared, time));
        let members: Vec<EntityId> = cleared.iter().copied().collect();
        ops::close_members(tx, self.owner_id, field, &members, ts)?;
        if self.config.symmetrical {
            let survivors: Vec<EntityId> = keep.iter().copied().collect();
            ops::close_mirrors_of(tx, field, self.owner_id, &survivors, ts)?;
        }
        self.record_version(tx, ts, None, Some(cleared.len()))?;

        tracing::debug!(
            owner_id = self.owner_id,
            field,
            cleared = cleared.len(),
            "cleared membership edges"
        );
        post.push(self.event(ChangeAction::PostClear, &cleared, time));
        Ok(cleared)
    }

    /// Upsert the snapshot at `ts` when versioning is enabled. Partial deltas
    /// from phases sharing one transaction time merge into one row.
    fn record_version(
        &self,
        tx: &Transaction<'_>,
        ts: &str,
        added: Option<usize>,
        removed: Option<usize>,
    ) -> ChronoRelResult<()> {
        if !self.config.versions {
            return Ok(());
        }
        let field = self.config.field_name.as_str();
        let count = ops::open_member_ids(tx, self.owner_id, field)?.len();
        version_ops::upsert_version(tx, self.owner_id, field, ts, count, added, removed)
    }

    fn event(
        &self,
        action: ChangeAction,
        member_ids: &BTreeSet<EntityId>,
        time: DateTime<Utc>,
    ) -> MembershipChangeEvent {
        MembershipChangeEvent::new(
            self.owner_id,
            &self.config.field_name,
            action,
            member_ids.clone(),
            time,
        )
    }

    fn flush(&self, events: Vec<MembershipChangeEvent>) {
        for event in events {
            self.bus.emit(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn refs(ids: &[EntityId]) -> Vec<MemberRef> {
        ids.iter().map(|id| MemberRef::new(*id)).collect()
    }

    fn assoc(config: AssociationConfig) -> TemporalAssociation {
        let db = Database::in_memory().unwrap();
        TemporalAssociation::new(db, EventBus::new(), 1, config).unwrap()
    }

    fn versioned() -> TemporalAssociation {
        assoc(AssociationConfig::new("publications").with_versions())
    }

    #[test]
    fn test_invalid_config_rejected() {
        let db = Database::in_memory().unwrap();
        let result = TemporalAssociation::new(db, EventBus::new(), 1, AssociationConfig::default());
        assert!(matches!(result, Err(ChronoRelError::Configuration(_))));
    }

    #[test]
    fn test_add_skips_present_members() {
        let a = versioned();
        assert_eq!(a.add(&refs(&[10, 11])).unwrap(), BTreeSet::from([10, 11]));
        // re-adding 10 is a no-op for it; only 12 is new
        assert_eq!(a.add(&refs(&[10, 12])).unwrap(), BTreeSet::from([12]));
        assert_eq!(a.members().unwrap(), BTreeSet::from([10, 11, 12]));
        // member 10 still has exactly one edge
        assert_eq!(a.versions().unwrap().len(), 2);
    }

    #[test]
    fn test_remove_skips_absent_members() {
        let a = versioned();
        a.add(&refs(&[10, 11])).unwrap();
        assert_eq!(a.remove(&refs(&[11, 99])).unwrap(), BTreeSet::from([11]));
        assert_eq!(a.members().unwrap(), BTreeSet::from([10]));
        // removing nothing records nothing
        assert!(a.remove(&refs(&[99])).unwrap().is_empty());
        assert_eq!(a.versions().unwrap().len(), 2);
    }

    #[test]
    fn test_clear_closes_everything() {
        let a = versioned();
        a.add(&refs(&[10, 11])).unwrap();
        assert_eq!(a.clear().unwrap(), BTreeSet::from([10, 11]));
        assert!(a.members().unwrap().is_empty());
        // clearing an empty association is a no-op
        assert!(a.clear().unwrap().is_empty());
        assert_eq!(a.versions().unwrap().len(), 2);
        let last = a.ledger().last(1, "publications").unwrap().unwrap();
        assert_eq!(last.count, 0);
        assert_eq!(last.removed_count, 2);
    }

    #[test]
    fn test_clear_except_keeps_listed_members() {
        let a = versioned();
        a.add(&refs(&[10, 11, 12])).unwrap();
        assert_eq!(
            a.clear_except(&refs(&[11])).unwrap(),
            BTreeSet::from([10, 12])
        );
        assert_eq!(a.members().unwrap(), BTreeSet::from([11]));
        let last = a.ledger().last(1, "publications").unwrap().unwrap();
        assert_eq!(last.count, 1);
        assert_eq!(last.removed_count, 2);
    }

    #[test]
    fn test_set_keeps_surviving_open_edges() {
        let a = versioned();
        a.add(&refs(&[10, 11])).unwrap();
        let arrival = a.were_at_edges(Utc::now()).unwrap()[0].time_from;

        a.set(&refs(&[10, 12])).unwrap();

        assert_eq!(a.members().unwrap(), BTreeSet::from([10, 12]));
        // member 10 was in both sets: its open edge is untouched
        let edges = a.were_at_edges(Utc::now()).unwrap();
        let kept = edges.iter().find(|e| e.member_id == 10).unwrap();
        assert_eq!(kept.time_from, arrival);
        assert!(kept.is_open());
    }

    #[test]
    fn test_set_merges_deltas_into_one_snapshot() {
        let a = versioned();
        a.add(&refs(&[10, 11])).unwrap();
        a.set(&refs(&[10, 12, 13])).unwrap();

        let versions = a.versions().unwrap();
        assert_eq!(versions.len(), 2);
        let last = &versions[1];
        assert_eq!(last.count, 3);
        assert_eq!(last.added_count, 2); // 12, 13
        assert_eq!(last.removed_count, 1); // 11
    }

    #[test]
    fn test_set_equal_to_current_is_noop() {
        let a = versioned();
        a.add(&refs(&[10, 11])).unwrap();
        a.set(&refs(&[10, 11])).unwrap();
        assert_eq!(a.versions().unwrap().len(), 1);
    }

    #[test]
    fn test_type_mismatch_rejected() {
        let a = assoc(AssociationConfig::new("friends").member_kind("user"));
        let err = a.add(&[MemberRef::typed(5, "group")]).unwrap_err();
        assert!(matches!(err, ChronoRelError::TypeMismatch { .. }));
        // bare ids and matching kinds pass
        a.add(&[MemberRef::new(5), MemberRef::typed(6, "user")])
            .unwrap();
    }

    #[test]
    fn test_cross_store_rejected() {
        let a = assoc(AssociationConfig::new("friends"));
        let err = a
            .add(&[MemberRef::new(5).bound_to("replica")])
            .unwrap_err();
        assert!(matches!(err, ChronoRelError::CrossStore { .. }));
        a.add(&[MemberRef::new(5).bound_to("default")]).unwrap();
    }

    #[test]
    fn test_validation_failure_writes_nothing() {
        let a = assoc(AssociationConfig::new("friends").member_kind("user"));
        let result = a.add(&[MemberRef::new(5), MemberRef::typed(6, "group")]);
        assert!(result.is_err());
        assert!(a.members().unwrap().is_empty());
    }

    #[test]
    fn test_symmetrical_mirrors_add_and_remove() {
        let db = Database::in_memory().unwrap();
        let bus = EventBus::new();
        let config = AssociationConfig::new("friends").symmetrical();
        let alice = TemporalAssociation::new(db.clone(), bus.clone(), 1, config.clone()).unwrap();
        let bob = TemporalAssociation::new(db, bus, 2, config).unwrap();

        alice.add(&refs(&[2])).unwrap();
        assert_eq!(bob.members().unwrap(), BTreeSet::from([1]));

        bob.remove(&refs(&[1])).unwrap();
        assert!(alice.members().unwrap().is_empty());
        assert!(bob.members().unwrap().is_empty());
    }

    #[test]
    fn test_symmetrical_clear_closes_mirrors() {
        let db = Database::in_memory().unwrap();
        let bus = EventBus::new();
        let config = AssociationConfig::new("friends").symmetrical();
        let alice = TemporalAssociation::new(db.clone(), bus.clone(), 1, config.clone()).unwrap();
        let bob = TemporalAssociation::new(db.clone(), bus.clone(), 2, config.clone()).unwrap();
        let carol = TemporalAssociation::new(db, bus, 3, config).unwrap();

        alice.add(&refs(&[2, 3])).unwrap();
        alice.clear().unwrap();

        assert!(bob.members().unwrap().is_empty());
        assert!(carol.members().unwrap().is_empty());
    }

    #[test]
    fn test_events_carry_affected_members_only() {
        let db = Database::in_memory().unwrap();
        let bus = EventBus::new();
        let mut sub = bus.subscribe();
        let a = TemporalAssociation::new(db, bus, 1, AssociationConfig::new("members")).unwrap();

        a.add(&refs(&[10])).unwrap();
        a.add(&refs(&[10, 11])).unwrap();

        let expected = [
            (ChangeAction::PreAdd, BTreeSet::from([10])),
            (ChangeAction::PostAdd, BTreeSet::from([10])),
            (ChangeAction::PreAdd, BTreeSet::from([11])),
            (ChangeAction::PostAdd, BTreeSet::from([11])),
        ];
        for (action, ids) in expected {
            let event = sub.try_recv().unwrap();
            assert_eq!(event.action, action);
            assert_eq!(event.member_ids, ids);
        }
        assert!(sub.try_recv().is_none());
    }

    #[test]
    fn test_set_emits_clear_then_add_with_one_time() {
        let db = Database::in_memory().unwrap();
        let bus = EventBus::new();
        let mut sub = bus.subscribe();
        let a = TemporalAssociation::new(db, bus, 1, AssociationConfig::new("members")).unwrap();

        a.add(&refs(&[10])).unwrap();
        while sub.try_recv().is_some() {}

        a.set(&refs(&[11])).unwrap();
        let actions: Vec<ChangeAction> = std::iter::from_fn(|| sub.try_recv())
            .map(|e| e.action)
            .collect();
        assert_eq!(
            actions,
            vec![
                ChangeAction::PreClear,
                ChangeAction::PreAdd,
                ChangeAction::PostClear,
                ChangeAction::PostAdd,
            ]
        );
    }

    #[test]
    fn test_noop_mutation_emits_nothing() {
        let db = Database::in_memory().unwrap();
        let bus = EventBus::new();
        let mut sub = bus.subscribe();
        let a = TemporalAssociation::new(db, bus, 1, AssociationConfig::new("members")).unwrap();

        a.remove(&refs(&[99])).unwrap();
        a.clear().unwrap();
        assert!(sub.try_recv().is_none());
    }

    #[test]
    fn test_version_snapshot_per_effective_mutation() {
        let a = versioned();
        a.add(&refs(&[10])).unwrap();
        a.add(&refs(&[11, 12])).unwrap();
        a.remove(&refs(&[10])).unwrap();

        let versions = a.versions().unwrap();
        assert_eq!(versions.len(), 3);
        assert_eq!(
            versions.iter().map(|v| v.count).collect::<Vec<_>>(),
            vec![1, 3, 2]
        );
        assert_eq!(versions[1].added_count, 2);
        assert_eq!(versions[2].removed_count, 1);

        // snapshot member resolution goes through the edge intervals
        let ledger = a.ledger();
        assert_eq!(
            ledger.items(&versions[1]).unwrap(),
            BTreeSet::from([10, 11, 12])
        );
        assert_eq!(ledger.added(&versions[2]).unwrap(), BTreeSet::<i64>::new());
        assert_eq!(ledger.removed(&versions[2]).unwrap(), BTreeSet::from([10]));
    }

    #[test]
    fn test_versions_disabled_records_nothing() {
        let a = assoc(AssociationConfig::new("members"));
        a.add(&refs(&[10])).unwrap();
        a.clear().unwrap();
        assert!(a.versions().unwrap().is_empty());
    }
}
