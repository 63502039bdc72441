//! Normalized record store.
//!
//! Every entity fetched from the API lives here exactly once, keyed by
//! [`RecordId`]. Views read records by id and subscribe to the fields they
//! render; writes go through either a server snapshot merge or a local
//! transaction that commits atomically or not at all.
//!
//! The store itself never calls listeners. Every write returns a [`Commit`]
//! which the caller notifies once it no longer holds the store, see
//! [`handle::StoreHandle`].

pub mod handle;

use crate::models::{FieldValue, Record, RecordId};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::convert::Infallible;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, trace};

pub use handle::StoreHandle;

pub type Listener = Arc<dyn Fn() + Send + Sync>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("record {0} does not exist")]
    RecordNotFound(RecordId),
    #[error("record {0} already exists")]
    AlreadyExists(RecordId),
}

/// A set of records as returned by the API, already normalized.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Snapshot {
    pub records: Vec<Record>,
}

impl Snapshot {
    pub fn new(records: Vec<Record>) -> Self {
        Self { records }
    }

    pub fn get(&self, id: &RecordId) -> Option<&Record> {
        self.records.iter().find(|r| &r.id == id)
    }
}

/// Which fields of a record a subscriber cares about.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FieldSelection {
    All,
    Only(BTreeSet<String>),
}

impl FieldSelection {
    pub fn only<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Only(fields.into_iter().map(Into::into).collect())
    }
}

/// How a single record changed in one commit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RecordChange {
    /// Created, deleted, or changed type.
    Whole,
    Fields(BTreeSet<String>),
}

impl RecordChange {
    fn touches(&self, selection: &FieldSelection) -> bool {
        match (self, selection) {
            (Self::Whole, _) | (_, FieldSelection::All) => true,
            (Self::Fields(changed), FieldSelection::Only(wanted)) => {
                changed.iter().any(|f| wanted.contains(f))
            }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(u64);

#[derive(Debug, PartialEq, Eq, Hash)]
pub struct RetainToken(u64);

struct Subscription {
    record: RecordId,
    selection: FieldSelection,
    listener: Listener,
}

/// Result of one write: what changed, and who has to hear about it.
#[must_use = "listeners only run when the commit is notified"]
#[derive(Default)]
pub struct Commit {
    pub changes: BTreeMap<RecordId, RecordChange>,
    listeners: Vec<Listener>,
}

impl Commit {
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    pub fn notify(self) {
        for listener in self.listeners {
            listener();
        }
    }
}

impl std::fmt::Debug for Commit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Commit")
            .field("changes", &self.changes)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

#[derive(Default)]
pub struct RecordStore {
    records: HashMap<RecordId, Record>,
    subscriptions: BTreeMap<SubscriptionId, Subscription>,
    retained: BTreeMap<u64, Vec<RecordId>>,
    next_subscription: u64,
    next_retain: u64,
    next_pending: u64,
}

impl RecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn read(&self, id: &RecordId) -> Option<&Record> {
        self.records.get(id)
    }

    pub fn contains(&self, id: &RecordId) -> bool {
        self.records.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records whose `field` links to `id`, in id order.
    pub fn referrers(&self, id: &RecordId, field: &str) -> Vec<RecordId> {
        let mut out: Vec<RecordId> = self
            .records
            .values()
            .filter(|r| {
                r.get(field)
                    .map(|v| v.referenced_ids().any(|linked| linked == id))
                    .unwrap_or(false)
            })
            .map(|r| r.id.clone())
            .collect();
        out.sort();
        out
    }

    /// Merges server data field by field. Fields absent from the snapshot
    /// keep their current value.
    pub fn apply_server_snapshot(&mut self, snapshot: Snapshot) -> Commit {
        let (_, commit) = self.apply_local_update(|tx| {
            tx.merge_snapshot(snapshot);
            Ok::<(), Infallible>(())
        });
        commit
    }

    /// Runs `f` against a staged copy of the touched records. If `f` returns
    /// `Ok` all staged writes land at once; on `Err` nothing does.
    pub fn apply_local_update<T, E>(
        &mut self,
        f: impl FnOnce(&mut Transaction<'_>) -> Result<T, E>,
    ) -> (Result<T, E>, Commit) {
        let (result, staged, next_pending) = {
            let mut tx = Transaction {
                base: &self.records,
                staged: BTreeMap::new(),
                next_pending: self.next_pending,
            };
            let result = f(&mut tx);
            (result, tx.staged, tx.next_pending)
        };

        // Pending ids stay unique even across rolled back transactions.
        self.next_pending = next_pending;

        match result {
            Ok(value) => {
                let commit = self.commit_staged(staged);
                (Ok(value), commit)
            }
            Err(e) => {
                trace!(staged = staged.len(), "local update rolled back");
                (Err(e), Commit::default())
            }
        }
    }

    fn commit_staged(&mut self, staged: BTreeMap<RecordId, Option<Record>>) -> Commit {
        let mut changes = BTreeMap::new();

        for (id, next) in staged {
            let change = match (self.records.get(&id), &next) {
                (None, None) => None,
                (Some(_), None) | (None, Some(_)) => Some(RecordChange::Whole),
                (Some(prev), Some(record)) => diff(prev, record),
            };
            let Some(change) = change else { continue };
            match next {
                Some(record) => self.records.insert(id.clone(), record),
                None => self.records.remove(&id),
            };
            changes.insert(id, change);
        }

        let listeners = self
            .subscriptions
            .values()
            .filter(|s| {
                changes
                    .get(&s.record)
                    .map(|c| c.touches(&s.selection))
                    .unwrap_or(false)
            })
            .map(|s| s.listener.clone())
            .collect();

        if !changes.is_empty() {
            trace!(records = changes.len(), "store commit");
        }
        Commit { changes, listeners }
    }

    pub fn subscribe(
        &mut self,
        record: RecordId,
        selection: FieldSelection,
        listener: Listener,
    ) -> SubscriptionId {
        self.next_subscription += 1;
        let id = SubscriptionId(self.next_subscription);
        self.subscriptions.insert(
            id,
            Subscription {
                record,
                selection,
                listener,
            },
        );
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.subscriptions.remove(&id).is_some()
    }

    /// Keeps `roots` and everything reachable from them alive until the
    /// token is released.
    pub fn retain(&mut self, roots: Vec<RecordId>) -> RetainToken {
        self.next_retain += 1;
        self.retained.insert(self.next_retain, roots);
        RetainToken(self.next_retain)
    }

    /// Returns false if the token was already released.
    pub fn release(&mut self, token: RetainToken) -> bool {
        self.retained.remove(&token.0).is_some()
    }

    /// Evicts every record that is unreachable from retained roots and
    /// subscribed records. An unsaved block lives as long as a reachable
    /// realm lists it.
    pub fn collect_garbage(&mut self) -> Vec<RecordId> {
        let mut stack: Vec<RecordId> = self
            .retained
            .values()
            .flatten()
            .cloned()
            .chain(self.subscriptions.values().map(|s| s.record.clone()))
            .collect();

        let mut reachable = HashSet::new();
        while let Some(id) = stack.pop() {
            if !reachable.insert(id.clone()) {
                continue;
            }
            if let Some(record) = self.records.get(&id) {
                for value in record.fields.values() {
                    stack.extend(value.referenced_ids().cloned());
                }
            }
        }

        let mut evicted: Vec<RecordId> = self
            .records
            .keys()
            .filter(|id| !reachable.contains(*id))
            .cloned()
            .collect();
        evicted.sort();
        for id in &evicted {
            self.records.remove(id);
        }
        if !evicted.is_empty() {
            debug!(evicted = evicted.len(), remaining = self.records.len(), "store gc");
        }
        evicted
    }
}

fn diff(prev: &Record, next: &Record) -> Option<RecordChange> {
    if prev.type_tag != next.type_tag {
        return Some(RecordChange::Whole);
    }
    let changed: BTreeSet<String> = prev
        .fields
        .keys()
        .chain(next.fields.keys())
        .filter(|k| prev.fields.get(*k) != next.fields.get(*k))
        .cloned()
        .collect();
    if changed.is_empty() {
        None
    } else {
        Some(RecordChange::Fields(changed))
    }
}

/// Staged writes of one local update.
///
/// Reads see staged writes first, then the committed store.
pub struct Transaction<'a> {
    base: &'a HashMap<RecordId, Record>,
    staged: BTreeMap<RecordId, Option<Record>>,
    next_pending: u64,
}

impl Transaction<'_> {
    pub fn get(&self, id: &RecordId) -> Option<&Record> {
        match self.staged.get(id) {
            Some(staged) => staged.as_ref(),
            None => self.base.get(id),
        }
    }

    fn get_mut(&mut self, id: &RecordId) -> Option<&mut Record> {
        if !self.staged.contains_key(id) {
            let copy = self.base.get(id)?.clone();
            self.staged.insert(id.clone(), Some(copy));
        }
        self.staged.get_mut(id).and_then(Option::as_mut)
    }

    /// Mints an id that no server record can ever have.
    pub fn allocate_pending_id(&mut self) -> RecordId {
        self.next_pending += 1;
        RecordId::Pending(self.next_pending)
    }

    pub fn create(&mut self, record: Record) -> Result<(), StoreError> {
        if self.get(&record.id).is_some() {
            return Err(StoreError::AlreadyExists(record.id));
        }
        self.staged.insert(record.id.clone(), Some(record));
        Ok(())
    }

    pub fn set_value(
        &mut self,
        id: &RecordId,
        field: &str,
        value: impl Into<FieldValue>,
    ) -> Result<(), StoreError> {
        let record = self
            .get_mut(id)
            .ok_or_else(|| StoreError::RecordNotFound(id.clone()))?;
        record.set(field, value.into());
        Ok(())
    }

    pub fn linked_records(&self, id: &RecordId, field: &str) -> Result<Vec<RecordId>, StoreError> {
        let record = self
            .get(id)
            .ok_or_else(|| StoreError::RecordNotFound(id.clone()))?;
        Ok(record.links(field).map(<[_]>::to_vec).unwrap_or_default())
    }

    pub fn set_linked_records(
        &mut self,
        id: &RecordId,
        field: &str,
        links: Vec<RecordId>,
    ) -> Result<(), StoreError> {
        self.set_value(id, field, FieldValue::Links(links))
    }

    /// Returns whether a record was there to delete.
    pub fn delete(&mut self, id: &RecordId) -> bool {
        let existed = self.get(id).is_some();
        self.staged.insert(id.clone(), None);
        existed
    }

    /// Field-level merge of one incoming record.
    pub fn merge_record(&mut self, incoming: Record) {
        match self.get_mut(&incoming.id) {
            Some(existing) => {
                existing.type_tag = incoming.type_tag;
                existing.fields.extend(incoming.fields);
            }
            None => {
                self.staged.insert(incoming.id.clone(), Some(incoming));
            }
        }
    }

    pub fn merge_snapshot(&mut self, snapshot: Snapshot) {
        for record in snapshot.records {
            self.merge_record(record);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{fields, REALM_TYPE};
    use proptest::prelude::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn id(s: &str) -> RecordId {
        RecordId::persisted(s)
    }

    fn realm(rid: &str, blocks: &[&str]) -> Record {
        Record::new(id(rid), REALM_TYPE)
            .with(fields::NAME, rid)
            .with(
                fields::BLOCKS,
                FieldValue::Links(blocks.iter().map(|b| id(b)).collect()),
            )
    }

    fn block(bid: &str) -> Record {
        Record::new(id(bid), "TextBlock").with(fields::CONTENT, bid)
    }

    fn counter() -> (Arc<AtomicUsize>, Listener) {
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        let listener: Listener = Arc::new(move || {
            c.fetch_add(1, Ordering::SeqCst);
        });
        (count, listener)
    }

    fn seeded() -> RecordStore {
        let mut store = RecordStore::new();
        store
            .apply_server_snapshot(Snapshot::new(vec![realm("r1", &["b1", "b2"]), block("b1"), block("b2")]))
            .notify();
        store
    }

    #[test]
    fn test_snapshot_merge_keeps_absent_fields() {
        let mut store = seeded();
        let partial = Record::new(id("r1"), REALM_TYPE).with(fields::PATH, "/r1");
        store.apply_server_snapshot(Snapshot::new(vec![partial])).notify();

        let r = store.read(&id("r1")).unwrap();
        assert_eq!(r.str(fields::NAME), Some("r1"));
        assert_eq!(r.str(fields::PATH), Some("/r1"));
    }

    #[test]
    fn test_identical_snapshot_notifies_nobody() {
        let mut store = seeded();
        let (count, listener) = counter();
        store.subscribe(id("r1"), FieldSelection::All, listener);

        let commit = store.apply_server_snapshot(Snapshot::new(vec![realm("r1", &["b1", "b2"])]));
        assert!(commit.is_empty());
        commit.notify();
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_subscribers_only_hear_about_selected_fields() {
        let mut store = seeded();
        let (blocks_count, blocks_listener) = counter();
        let (name_count, name_listener) = counter();
        store.subscribe(id("r1"), FieldSelection::only([fields::BLOCKS]), blocks_listener);
        store.subscribe(id("r1"), FieldSelection::only([fields::NAME]), name_listener);

        let (res, commit) = store.apply_local_update(|tx| {
            tx.set_linked_records(&id("r1"), fields::BLOCKS, vec![id("b2"), id("b1")])
        });
        res.unwrap();
        assert_eq!(commit.listener_count(), 1);
        commit.notify();

        assert_eq!(blocks_count.load(Ordering::SeqCst), 1);
        assert_eq!(name_count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_unsubscribed_listener_is_not_called() {
        let mut store = seeded();
        let (count, listener) = counter();
        let sub = store.subscribe(id("b1"), FieldSelection::All, listener);
        assert!(store.unsubscribe(sub));
        assert!(!store.unsubscribe(sub));

        let (_, commit) = store.apply_local_update(|tx| tx.set_value(&id("b1"), fields::CONTENT, "x"));
        commit.notify();
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_failed_update_rolls_back_every_write() {
        let mut store = seeded();
        let (res, commit) = store.apply_local_update(|tx| {
            tx.set_value(&id("b1"), fields::CONTENT, "changed")?;
            tx.delete(&id("b2"));
            tx.set_value(&id("missing"), fields::CONTENT, "boom")
        });

        assert_eq!(res, Err(StoreError::RecordNotFound(id("missing"))));
        assert!(commit.is_empty());
        assert_eq!(store.read(&id("b1")).unwrap().str(fields::CONTENT), Some("b1"));
        assert!(store.contains(&id("b2")));
    }

    #[test]
    fn test_transaction_reads_its_own_writes() {
        let mut store = seeded();
        let (res, _commit) = store.apply_local_update(|tx| {
            let pending = tx.allocate_pending_id();
            tx.create(Record::new(pending.clone(), "VideoBlock"))?;
            let mut blocks = tx.linked_records(&id("r1"), fields::BLOCKS)?;
            blocks.insert(0, pending.clone());
            tx.set_linked_records(&id("r1"), fields::BLOCKS, blocks)?;
            Ok::<_, StoreError>((pending.clone(), tx.linked_records(&id("r1"), fields::BLOCKS)?))
        });
        let (pending, seen) = res.unwrap();
        assert_eq!(seen[0], pending);
        assert_eq!(store.read(&id("r1")).unwrap().links(fields::BLOCKS).unwrap()[0], pending);
    }

    #[test]
    fn test_pending_ids_are_never_reused() {
        let mut store = RecordStore::new();
        let (first, _) = store.apply_local_update(|tx| Err::<(), _>(tx.allocate_pending_id()));
        let (second, _) = store.apply_local_update(|tx| Ok::<_, ()>(tx.allocate_pending_id()));
        assert_ne!(first.unwrap_err(), second.unwrap());
    }

    #[test]
    fn test_create_rejects_existing_ids() {
        let mut store = seeded();
        let (res, _) = store.apply_local_update(|tx| tx.create(block("b1")));
        assert_eq!(res, Err(StoreError::AlreadyExists(id("b1"))));
    }

    #[test]
    fn test_referrers() {
        let store = seeded();
        assert_eq!(store.referrers(&id("b2"), fields::BLOCKS), vec![id("r1")]);
        assert!(store.referrers(&id("r1"), fields::BLOCKS).is_empty());
    }

    #[test]
    fn test_gc_keeps_reachable_records() {
        let mut store = seeded();
        store
            .apply_server_snapshot(Snapshot::new(vec![realm("r2", &[]), block("orphan")]))
            .notify();
        let (pending, commit) = store.apply_local_update(|tx| {
            let pending = tx.allocate_pending_id();
            tx.create(Record::new(pending.clone(), "TitleBlock"))?;
            let mut blocks = tx.linked_records(&id("r1"), fields::BLOCKS)?;
            blocks.push(pending.clone());
            tx.set_linked_records(&id("r1"), fields::BLOCKS, blocks)?;
            Ok::<_, StoreError>(pending)
        });
        commit.notify();
        let pending = pending.unwrap();

        let token = store.retain(vec![id("r1")]);
        let evicted = store.collect_garbage();
        assert_eq!(evicted, vec![id("orphan"), id("r2")]);
        assert!(store.contains(&id("b1")));
        assert!(store.contains(&pending));

        assert!(store.release(token));
        let evicted = store.collect_garbage();
        assert_eq!(evicted, vec![pending, id("b1"), id("b2"), id("r1")]);
        assert!(store.is_empty());
    }

    #[test]
    fn test_gc_evicts_pending_block_dropped_by_a_refetch() {
        let mut store = seeded();
        let (pending, commit) = store.apply_local_update(|tx| {
            let pending = tx.allocate_pending_id();
            tx.create(Record::new(pending.clone(), "TextBlock"))?;
            tx.set_linked_records(&id("r1"), fields::BLOCKS, vec![pending.clone(), id("b1"), id("b2")])?;
            Ok::<_, StoreError>(pending)
        });
        commit.notify();
        let pending = pending.unwrap();
        let _token = store.retain(vec![id("r1")]);

        store.apply_server_snapshot(Snapshot::new(vec![realm("r1", &["b1", "b2"])])).notify();
        assert_eq!(store.collect_garbage(), vec![pending.clone()]);
        assert!(!store.contains(&pending));
        assert!(store.contains(&id("b1")));
    }

    #[test]
    fn test_release_is_one_shot() {
        let mut store = RecordStore::new();
        let token = store.retain(vec![id("r1")]);
        let copy = RetainToken(token.0);
        assert!(store.release(token));
        assert!(!store.release(copy));
    }

    proptest! {
        #[test]
        fn prop_failed_updates_leave_store_untouched(
            contents in proptest::collection::vec("[a-z]{0,6}", 1..8),
        ) {
            let mut store = seeded();
            let before: Vec<_> = ["r1", "b1", "b2"].iter().map(|s| store.read(&id(s)).cloned()).collect();

            let (res, commit) = store.apply_local_update(|tx| {
                for (i, c) in contents.iter().enumerate() {
                    let target = if i % 2 == 0 { "b1" } else { "b2" };
                    tx.set_value(&id(target), fields::CONTENT, c.as_str())?;
                }
                tx.delete(&id("r1"));
                Err::<(), StoreError>(StoreError::RecordNotFound(id("abort")))
            });

            prop_assert!(res.is_err());
            prop_assert!(commit.is_empty());
            let after: Vec<_> = ["r1", "b1", "b2"].iter().map(|s| store.read(&id(s)).cloned()).collect();
            prop_assert_eq!(before, after);
        }

        #[test]
        fn prop_snapshot_merge_is_idempotent(
            names in proptest::collection::vec("[a-zA-Z ]{0,10}", 1..6),
        ) {
            let records: Vec<Record> = names
                .iter()
                .enumerate()
                .map(|(i, n)| Record::new(id(&format!("r{i}")), REALM_TYPE).with(fields::NAME, n.as_str()))
                .collect();

            let mut store = RecordStore::new();
            let first = store.apply_server_snapshot(Snapshot::new(records.clone()));
            prop_assert_eq!(first.changes.len(), records.len());
            let second = store.apply_server_snapshot(Snapshot::new(records));
            prop_assert!(second.is_empty());
        }
    }
}
