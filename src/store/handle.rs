use super::{Commit, FieldSelection, Listener, RecordStore, RetainToken, Snapshot, SubscriptionId, Transaction};
use crate::models::{Record, RecordId};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Shared handle to the one store of the application.
///
/// Listeners are called after the lock is dropped, so a listener may read
/// the store again.
#[derive(Clone, Default)]
pub struct StoreHandle {
    inner: Arc<Mutex<RecordStore>>,
}

impl StoreHandle {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, RecordStore> {
        // A panicking listener never runs under the lock, so a poisoned
        // store still holds consistent data.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn commit<R>(&self, f: impl FnOnce(&mut RecordStore) -> (R, Commit)) -> R {
        let (out, commit) = {
            let mut store = self.lock();
            f(&mut store)
        };
        commit.notify();
        out
    }

    pub fn read<R>(&self, f: impl FnOnce(&RecordStore) -> R) -> R {
        f(&self.lock())
    }

    pub fn record(&self, id: &RecordId) -> Option<Record> {
        self.lock().read(id).cloned()
    }

    pub fn referrers(&self, id: &RecordId, field: &str) -> Vec<RecordId> {
        self.lock().referrers(id, field)
    }

    pub fn apply_server_snapshot(&self, snapshot: Snapshot) {
        self.commit(|store| ((), store.apply_server_snapshot(snapshot)));
    }

    pub fn apply_local_update<T, E>(
        &self,
        f: impl FnOnce(&mut Transaction<'_>) -> Result<T, E>,
    ) -> Result<T, E> {
        self.commit(|store| store.apply_local_update(f))
    }

    pub fn subscribe(&self, record: RecordId, selection: FieldSelection, listener: Listener) -> SubscriptionId {
        self.lock().subscribe(record, selection, listener)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.lock().unsubscribe(id)
    }

    pub fn retain(&self, roots: Vec<RecordId>) -> RetainToken {
        self.lock().retain(roots)
    }

    pub fn release(&self, token: RetainToken) -> bool {
        self.lock().release(token)
    }

    pub fn collect_garbage(&self) -> Vec<RecordId> {
        self.lock().collect_garbage()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{fields, REALM_TYPE};
    use std::sync::atomic::{AtomicBool, Ordering};

    #[test]
    fn test_listener_can_read_the_store_it_observes() {
        let store = StoreHandle::new();
        let realm = RecordId::persisted("r1");
        store.apply_server_snapshot(Snapshot::new(vec![
            Record::new(realm.clone(), REALM_TYPE).with(fields::NAME, "before"),
        ]));

        let saw_update = Arc::new(AtomicBool::new(false));
        let (inner, seen, target) = (store.clone(), saw_update.clone(), realm.clone());
        store.subscribe(
            realm.clone(),
            FieldSelection::only([fields::NAME]),
            Arc::new(move || {
                let name = inner.record(&target).and_then(|r| r.str(fields::NAME).map(str::to_string));
                seen.store(name.as_deref() == Some("after"), Ordering::SeqCst);
            }),
        );

        store
            .apply_local_update(|tx| tx.set_value(&realm, fields::NAME, "after"))
            .unwrap();
        assert!(saw_update.load(Ordering::SeqCst));
    }
}
