//! Lock-free handle to the current snapshot of a collection

use super::change::CollectionItemChange;
use super::snapshot::ConfigCollectionSnapshot;
use arc_swap::ArcSwap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::error;

/// Handle returned by [`ConfigCollectionRef::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener<T> = Arc<dyn Fn(&CollectionItemChange<T>) + Send + Sync>;

/// Shared pointer to the latest published snapshot
///
/// Reads never block; publishing replaces the whole snapshot in one swap.
pub struct ConfigCollectionRef<T> {
    snapshot: ArcSwap<ConfigCollectionSnapshot<T>>,
    listeners: ArcSwap<Vec<(ListenerId, Listener<T>)>>,
    next_listener: AtomicU64,
}

impl<T> ConfigCollectionRef<T> {
    #[must_use]
    pub fn new(initial: ConfigCollectionSnapshot<T>) -> Self {
        Self {
            snapshot: ArcSwap::from_pointee(initial),
            listeners: ArcSwap::from_pointee(Vec::new()),
            next_listener: AtomicU64::new(0),
        }
    }

    /// Current snapshot
    #[must_use]
    pub fn get(&self) -> Arc<ConfigCollectionSnapshot<T>> {
        self.snapshot.load_full()
    }

    pub fn set_snapshot(&self, snapshot: ConfigCollectionSnapshot<T>) {
        self.snapshot.store(Arc::new(snapshot));
    }

    /// Publish a snapshot derived from the current one
    pub fn update_snapshot<F>(&self, update: F)
    where
        F: Fn(&ConfigCollectionSnapshot<T>) -> ConfigCollectionSnapshot<T>,
    {
        self.snapshot.rcu(|current| update(current));
    }

    /// Register a change listener
    pub fn subscribe<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&CollectionItemChange<T>) + Send + Sync + 'static,
    {
        let id = ListenerId(self.next_listener.fetch_add(1, Ordering::Relaxed));
        let listener: Listener<T> = Arc::new(listener);
        self.listeners.rcu(|current| {
            let mut next = Vec::clone(current);
            next.push((id, Arc::clone(&listener)));
            next
        });
        id
    }

    /// Remove a listener; `false` if it was not registered
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        let previous = self.listeners.rcu(|current| {
            current
                .iter()
                .filter(|(listener_id, _)| *listener_id != id)
                .cloned()
                .collect::<Vec<_>>()
        });
        previous.iter().any(|(listener_id, _)| *listener_id == id)
    }

    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners.load().len()
    }

    /// Deliver `change` to every listener
    ///
    /// A panicking listener is logged and skipped; delivery continues.
    pub fn notify_listeners(&self, change: &CollectionItemChange<T>) {
        let listeners = self.listeners.load_full();
        for (id, listener) in listeners.iter() {
            if catch_unwind(AssertUnwindSafe(|| listener(change))).is_err() {
                error!(
                    "Listener {:?} panicked handling {:?} of '{}' in collection '{}'",
                    id, change.kind, change.id, change.collection
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::ChangeKind;
    use parking_lot::Mutex;

    fn reference() -> ConfigCollectionRef<u32> {
        ConfigCollectionRef::new(ConfigCollectionSnapshot::empty("nums", "u32"))
    }

    #[test]
    fn swaps_snapshots() {
        let reference = reference();
        let before = reference.get();
        reference.set_snapshot(ConfigCollectionSnapshot::new(
            "nums",
            "u32",
            vec![("a".to_owned(), Arc::new(1))],
            None,
        ));

        assert!(before.is_empty());
        assert_eq!(reference.get().len(), 1);

        reference.update_snapshot(|_| ConfigCollectionSnapshot::empty("nums", "u32"));
        assert!(reference.get().is_empty());
    }

    #[test]
    fn panicking_listener_does_not_stop_delivery() {
        let reference = reference();
        let seen = Arc::new(Mutex::new(Vec::new()));

        reference.subscribe(|_| panic!("listener failure"));
        let sink = Arc::clone(&seen);
        reference.subscribe(move |change| sink.lock().push(change.kind));

        reference.notify_listeners(&CollectionItemChange::added("nums", "u32", "a", Arc::new(1)));
        assert_eq!(*seen.lock(), vec![ChangeKind::Added]);
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let reference = reference();
        let seen = Arc::new(Mutex::new(0));
        let sink = Arc::clone(&seen);
        let id = reference.subscribe(move |_| *sink.lock() += 1);

        assert!(reference.unsubscribe(id));
        assert!(!reference.unsubscribe(id));
        assert_eq!(reference.listener_count(), 0);

        reference.notify_listeners(&CollectionItemChange::removed("nums", "u32", "a", Arc::new(1)));
        assert_eq!(*seen.lock(), 0);
    }
}
