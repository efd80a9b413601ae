use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, RwLock};

use super::{Listener, StoreError};
use crate::query::StructuredQuery;

/// Handle for a realtime listener. Dropping it detaches the listener.
pub struct Subscription {
    detach: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    pub fn new<F>(detach: F) -> Self
    where
        F: FnOnce() + Send + Sync + 'static,
    {
        Self {
            detach: Some(Box::new(detach)),
        }
    }

    /// Detach now. Same as dropping the handle.
    pub fn unsubscribe(mut self) {
        self.run_detach();
    }

    fn run_detach(&mut self) {
        if let Some(detach) = self.detach.take() {
            detach();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.run_detach();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("attached", &self.detach.is_some())
            .finish()
    }
}

struct Watch {
    collection: String,
    query: StructuredQuery,
    listener: Listener,
}

/// What a delivery round has to refresh.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum Target {
    /// Every listener on a collection.
    Collection(String),
    /// One listener, for its initial snapshot.
    Watch(u64),
}

#[derive(Default)]
struct DeliveryQueue {
    pending: BTreeSet<Target>,
    draining: bool,
}

/// Registered listeners keyed by subscription id.
///
/// Deliveries go through a single drain loop per store: whoever finds the
/// queue idle drains it, everyone else only enqueues. Rounds are therefore
/// evaluated and delivered in order, and the last round always sees the
/// latest committed state.
#[derive(Default)]
pub(crate) struct ListenerRegistry {
    next_id: AtomicU64,
    watches: RwLock<HashMap<u64, Watch>>,
    queue: Mutex<DeliveryQueue>,
}

impl ListenerRegistry {
    pub(crate) fn register(
        &self,
        collection: &str,
        query: StructuredQuery,
        listener: Listener,
    ) -> Result<u64, StoreError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut watches = self
            .watches
            .write()
            .map_err(|_| StoreError::LockPoisoned("listen"))?;
        watches.insert(
            id,
            Watch {
                collection: collection.to_string(),
                query,
                listener,
            },
        );
        Ok(id)
    }

    pub(crate) fn remove(&self, id: u64) {
        if let Ok(mut watches) = self.watches.write() {
            watches.remove(&id);
        }
    }

    /// Listeners (with their queries) selected by `targets`, in
    /// registration order.
    pub(crate) fn watching(&self, targets: &BTreeSet<Target>) -> Vec<(String, StructuredQuery, Listener)> {
        let Ok(watches) = self.watches.read() else {
            return Vec::new();
        };
        let mut ids: Vec<&u64> = watches
            .iter()
            .filter(|(id, w)| {
                targets.contains(&Target::Watch(**id))
                    || targets.contains(&Target::Collection(w.collection.clone()))
            })
            .map(|(id, _)| id)
            .collect();
        ids.sort_unstable();
        ids.into_iter()
            .map(|id| {
                let w = &watches[id];
                (w.collection.clone(), w.query.clone(), w.listener.clone())
            })
            .collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.watches.read().map(|w| w.len()).unwrap_or(0)
    }

    /// Queue targets for delivery. Returns a drain handle when the caller
    /// has to run the drain loop, None when another drain will pick them up.
    pub(crate) fn enqueue<I>(&self, targets: I) -> Option<Drain<'_>>
    where
        I: IntoIterator<Item = Target>,
    {
        let mut queue = self.lock_queue();
        queue.pending.extend(targets);
        if queue.draining || queue.pending.is_empty() {
            return None;
        }
        queue.draining = true;
        Some(Drain { registry: self })
    }

    fn lock_queue(&self) -> std::sync::MutexGuard<'_, DeliveryQueue> {
        self.queue.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Exclusive right to drain the delivery queue.
pub(crate) struct Drain<'a> {
    registry: &'a ListenerRegistry,
}

impl Drain<'_> {
    /// Take everything queued so far, or release the drain when idle.
    pub(crate) fn next_round(&mut self) -> Option<BTreeSet<Target>> {
        let mut queue = self.registry.lock_queue();
        if queue.pending.is_empty() {
            queue.draining = false;
            return None;
        }
        Some(std::mem::take(&mut queue.pending))
    }
}

impl Drop for Drain<'_> {
    // Only a panicking listener leaves the loop without `next_round`
    // returning None.
    fn drop(&mut self) {
        if std::thread::panicking() {
            self.registry.lock_queue().draining = false;
        }
    }
}
