use crate::{
    edge::{Receiver, Sender},
    sync::Mutex,
    types::{SharedReceiver, SharedSender},
};
use std::{
    collections::VecDeque,
    sync::{Arc, Weak},
};

/// FIFO register of receivers that want to hear from the owning sender.
///
/// Holds both permanent edges (added by `register_successor`) and receivers
/// that pulled while the owner was empty and asked to be called back. A
/// drain walks front-to-back: each refuser is dropped (it has recorded the
/// owner on its own side and will retry from there), and the first acceptor
/// stays at the front as the live edge.
///
/// Locking: `entries` is a leaf lock, held only for list operations. The
/// `drain` mutex serializes whole drains and is held across the neighbor
/// calls a drain makes; it is never held while a node state mutex is being
/// acquired. Drains follow edge direction, so on an acyclic graph the drain
/// mutexes cannot form a cycle.
pub(crate) struct SuccessorCache<T> {
    owner: Weak<dyn Sender<T>>,
    entries: Mutex<VecDeque<SharedReceiver<T>>>,
    drain: Mutex<()>,
}

impl<T: 'static> SuccessorCache<T> {
    pub(crate) fn new(owner: Weak<dyn Sender<T>>) -> Self {
        Self {
            owner,
            entries: Mutex::new(VecDeque::new()),
            drain: Mutex::new(()),
        }
    }

    pub(crate) fn add(&self, successor: SharedReceiver<T>) {
        self.entries
            .lock()
            .expect("SuccessorCache::add: poisoned")
            .push_back(successor);
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries
            .lock()
            .expect("SuccessorCache::is_empty: poisoned")
            .is_empty()
    }

    /// Offer `item` to the cached receivers, front-to-back.
    ///
    /// `Err(item)` means every cached receiver refused (each has recorded
    /// the owner in its predecessor cache) and the list is now empty.
    /// Callers deciding to park the item must re-check `is_empty` under
    /// their state lock: a receiver may register between the final refusal
    /// and the park, and that registration must not be stranded.
    pub(crate) fn try_put(&self, item: T) -> Result<(), T> {
        let _drain = self.drain.lock().expect("SuccessorCache::try_put: [1]");
        let owner = self.owner.upgrade();
        let mut item = item;
        loop {
            let front = {
                let mut entries = self
                    .entries
                    .lock()
                    .expect("SuccessorCache::try_put: [2]");
                entries.pop_front()
            };
            let Some(front) = front else {
                return Err(item);
            };
            match front.try_put(item, owner.as_ref()) {
                Ok(()) => {
                    // The acceptor is the live edge; keep it first in line.
                    self.entries
                        .lock()
                        .expect("SuccessorCache::try_put: [3]")
                        .push_front(front);
                    return Ok(());
                }
                Err(back) => item = back,
            }
        }
    }
}

/// FIFO register of senders that offered an item while the owning receiver
/// was saturated.
///
/// Entries are weak: a predecessor that has been destroyed is silently
/// dropped during a drain. A sender that yields a value stays at the front;
/// a sender that comes up empty is dropped after recording the owner in its
/// own successor cache.
pub(crate) struct PredecessorCache<T> {
    owner: Weak<dyn Receiver<T>>,
    entries: Mutex<VecDeque<Weak<dyn Sender<T>>>>,
    drain: Mutex<()>,
}

impl<T: 'static> PredecessorCache<T> {
    pub(crate) fn new(owner: Weak<dyn Receiver<T>>) -> Self {
        Self {
            owner,
            entries: Mutex::new(VecDeque::new()),
            drain: Mutex::new(()),
        }
    }

    pub(crate) fn add(&self, predecessor: &SharedSender<T>) {
        self.entries
            .lock()
            .expect("PredecessorCache::add: poisoned")
            .push_back(Arc::downgrade(predecessor));
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries
            .lock()
            .expect("PredecessorCache::is_empty: poisoned")
            .is_empty()
    }

    /// Pull a value from the cached senders, front-to-back.
    ///
    /// `None` means no cached sender had anything (each live one has
    /// recorded the owner in its successor cache) and the list is now
    /// empty. As with `SuccessorCache::try_put`, callers going idle must
    /// re-check `is_empty` under their state lock before committing.
    pub(crate) fn try_get(&self) -> Option<T> {
        let _drain = self.drain.lock().expect("PredecessorCache::try_get: [1]");
        let owner = self.owner.upgrade();
        loop {
            let front = {
                let mut entries = self
                    .entries
                    .lock()
                    .expect("PredecessorCache::try_get: [2]");
                entries.pop_front()
            }?;
            let Some(sender) = front.upgrade() else {
                // Predecessor destroyed; nothing to recover.
                continue;
            };
            match sender.try_get(owner.as_ref()) {
                Some(item) => {
                    self.entries
                        .lock()
                        .expect("PredecessorCache::try_get: [3]")
                        .push_front(front);
                    return Some(item);
                }
                None => {}
            }
        }
    }
}
