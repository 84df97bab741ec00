use crate::{
    cache::{PredecessorCache, SuccessorCache},
    edge::{Receiver, Sender},
    sync::Mutex,
    types::{SharedReceiver, SharedSender},
};
use derive_more::Debug;
use std::sync::{Arc, Weak};

/// Predicate-gated pass-through.
///
/// Synchronous and transparent to the protocol: the filter buffers
/// nothing and involves no executor. Items failing the predicate are
/// swallowed (the put is still accepted); items passing it are forwarded
/// downstream, with refusals propagated back to the sender through the
/// usual call-back caches.
#[must_use]
#[derive(Debug)]
pub struct FilterNode<T, P> {
    #[debug(skip)]
    predicate: P,
    /// Serializes call-back registration against the emptiness checks in
    /// the retry loops; holds no node data of its own.
    #[debug(skip)]
    state: Mutex<()>,
    #[debug(skip)]
    successors: SuccessorCache<T>,
    #[debug(skip)]
    predecessors: PredecessorCache<T>,
}

impl<T, P> FilterNode<T, P>
where
    T: Send + 'static,
    P: Fn(&T) -> bool + Send + Sync + 'static,
{
    /// Create a filter that forwards items satisfying `predicate`.
    pub fn new(predicate: P) -> Arc<Self> {
        Arc::new_cyclic(|this: &Weak<Self>| Self {
            predicate,
            state: Mutex::new(()),
            successors: SuccessorCache::new(this.clone() as Weak<dyn Sender<T>>),
            predecessors: PredecessorCache::new(this.clone() as Weak<dyn Receiver<T>>),
        })
    }
}

impl<T, P> Receiver<T> for FilterNode<T, P>
where
    T: Send + 'static,
    P: Fn(&T) -> bool + Send + Sync + 'static,
{
    fn try_put(&self, item: T, from: Option<&SharedSender<T>>) -> Result<(), T> {
        if !(self.predicate)(&item) {
            // Accepted and dropped: filtering is not back-pressure.
            return Ok(());
        }
        let mut item = item;
        loop {
            item = match self.successors.try_put(item) {
                Ok(()) => return Ok(()),
                Err(back) => back,
            };
            let _state = self.state.lock().expect("FilterNode::try_put: [1]");
            if self.successors.is_empty() {
                if let Some(from) = from {
                    self.predecessors.add(from);
                }
                return Err(item);
            }
        }
    }
}

impl<T, P> Sender<T> for FilterNode<T, P>
where
    T: Send + 'static,
    P: Fn(&T) -> bool + Send + Sync + 'static,
{
    fn try_get(&self, to: Option<&SharedReceiver<T>>) -> Option<T> {
        loop {
            match self.predecessors.try_get() {
                Some(item) => {
                    if (self.predicate)(&item) {
                        return Some(item);
                    }
                    // Swallowed; the yielding predecessor is still at the
                    // cache front, so the next round pulls it again.
                }
                None => {
                    let _state = self.state.lock().expect("FilterNode::try_get: [1]");
                    if self.predecessors.is_empty() {
                        if let Some(to) = to {
                            self.successors.add(Arc::clone(to));
                        }
                        return None;
                    }
                }
            }
        }
    }

    fn register_successor(&self, successor: SharedReceiver<T>) {
        let _state = self.state.lock().expect("FilterNode::register_successor: [1]");
        self.successors.add(successor);
    }
}
