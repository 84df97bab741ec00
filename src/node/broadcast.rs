use crate::{
    edge::{Receiver, Sender},
    sync::Mutex,
    types::{SharedReceiver, SharedSender},
};
use derive_more::Debug;
use std::sync::Arc;

/// Fan-out node: every accepted item is copied to every registered
/// successor.
///
/// Broadcast holds no buffer and offers no retry contract: `try_put`
/// always accepts, copies are delivered fire-and-forget, and a successor
/// that cannot keep up must buffer on its own side (typically behind a
/// [`QueueNode`](crate::node::QueueNode)). `try_get` always refuses
/// without recording the caller; the successor list is populated only by
/// `register_successor`.
#[must_use]
#[derive(Debug)]
pub struct BroadcastNode<T> {
    #[debug(skip)]
    successors: Mutex<Vec<SharedReceiver<T>>>,
}

impl<T> BroadcastNode<T>
where
    T: Clone + Send + 'static,
{
    /// Create an unwired broadcast node.
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            successors: Mutex::new(Vec::new()),
        })
    }
}

impl<T> Receiver<T> for BroadcastNode<T>
where
    T: Clone + Send + 'static,
{
    fn try_put(&self, item: T, _from: Option<&SharedSender<T>>) -> Result<(), T> {
        let successors = self
            .successors
            .lock()
            .expect("BroadcastNode::try_put: [1]")
            .clone();
        for successor in successors {
            // Fire-and-forget: a refusing successor recovers by pulling
            // its own predecessors, not by being retried from here.
            let _ = successor.try_put(item.clone(), None);
        }
        Ok(())
    }
}

impl<T> Sender<T> for BroadcastNode<T>
where
    T: Clone + Send + 'static,
{
    fn try_get(&self, _to: Option<&SharedReceiver<T>>) -> Option<T> {
        None
    }

    fn register_successor(&self, successor: SharedReceiver<T>) {
        self.successors
            .lock()
            .expect("BroadcastNode::register_successor: [1]")
            .push(successor);
    }
}
