use crate::{
    edge::{Receiver, Sender},
    sync::Mutex,
    types::{SharedReceiver, SharedSender},
};
use derive_more::Debug;
use std::sync::{Arc, Weak};

#[derive(Debug)]
struct OverwriteState<T> {
    #[debug(skip)]
    successors: Vec<SharedReceiver<T>>,
    value: Option<T>,
}

/// Single-slot latched cell: a most-recently-written register.
///
/// Every `try_put` overwrites the slot and pushes a copy to each
/// registered successor; intermediate values may be lost to readers that
/// sample too slowly. Reading via `try_get` does **not** consume the
/// slot: the same value can be read repeatedly until the next write. Consumers
/// that expect read-consumes semantics must layer a
/// [`QueueNode`](crate::node::QueueNode) behind the cell.
///
/// A reader that finds the slot empty is recorded as a successor (once per
/// node) and receives the next written value as a push.
#[must_use]
#[derive(Debug)]
pub struct OverwriteNode<T> {
    state: Mutex<OverwriteState<T>>,
    #[debug(skip)]
    this: Weak<OverwriteNode<T>>,
}

impl<T> OverwriteNode<T>
where
    T: Clone + Send + 'static,
{
    /// Create an unwired, empty cell.
    pub fn new() -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            state: Mutex::new(OverwriteState {
                successors: Vec::new(),
                value: None,
            }),
            this: this.clone(),
        })
    }

    fn as_sender(&self) -> Option<SharedSender<T>> {
        self.this.upgrade().map(|node| node as SharedSender<T>)
    }
}

fn same_receiver<T>(a: &SharedReceiver<T>, b: &SharedReceiver<T>) -> bool {
    std::ptr::eq(
        Arc::as_ptr(a) as *const (),
        Arc::as_ptr(b) as *const (),
    )
}

impl<T> Receiver<T> for OverwriteNode<T>
where
    T: Clone + Send + 'static,
{
    fn try_put(&self, item: T, _from: Option<&SharedSender<T>>) -> Result<(), T> {
        let successors = {
            let mut state = self.state.lock().expect("OverwriteNode::try_put: [1]");
            let successors = state.successors.clone();
            state.value = Some(item.clone());
            successors
        };
        // Refusers keep the cell in their predecessor caches and re-read
        // the latch once they free up; the value stays available.
        let from = self.as_sender();
        for successor in successors {
            let _ = successor.try_put(item.clone(), from.as_ref());
        }
        Ok(())
    }
}

impl<T> Sender<T> for OverwriteNode<T>
where
    T: Clone + Send + 'static,
{
    fn try_get(&self, to: Option<&SharedReceiver<T>>) -> Option<T> {
        let mut state = self.state.lock().expect("OverwriteNode::try_get: [1]");
        if let Some(value) = &state.value {
            return Some(value.clone());
        }
        if let Some(to) = to {
            if !state.successors.iter().any(|s| same_receiver(s, to)) {
                state.successors.push(Arc::clone(to));
            }
        }
        None
    }

    fn register_successor(&self, successor: SharedReceiver<T>) {
        self.state
            .lock()
            .expect("OverwriteNode::register_successor: [1]")
            .successors
            .push(successor);
    }
}
