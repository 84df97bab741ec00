use crate::{
    cache::SuccessorCache,
    edge::{Receiver, Sender},
    sync::Mutex,
    types::{SharedReceiver, SharedSender},
};
use derive_more::Debug;
use std::{
    collections::VecDeque,
    sync::{Arc, Weak},
};

#[derive(Debug)]
struct QueueState<T> {
    fifo: VecDeque<T>,
    /// True while a pump loop is delivering; at most one pump runs at a
    /// time so deliveries leave the queue in FIFO order.
    pumping: bool,
}

/// Unbounded FIFO buffer.
///
/// A passive node: it involves no executor, all work is caller-driven.
/// `try_put` always accepts; the item is either handed straight through
/// to a waiting successor or enqueued. `try_get` pops the front, or
/// records the caller for a push on the next put.
///
/// At every quiescent point either the FIFO or the successor cache is
/// empty: buffered items and waiting consumers never coexist.
#[must_use]
#[derive(Debug)]
pub struct QueueNode<T> {
    state: Mutex<QueueState<T>>,
    #[debug(skip)]
    successors: SuccessorCache<T>,
}

impl<T> QueueNode<T>
where
    T: Send + 'static,
{
    /// Create an empty, unwired queue.
    pub fn new() -> Arc<Self> {
        Arc::new_cyclic(|this: &Weak<Self>| Self {
            state: Mutex::new(QueueState {
                fifo: VecDeque::new(),
                pumping: false,
            }),
            successors: SuccessorCache::new(this.clone() as Weak<dyn Sender<T>>),
        })
    }

    /// Deliver buffered items to cached successors until one side runs
    /// dry. Only one pump runs per queue; concurrent callers enqueue and
    /// leave, and the active pump picks their items up.
    fn pump(&self) {
        {
            let mut state = self.state.lock().expect("QueueNode::pump: [1]");
            if state.pumping {
                return;
            }
            state.pumping = true;
        }
        loop {
            let item = {
                let mut state = self.state.lock().expect("QueueNode::pump: [2]");
                if state.fifo.is_empty() || self.successors.is_empty() {
                    // Exit decision and flag clear are atomic with the
                    // emptiness observation; a put or a pull racing past
                    // this point starts its own pump.
                    state.pumping = false;
                    return;
                }
                state.fifo.pop_front().expect("QueueNode::pump: [3]")
            };
            match self.successors.try_put(item) {
                Ok(()) => {}
                Err(item) => {
                    // Every cached successor refused and re-registered on
                    // its own side; park the item back at the front.
                    self.state
                        .lock()
                        .expect("QueueNode::pump: [4]")
                        .fifo
                        .push_front(item);
                }
            }
        }
    }
}

impl<T> Receiver<T> for QueueNode<T>
where
    T: Send + 'static,
{
    fn try_put(&self, item: T, _from: Option<&SharedSender<T>>) -> Result<(), T> {
        self.state
            .lock()
            .expect("QueueNode::try_put: [1]")
            .fifo
            .push_back(item);
        self.pump();
        Ok(())
    }
}

impl<T> Sender<T> for QueueNode<T>
where
    T: Send + 'static,
{
    fn try_get(&self, to: Option<&SharedReceiver<T>>) -> Option<T> {
        let mut state = self.state.lock().expect("QueueNode::try_get: [1]");
        if state.pumping {
            // A pump is mid-delivery; popping around it would reorder the
            // edge. Ask to be called back instead.
            if let Some(to) = to {
                self.successors.add(Arc::clone(to));
            }
            return None;
        }
        match state.fifo.pop_front() {
            Some(item) => Some(item),
            None => {
                if let Some(to) = to {
                    self.successors.add(Arc::clone(to));
                }
                None
            }
        }
    }

    fn register_successor(&self, successor: SharedReceiver<T>) {
        let _state = self.state.lock().expect("QueueNode::register_successor: [1]");
        self.successors.add(successor);
    }
}
