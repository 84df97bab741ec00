use crate::{
    cache::SuccessorCache,
    edge::Sender,
    executor::Executor,
    sync::Mutex,
    types::SharedReceiver,
};
use derive_more::Debug;
use std::sync::{Arc, Weak};
use tracing::trace;

#[derive(Debug)]
struct SourceState<T> {
    /// Produced but not yet delivered: the downstream refused and will
    /// pull it out via `try_get`.
    value: Option<T>,
    activated: bool,
}

/// Pull generator with no input: repeatedly produces outputs.
///
/// The body is called from an executor task, never under a lock, until it
/// returns `None`; from then on the source is permanently drained and no
/// further tasks are spawned. At most one production task is in flight at
/// any time: production chains through successful deliveries and resumes
/// through downstream pulls, but never overlaps itself.
#[must_use]
#[derive(Debug)]
pub struct SourceNode<T, B> {
    #[debug(skip)]
    executor: Arc<Executor>,
    #[debug(skip)]
    body: Mutex<B>,
    state: Mutex<SourceState<T>>,
    #[debug(skip)]
    successors: SuccessorCache<T>,
    #[debug(skip)]
    this: Weak<SourceNode<T, B>>,
}

impl<T, B> SourceNode<T, B>
where
    T: Send + 'static,
    B: FnMut() -> Option<T> + Send + 'static,
{
    /// Create a source that produces items by calling `body` until it
    /// returns `None`. Inert until [`SourceNode::activate`] is called.
    pub fn new(executor: Arc<Executor>, body: B) -> Arc<Self> {
        Arc::new_cyclic(|this: &Weak<Self>| Self {
            executor,
            body: Mutex::new(body),
            state: Mutex::new(SourceState {
                value: None,
                activated: false,
            }),
            successors: SuccessorCache::new(this.clone() as Weak<dyn Sender<T>>),
            this: this.clone(),
        })
    }

    /// Submit the first production task. Idempotent; call once after the
    /// graph is wired.
    pub fn activate(&self) {
        {
            let mut state = self.state.lock().expect("SourceNode::activate: [1]");
            if state.activated {
                return;
            }
            state.activated = true;
        }
        self.spawn_produce();
    }

    fn spawn_produce(&self) {
        let this = self.this.upgrade().expect("SourceNode::spawn_produce: [1]");
        self.executor.run(move || this.produce());
    }

    fn produce(&self) {
        // Single task in flight, so the body mutex is uncontended; it only
        // exists to hand the executor a `Sync` handle.
        let produced = {
            let mut body = self.body.lock().expect("SourceNode::produce: [1]");
            (*body)()
        };
        let Some(mut item) = produced else {
            trace!("source exhausted");
            return;
        };
        loop {
            item = match self.successors.try_put(item) {
                Ok(()) => {
                    self.spawn_produce();
                    return;
                }
                Err(back) => back,
            };
            let mut state = self.state.lock().expect("SourceNode::produce: [2]");
            if self.successors.is_empty() {
                // Nobody took it and nobody new asked: latch and stop
                // until a downstream pull restarts production.
                state.value = Some(item);
                return;
            }
            // A receiver registered between the refusal and here; offer
            // again rather than strand it.
        }
    }
}

impl<T, B> Sender<T> for SourceNode<T, B>
where
    T: Send + 'static,
    B: FnMut() -> Option<T> + Send + 'static,
{
    fn try_get(&self, to: Option<&SharedReceiver<T>>) -> Option<T> {
        let item = {
            let mut state = self.state.lock().expect("SourceNode::try_get: [1]");
            match state.value.take() {
                Some(item) => item,
                None => {
                    if let Some(to) = to {
                        self.successors.add(Arc::clone(to));
                    }
                    return None;
                }
            }
        };
        // The latch implies no task is in flight; restart production.
        self.spawn_produce();
        Some(item)
    }

    fn register_successor(&self, successor: SharedReceiver<T>) {
        let _state = self.state.lock().expect("SourceNode::register_successor: [1]");
        self.successors.add(successor);
    }
}
