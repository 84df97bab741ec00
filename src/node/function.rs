use crate::{
    cache::{PredecessorCache, SuccessorCache},
    edge::{Receiver, Sender},
    executor::Executor,
    sync::Mutex,
    types::{SharedReceiver, SharedSender},
};
use derive_more::Debug;
use std::sync::{Arc, Weak};

#[derive(Debug)]
struct FunctionState<O> {
    /// True iff exactly one executor task is in flight for this node.
    active: bool,
    /// Computed output the downstream refused; awaiting a pull.
    value: Option<O>,
}

/// Stateless one-to-one transform, serialized per instance.
///
/// Each accepted input is turned into one output by the body, which runs
/// on an executor task with no lock held. A single body invocation is in
/// flight at any time; while the node is busy (computing, or holding an
/// undelivered output in its latch) offers are refused and the senders
/// recorded for a pull once the node frees up. Successful deliveries
/// chain straight into the next buffered input without a round-trip
/// through an idle state.
#[must_use]
#[derive(Debug)]
pub struct FunctionNode<I, O, F> {
    #[debug(skip)]
    executor: Arc<Executor>,
    #[debug(skip)]
    body: F,
    state: Mutex<FunctionState<O>>,
    #[debug(skip)]
    successors: SuccessorCache<O>,
    #[debug(skip)]
    predecessors: PredecessorCache<I>,
    #[debug(skip)]
    this: Weak<FunctionNode<I, O, F>>,
}

impl<I, O, F> FunctionNode<I, O, F>
where
    I: Send + 'static,
    O: Send + 'static,
    F: Fn(I) -> O + Send + Sync + 'static,
{
    /// Create a transform node applying `body` to each input.
    pub fn new(executor: Arc<Executor>, body: F) -> Arc<Self> {
        Arc::new_cyclic(|this: &Weak<Self>| Self {
            executor,
            body,
            state: Mutex::new(FunctionState {
                active: false,
                value: None,
            }),
            successors: SuccessorCache::new(this.clone() as Weak<dyn Sender<O>>),
            predecessors: PredecessorCache::new(this.clone() as Weak<dyn Receiver<I>>),
            this: this.clone(),
        })
    }

    fn spawn_apply(&self, input: I) {
        let this = self.this.upgrade().expect("FunctionNode::spawn_apply: [1]");
        self.executor.run(move || {
            let output = (this.body)(input);
            this.deliver(output);
        });
    }

    /// Push `output` downstream, then chain or go idle. Runs on the task
    /// thread with `active` still set, so no second task can start
    /// underneath it.
    fn deliver(&self, output: O) {
        let mut output = output;
        loop {
            output = match self.successors.try_put(output) {
                Ok(()) => {
                    self.pull_next();
                    return;
                }
                Err(back) => back,
            };
            let mut state = self.state.lock().expect("FunctionNode::deliver: [1]");
            if self.successors.is_empty() {
                // Latch only while verifiably unobserved: any receiver
                // recorded after this point sees the latch via try_get.
                state.value = Some(output);
                state.active = false;
                return;
            }
        }
    }

    /// Start the next buffered input, or go idle atomically with the
    /// observation that none is buffered.
    fn pull_next(&self) {
        loop {
            match self.predecessors.try_get() {
                Some(input) => {
                    self.spawn_apply(input);
                    return;
                }
                None => {
                    let mut state = self.state.lock().expect("FunctionNode::pull_next: [1]");
                    if self.predecessors.is_empty() {
                        state.active = false;
                        return;
                    }
                }
            }
        }
    }
}

impl<I, O, F> Receiver<I> for FunctionNode<I, O, F>
where
    I: Send + 'static,
    O: Send + 'static,
    F: Fn(I) -> O + Send + Sync + 'static,
{
    fn try_put(&self, item: I, from: Option<&SharedSender<I>>) -> Result<(), I> {
        {
            let mut state = self.state.lock().expect("FunctionNode::try_put: [1]");
            if state.active || state.value.is_some() {
                if let Some(from) = from {
                    self.predecessors.add(from);
                }
                return Err(item);
            }
            state.active = true;
        }
        self.spawn_apply(item);
        Ok(())
    }
}

impl<I, O, F> Sender<O> for FunctionNode<I, O, F>
where
    I: Send + 'static,
    O: Send + 'static,
    F: Fn(I) -> O + Send + Sync + 'static,
{
    fn try_get(&self, to: Option<&SharedReceiver<O>>) -> Option<O> {
        let (value, resume) = {
            let mut state = self.state.lock().expect("FunctionNode::try_get: [1]");
            match state.value.take() {
                Some(value) => {
                    let resume = !state.active;
                    if resume {
                        // Claim the task slot before pulling so the
                        // at-most-one invariant holds through the pull.
                        state.active = true;
                    }
                    (value, resume)
                }
                None => {
                    if let Some(to) = to {
                        self.successors.add(Arc::clone(to));
                    }
                    return None;
                }
            }
        };
        if resume {
            self.pull_next();
        }
        Some(value)
    }

    fn register_successor(&self, successor: SharedReceiver<O>) {
        let _state = self.state.lock().expect("FunctionNode::register_successor: [1]");
        self.successors.add(successor);
    }
}
