use crate::{
    cache::{PredecessorCache, SuccessorCache},
    edge::{Receiver, Sender},
    executor::Executor,
    sync::Mutex,
    types::{SharedReceiver, SharedSender},
};
use derive_more::Debug;
use std::sync::{Arc, Weak};
use tracing::trace;

#[derive(Debug)]
struct GeneratorState<O, B> {
    /// True iff exactly one step task is in flight for this node.
    active: bool,
    /// Live body parked between steps. Present only while another step is
    /// queued or a downstream pull is guaranteed to queue one.
    #[debug(skip)]
    body: Option<B>,
    /// Yielded output the downstream refused; awaiting a pull.
    value: Option<O>,
}

/// Stateful transform: each input produces a body that yields zero or
/// more outputs before finishing.
///
/// The user supplies a *generator factory* mapping an input to a stepper
/// body; the node calls the body once per executor task ("step task") and
/// parks it in between. One yield per task keeps any single generator
/// from monopolizing a worker and lets the rest of the graph interleave,
/// while successful deliveries chain the next step directly instead of
/// idling through the pool.
///
/// Pacing against the graph:
/// - Downstream refusal parks the yielded value in a one-slot latch and
///   ends the task; the downstream pull restarts stepping. A step task
///   never waits for capacity.
/// - While busy (stepping or latched), offers are refused and senders
///   recorded; when a body finishes, the node pulls the next input and
///   builds a fresh body without going idle.
///
/// A generator with no upstream edge is triggered by a single
/// `try_put(input, None)`; with `I = ()` this is a zero-information kick.
#[must_use]
#[derive(Debug)]
pub struct GeneratorNode<I, O, G, B> {
    #[debug(skip)]
    executor: Arc<Executor>,
    #[debug(skip)]
    factory: Mutex<G>,
    #[debug(skip)]
    state: Mutex<GeneratorState<O, B>>,
    #[debug(skip)]
    successors: SuccessorCache<O>,
    #[debug(skip)]
    predecessors: PredecessorCache<I>,
    #[debug(skip)]
    this: Weak<GeneratorNode<I, O, G, B>>,
}

impl<I, O, G, B> GeneratorNode<I, O, G, B>
where
    I: Send + 'static,
    O: Send + 'static,
    G: FnMut(I) -> B + Send + 'static,
    B: FnMut() -> Option<O> + Send + 'static,
{
    /// Create a generator node. `generator` is invoked once per accepted
    /// input to build that input's body; the body is then stepped until it
    /// returns `None`.
    pub fn new(executor: Arc<Executor>, generator: G) -> Arc<Self> {
        Arc::new_cyclic(|this: &Weak<Self>| Self {
            executor,
            factory: Mutex::new(generator),
            state: Mutex::new(GeneratorState {
                active: false,
                body: None,
                value: None,
            }),
            successors: SuccessorCache::new(this.clone() as Weak<dyn Sender<O>>),
            predecessors: PredecessorCache::new(this.clone() as Weak<dyn Receiver<I>>),
            this: this.clone(),
        })
    }

    fn spawn_step(&self, input: Option<I>) {
        let this = self.this.upgrade().expect("GeneratorNode::spawn_step: [1]");
        self.executor.run(move || this.step(input));
    }

    /// Advance the generator by exactly one yield.
    ///
    /// `input` is `Some` when this step must first build a fresh body from
    /// the factory (a newly accepted input); `None` resumes the parked
    /// body, or falls through to an upstream pull if none is live. The
    /// body runs with no lock held.
    fn step(&self, input: Option<I>) {
        let mut body = match input {
            Some(input) => {
                let mut factory = self.factory.lock().expect("GeneratorNode::step: [1]");
                Some((*factory)(input))
            }
            None => self
                .state
                .lock()
                .expect("GeneratorNode::step: [2]")
                .body
                .take(),
        };
        let produced = body.as_mut().and_then(|body| body());
        match produced {
            Some(output) => {
                // Park the body before touching neighbors; it must survive
                // an arbitrary interleaving of pulls while we deliver.
                self.state.lock().expect("GeneratorNode::step: [3]").body = body;
                self.deliver(output);
            }
            None => {
                drop(body);
                self.pull_next();
            }
        }
    }

    /// Push one yielded output downstream, then chain the next step or
    /// park. Runs on the task thread with `active` still set.
    fn deliver(&self, output: O) {
        let mut output = output;
        loop {
            output = match self.successors.try_put(output) {
                Ok(()) => {
                    self.spawn_step(None);
                    return;
                }
                Err(back) => back,
            };
            let mut state = self.state.lock().expect("GeneratorNode::deliver: [1]");
            if self.successors.is_empty() {
                trace!("generator parked on downstream refusal");
                state.value = Some(output);
                state.active = false;
                return;
            }
        }
    }

    /// Feed the next buffered input, or go idle atomically with the
    /// observation that none is buffered.
    fn pull_next(&self) {
        loop {
            match self.predecessors.try_get() {
                Some(input) => {
                    self.spawn_step(Some(input));
                    return;
                }
                None => {
                    let mut state = self.state.lock().expect("GeneratorNode::pull_next: [1]");
                    if self.predecessors.is_empty() {
                        state.active = false;
                        return;
                    }
                }
            }
        }
    }
}

impl<I, O, G, B> Receiver<I> for GeneratorNode<I, O, G, B>
where
    I: Send + 'static,
    O: Send + 'static,
    G: FnMut(I) -> B + Send + 'static,
    B: FnMut() -> Option<O> + Send + 'static,
{
    fn try_put(&self, item: I, from: Option<&SharedSender<I>>) -> Result<(), I> {
        {
            let mut state = self.state.lock().expect("GeneratorNode::try_put: [1]");
            if state.active || state.value.is_some() {
                if let Some(from) = from {
                    self.predecessors.add(from);
                }
                return Err(item);
            }
            state.active = true;
        }
        self.spawn_step(Some(item));
        Ok(())
    }
}

impl<I, O, G, B> Sender<O> for GeneratorNode<I, O, G, B>
where
    I: Send + 'static,
    O: Send + 'static,
    G: FnMut(I) -> B + Send + 'static,
    B: FnMut() -> Option<O> + Send + 'static,
{
    fn try_get(&self, to: Option<&SharedReceiver<O>>) -> Option<O> {
        let (value, resume) = {
            let mut state = self.state.lock().expect("GeneratorNode::try_get: [1]");
            match state.value.take() {
                Some(value) => {
                    let resume = !state.active
                        && (state.body.is_some() || !self.predecessors.is_empty());
                    if resume {
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
            self.spawn_step(None);
        }
        Some(value)
    }

    fn register_successor(&self, successor: SharedReceiver<O>) {
        let _state = self
            .state
            .lock()
            .expect("GeneratorNode::register_successor: [1]");
        self.successors.add(successor);
    }
}
