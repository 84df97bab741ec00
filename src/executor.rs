use crate::sync::{AtomicUsize, Condvar, Mutex, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tracing::trace;

/// Error returned when the executor's worker pool cannot be constructed.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ExecutorBuildError {
    /// The underlying rayon pool failed to build (e.g. thread creation).
    #[error("failed to build worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
}

#[derive(Debug, Default)]
struct ExecState {
    /// Closures submitted via `run` that have not finished yet.
    in_flight: usize,
    /// Outstanding quiescence holds.
    holds: usize,
}

#[derive(Debug)]
struct Shared {
    state: Mutex<ExecState>,
    quiescent: Condvar,
    oversubscribed: AtomicUsize,
}

impl Shared {
    fn new() -> Self {
        Self {
            state: Mutex::new(ExecState::default()),
            quiescent: Condvar::new(),
            oversubscribed: AtomicUsize::new(0),
        }
    }

    fn finish_task(&self) {
        let mut state = self.state.lock().expect("Shared::finish_task: [1]");
        state.in_flight = state
            .in_flight
            .checked_sub(1)
            .expect("Shared::finish_task: [2]");
        if state.in_flight == 0 && state.holds == 0 {
            trace!("executor quiescent");
            self.quiescent.notify_all();
        }
    }
}

/// Dispatches unit-of-work closures onto worker threads and signals
/// quiescence.
///
/// Key responsibilities:
/// - `run` submits closures for asynchronous, possibly parallel execution.
///   A closure submitted from inside another closure is counted before its
///   parent finishes, so chained work never produces a false-quiescence
///   window.
/// - `wait_for_all` blocks the caller until every submitted closure has
///   completed and every [`QuiescenceHold`] has been released. Called from
///   a worker thread it cooperatively drives the pool instead of parking
///   it.
/// - [`Executor::oversubscribe`] is an advisory hint for closures about to
///   perform blocking syscalls.
#[must_use]
#[derive(Debug)]
pub struct Executor {
    #[cfg(not(feature = "loom"))]
    pool: rayon::ThreadPool,
    shared: Arc<Shared>,
}

impl Executor {
    /// Construct an executor with the default number of worker threads.
    ///
    /// # Errors
    /// If the worker pool cannot be created.
    pub fn new() -> Result<Arc<Self>, ExecutorBuildError> {
        Self::builder().build()
    }

    /// Start configuring an executor.
    pub fn builder() -> ExecutorBuilder {
        ExecutorBuilder::default()
    }

    /// Submit `work` for asynchronous execution.
    ///
    /// Closures may run in parallel with each other and with the caller.
    /// There is no completion handle; completion is observed collectively
    /// through [`Executor::wait_for_all`].
    pub fn run(&self, work: impl FnOnce() + Send + 'static) {
        {
            let mut state = self.shared.state.lock().expect("Executor::run: [1]");
            state.in_flight += 1;
            trace!(in_flight = state.in_flight, "task submitted");
        }
        let shared = Arc::clone(&self.shared);
        self.dispatch(move || {
            work();
            shared.finish_task();
        });
    }

    #[cfg(not(feature = "loom"))]
    fn dispatch(&self, work: impl FnOnce() + Send + 'static) {
        self.pool.spawn(work);
    }

    #[cfg(feature = "loom")]
    fn dispatch(&self, work: impl FnOnce() + Send + 'static) {
        loom::thread::spawn(work);
    }

    /// Block until every submitted closure has completed and every
    /// quiescence hold has been released.
    ///
    /// From a thread outside the pool this parks on a condition variable.
    /// From inside a worker closure it yields to the pool's scheduler in a
    /// loop, executing other pending work, so waiting for the graph never
    /// starves the pool of the worker doing the waiting.
    pub fn wait_for_all(&self) {
        #[cfg(not(feature = "loom"))]
        if self.pool.current_thread_index().is_some() {
            // NOTE: cooperative block; see `run`.
            while !self.is_quiescent() {
                match self.pool.yield_now() {
                    Some(rayon::Yield::Executed) => {}
                    _ => std::thread::yield_now(),
                }
            }
            return;
        }

        let mut state = self
            .shared
            .state
            .lock()
            .expect("Executor::wait_for_all: [1]");
        while state.in_flight != 0 || state.holds != 0 {
            state = self
                .shared
                .quiescent
                .wait(state)
                .expect("Executor::wait_for_all: [2]");
        }
    }

    #[cfg(not(feature = "loom"))]
    fn is_quiescent(&self) -> bool {
        let state = self
            .shared
            .state
            .lock()
            .expect("Executor::is_quiescent: [1]");
        state.in_flight == 0 && state.holds == 0
    }

    /// Defer quiescence while the returned guard is alive.
    ///
    /// For closures that block on graph progress outside the executor's
    /// own accounting: `wait_for_all` will not return while any hold is
    /// outstanding.
    pub fn hold(&self) -> QuiescenceHold<'_> {
        let mut state = self.shared.state.lock().expect("Executor::hold: [1]");
        state.holds += 1;
        QuiescenceHold { shared: &self.shared }
    }

    /// Advise the pool that the current closure is about to block.
    ///
    /// With a dynamically sized pool the hint would spawn a compensating
    /// worker for the guard's lifetime; with the fixed rayon pool it is
    /// advisory only. Bodies performing file or network I/O should wrap
    /// the blocking section in this scope.
    pub fn oversubscribe(&self) -> OversubscriptionScope<'_> {
        let blocked = self.shared.oversubscribed.fetch_add(1, Ordering::Relaxed) + 1;
        trace!(blocked, "oversubscription scope entered");
        OversubscriptionScope { shared: &self.shared }
    }

    /// Number of closures currently inside an oversubscription scope.
    #[must_use]
    pub fn oversubscribed(&self) -> usize {
        self.shared.oversubscribed.load(Ordering::Relaxed)
    }
}

/// RAII guard deferring executor quiescence; see [`Executor::hold`].
#[must_use]
#[derive(Debug)]
pub struct QuiescenceHold<'a> {
    shared: &'a Shared,
}

impl Drop for QuiescenceHold<'_> {
    fn drop(&mut self) {
        let mut state = self
            .shared
            .state
            .lock()
            .expect("QuiescenceHold::drop: [1]");
        state.holds = state.holds.checked_sub(1).expect("QuiescenceHold::drop: [2]");
        if state.in_flight == 0 && state.holds == 0 {
            self.shared.quiescent.notify_all();
        }
    }
}

/// RAII advisory hint that the enclosing closure will block; see
/// [`Executor::oversubscribe`].
#[must_use]
#[derive(Debug)]
pub struct OversubscriptionScope<'a> {
    shared: &'a Shared,
}

impl Drop for OversubscriptionScope<'_> {
    fn drop(&mut self) {
        self.shared.oversubscribed.fetch_sub(1, Ordering::Relaxed);
    }
}

/// Builder for [`Executor`].
#[must_use]
#[derive(Debug, Default)]
pub struct ExecutorBuilder {
    num_threads: Option<usize>,
}

impl ExecutorBuilder {
    /// Set the number of worker threads. Defaults to the rayon heuristic
    /// (one per available core).
    pub fn num_threads(mut self, num_threads: usize) -> Self {
        self.num_threads = Some(num_threads);
        self
    }

    /// Build the executor.
    ///
    /// # Errors
    /// If the worker pool cannot be created.
    #[cfg(not(feature = "loom"))]
    pub fn build(self) -> Result<Arc<Executor>, ExecutorBuildError> {
        let mut pool = rayon::ThreadPoolBuilder::new();
        if let Some(num_threads) = self.num_threads {
            pool = pool.num_threads(num_threads);
        }
        Ok(Arc::new(Executor {
            pool: pool.build()?,
            shared: Arc::new(Shared::new()),
        }))
    }

    /// Build the executor. Under loom, work is dispatched onto plain model
    /// threads and the thread-count hint is ignored.
    ///
    /// # Errors
    /// Infallible in this configuration; the signature matches the pool
    /// build.
    #[cfg(feature = "loom")]
    pub fn build(self) -> Result<Arc<Executor>, ExecutorBuildError> {
        let Self { num_threads: _ } = self;
        Ok(Arc::new(Executor {
            shared: Arc::new(Shared::new()),
        }))
    }
}
