//! Reactive dataflow library for parallel push/pull streaming pipelines.
//!
//! This crate provides statically typed graph nodes (sources, filters,
//! transforms, generators, buffers, broadcasters, latching cells) connected
//! by directed edges. It:
//! - Moves items through the graph push-first, falling back to pull when a
//!   downstream node is busy, via a symmetric two-method handshake
//!   (`try_put` / `try_get`) that never blocks and never busy-waits.
//! - Records refused neighbors in per-node FIFO caches so that whichever
//!   side next makes progress can initiate the retry from its end.
//! - Dispatches all real work onto a rayon-backed [`executor::Executor`]
//!   that provides opportunistic parallelism and a cooperative
//!   wait-for-quiescence primitive.
//!
//! Key modules:
//! - `edge`: the [`edge::Sender`] / [`edge::Receiver`] traits every node
//!   implements, and [`edge::make_edge`] for wiring.
//! - `node`: the built-in node types, from the passive `QueueNode` buffer to
//!   the coroutine-style `GeneratorNode`.
//! - `executor`: task submission, quiescence detection, and the advisory
//!   oversubscription hint for blocking bodies.
//! - `types`: shared-ownership aliases for trait-object node handles.
//!
//! Quick start:
//! 1. Build an [`executor::Executor`] and create your nodes as `Arc`s.
//! 2. Wire them with [`edge::make_edge`], upstream to downstream. The graph
//!    must be acyclic; edges are registered before any data flows.
//! 3. Call `activate()` on each `SourceNode` (or seed an input-less
//!    `GeneratorNode` with a single `try_put`), then block on
//!    `Executor::wait_for_all`.
//! 4. Drain terminal sinks (typically `QueueNode`s) with `try_get`.
//!
//! Per edge, successful deliveries preserve the sender's emission order.
//! Across edges no global ordering is promised. Termination is by
//! exhaustion: sources run dry, generator bodies finish, and
//! `wait_for_all` returns once no tasks remain and no node holds pending
//! work.

#![warn(missing_docs)]

mod cache;
/// The edge protocol: the `Sender`/`Receiver` handshake and `make_edge`.
///
/// Defines the two-method contract every node implements and the semantics
/// of acceptance, refusal, and call-back registration.
pub mod edge;
/// Task executor with quiescence detection.
///
/// Wraps a rayon thread pool behind a submit/wait interface, tracking
/// in-flight work so `wait_for_all` can detect when the graph has gone
/// quiet. Also provides the RAII quiescence hold and oversubscription
/// hints used by blocking bodies.
pub mod executor;
/// Built-in node types.
///
/// Passive buffers (`QueueNode`, `OverwriteNode`, `BroadcastNode`),
/// synchronous pass-throughs (`FilterNode`), and executor-driven workers
/// (`SourceNode`, `FunctionNode`, `GeneratorNode`).
pub mod node;
mod sync;
/// Shared-ownership aliases for node trait objects.
pub mod types;
