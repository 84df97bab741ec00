use crate::edge::{Receiver, Sender};
use std::sync::Arc;

/// Shared handle to any node that can receive items of type `T`.
///
/// Forward references in the graph (successor lists and successor caches)
/// hold this type, so ownership flows strictly downstream and a wired graph
/// forms no reference cycles.
pub type SharedReceiver<T> = Arc<dyn Receiver<T>>;

/// Shared handle to any node that can produce items of type `T`.
///
/// Passed as the `from` argument of [`Receiver::try_put`] so a refusing
/// receiver can record where to pull from later. Predecessor caches store
/// these only as weak references.
pub type SharedSender<T> = Arc<dyn Sender<T>>;
