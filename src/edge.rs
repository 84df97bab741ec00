use crate::types::{SharedReceiver, SharedSender};
use std::sync::Arc;

/// The consuming half of the node protocol.
///
/// A receiver is offered items by upstream senders. It either takes
/// responsibility for the item (`Ok(())`) or hands it back (`Err(item)`).
/// Refusal is not an error: it is the back-pressure signal of the
/// handshake. A refusing receiver that was given a `from` handle records it
/// in its predecessor cache and pulls from it once capacity frees up, so
/// the refused item is never lost as long as the sender parks it.
pub trait Receiver<T: 'static>: Send + Sync {
    /// Offer `item` to this node.
    ///
    /// `from` identifies the sender for the call-back protocol. Passing
    /// `None` means fire-and-forget: the caller will not be retried, and a
    /// refusal drops the offer on the floor (the item is still handed back
    /// to the caller).
    fn try_put(&self, item: T, from: Option<&SharedSender<T>>) -> Result<(), T>;
}

/// The producing half of the node protocol.
///
/// A sender is asked for items by downstream receivers. `try_get` returns a
/// value if one is available right now; otherwise the sender records `to`
/// in its successor cache and pushes to it on the next produce.
pub trait Sender<T: 'static>: Send + Sync {
    /// Request a value from this node.
    ///
    /// Returns `None` when nothing is currently available. `to` identifies
    /// the receiver for the call-back protocol; `None` means the caller
    /// does not want to be called back.
    fn try_get(&self, to: Option<&SharedReceiver<T>>) -> Option<T>;

    /// Wire a permanent edge: subsequent produces on this node may target
    /// `successor`.
    fn register_successor(&self, successor: SharedReceiver<T>);
}

/// Register the directed edge `sender` → `receiver`.
///
/// Edges must be wired before any data flows through either node; adding
/// an edge to a graph that is already executing is undefined. The graph
/// formed by all edges must be acyclic.
pub fn make_edge<T, S, R>(sender: &Arc<S>, receiver: &Arc<R>)
where
    T: 'static,
    S: Sender<T> + ?Sized,
    R: Receiver<T> + 'static,
{
    sender.register_successor(Arc::clone(receiver) as SharedReceiver<T>);
}
