#[cfg(feature = "loom")]
mod imp {
    pub(crate) use loom::sync::{
        atomic::{AtomicUsize, Ordering},
        Condvar, Mutex,
    };
}

#[cfg(not(feature = "loom"))]
mod imp {
    pub(crate) use core::sync::atomic::{AtomicUsize, Ordering};
    pub(crate) use std::sync::{Condvar, Mutex};
}

pub(crate) use imp::*;
