use std::sync::atomic::{AtomicUsize, Ordering};

const MAX_COUNT: usize = isize::MAX as usize;

/// A reference count that can be modified concurrently from multiple threads
///
/// All operations are sequentially consistent, so the decrement that observes a previous value
/// of 1 is unique across every thread sharing the count.
#[derive(Debug)]
pub(crate) struct RefCount(AtomicUsize);

impl RefCount {
    #[inline]
    pub(crate) const fn new(count: usize) -> Self {
        Self(AtomicUsize::new(count))
    }

    /// Increments the count and returns the value it held beforehand
    ///
    /// The process is aborted if the count would exceed `isize::MAX`.
    #[inline]
    pub(crate) fn increment(&self) -> usize {
        let previous = self.0.fetch_add(1, Ordering::SeqCst);
        if previous >= MAX_COUNT {
            std::process::abort();
        }
        previous
    }

    /// Decrements the count and returns the value it held beforehand
    #[inline]
    pub(crate) fn decrement(&self) -> usize {
        self.0.fetch_sub(1, Ordering::SeqCst)
    }

    #[inline]
    pub(crate) fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

/// Implemented for types that may be sent to another thread along with a shared handle
///
/// With the `atomic` feature this is equivalent to `Send`.
pub trait MaybeSend: Send {}

impl<T: ?Sized + Send> MaybeSend for T {}

/// Implemented for types that may be accessed from other threads through a shared handle
///
/// With the `atomic` feature this is equivalent to `Sync`.
pub trait MaybeSync: Sync {}

impl<T: ?Sized + Sync> MaybeSync for T {}
