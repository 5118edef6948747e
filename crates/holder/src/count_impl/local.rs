use std::cell::Cell;

const MAX_COUNT: usize = isize::MAX as usize;

/// A reference count for handles that never leave the thread that created them
#[derive(Debug)]
pub(crate) struct RefCount(Cell<usize>);

impl RefCount {
    #[inline]
    pub(crate) const fn new(count: usize) -> Self {
        Self(Cell::new(count))
    }

    /// Increments the count and returns the value it held beforehand
    ///
    /// The process is aborted if the count would exceed `isize::MAX`.
    #[inline]
    pub(crate) fn increment(&self) -> usize {
        let previous = self.0.get();
        if previous >= MAX_COUNT {
            std::process::abort();
        }
        self.0.set(previous + 1);
        previous
    }

    /// Decrements the count and returns the value it held beforehand
    #[inline]
    pub(crate) fn decrement(&self) -> usize {
        let previous = self.0.get();
        self.0.set(previous.wrapping_sub(1));
        previous
    }

    #[inline]
    pub(crate) fn get(&self) -> usize {
        self.0.get()
    }
}

/// Implemented for types that may be sent to another thread along with a shared handle
///
/// Handles never leave their thread with the `local` feature, so this is implemented for all
/// types.
pub trait MaybeSend {}

impl<T: ?Sized> MaybeSend for T {}

/// Implemented for types that may be accessed from other threads through a shared handle
///
/// Handles never leave their thread with the `local` feature, so this is implemented for all
/// types.
pub trait MaybeSync {}

impl<T: ?Sized> MaybeSync for T {}
