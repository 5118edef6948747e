use holder::Deleter;
use std::{
    ops::Deref,
    ptr::NonNull,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

/// Counts how many [Counted] values have been dropped
///
/// Clones of a counter share the same count, so a counter can be handed to values that are
/// dropped on other threads.
#[derive(Clone, Debug, Default)]
pub struct DropCounter {
    drops: Arc<AtomicUsize>,
}

impl DropCounter {
    /// Returns the number of drops that have been counted so far
    pub fn count(&self) -> usize {
        self.drops.load(Ordering::SeqCst)
    }

    /// Wraps `value` so that its drop is counted
    pub fn track<T>(&self, value: T) -> Counted<T> {
        Counted {
            value,
            drops: self.drops.clone(),
        }
    }

    /// Makes a boxed [Counted] value, returning the raw pointer
    ///
    /// The pointer can be passed to `from_raw` constructors that use the default deleter.
    pub fn boxed<T>(&self, value: T) -> *mut Counted<T> {
        Box::into_raw(Box::new(self.track(value)))
    }
}

/// A value that reports its drop to a [DropCounter]
#[derive(Debug)]
pub struct Counted<T> {
    value: T,
    drops: Arc<AtomicUsize>,
}

impl<T> Deref for Counted<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}

impl<T> Drop for Counted<T> {
    fn drop(&mut self) {
        self.drops.fetch_add(1, Ordering::SeqCst);
    }
}

/// A deleter for boxed objects that counts its invocations
///
/// Clones share the same count.
#[derive(Clone, Debug, Default)]
pub struct CountingDeleter {
    deletions: Arc<AtomicUsize>,
}

impl CountingDeleter {
    /// Returns the number of objects that have been deleted
    pub fn count(&self) -> usize {
        self.deletions.load(Ordering::SeqCst)
    }
}

impl<T: ?Sized> Deleter<T> for CountingDeleter {
    unsafe fn delete(&mut self, ptr: NonNull<T>) {
        self.deletions.fetch_add(1, Ordering::SeqCst);
        drop(unsafe { Box::from_raw(ptr.as_ptr()) });
    }
}
