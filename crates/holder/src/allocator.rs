//! Allocators for ownership record storage

use crate::AllocError;
use std::{
    alloc::Layout,
    ptr::NonNull,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

/// Provides raw storage for ownership records
///
/// The allocator is handed the exact [Layout] of the record it needs to store, so a single
/// allocator value can serve records of any type.
///
/// # Safety
///
/// A successful call to `allocate` must return a pointer to a block of memory that is valid for
/// reads and writes of `layout.size()` bytes, aligned to `layout.align()`, and that stays valid
/// until it's passed to `deallocate` with the same layout.
pub unsafe trait Allocator {
    /// Allocates a block of memory described by `layout`
    ///
    /// `layout` always has a non-zero size.
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocError>;

    /// Releases a block previously returned by `allocate`
    ///
    /// # Safety
    ///
    /// `ptr` must have been returned by `allocate` on this allocator (or a clone of it) with the
    /// same `layout`, and must not have been deallocated already.
    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout);
}

/// The process-wide global allocator
#[derive(Clone, Copy, Debug, Default)]
pub struct Global;

unsafe impl Allocator for Global {
    #[inline]
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocError> {
        debug_assert!(layout.size() > 0);
        // SAFETY: records always have a non-zero size
        NonNull::new(unsafe { std::alloc::alloc(layout) }).ok_or(AllocError)
    }

    #[inline]
    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        unsafe { std::alloc::dealloc(ptr.as_ptr(), layout) }
    }
}

unsafe impl<A: Allocator + ?Sized> Allocator for Arc<A> {
    #[inline]
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocError> {
        (**self).allocate(layout)
    }

    #[inline]
    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        unsafe { (**self).deallocate(ptr, layout) }
    }
}

/// Receives notifications about allocations made through a [Tracked] allocator
pub trait AllocationSink: Send + Sync {
    /// Called after a block with the given layout has been allocated
    fn allocated(&self, layout: Layout);

    /// Called after a block with the given layout has been released
    fn deallocated(&self, layout: Layout);
}

impl<S: AllocationSink + ?Sized> AllocationSink for Arc<S> {
    fn allocated(&self, layout: Layout) {
        (**self).allocated(layout)
    }

    fn deallocated(&self, layout: Layout) {
        (**self).deallocated(layout)
    }
}

/// An [AllocationSink] that counts allocations and the bytes that are currently live
#[derive(Debug, Default)]
pub struct AllocationCounter {
    allocations: AtomicUsize,
    deallocations: AtomicUsize,
    live_bytes: AtomicUsize,
}

impl AllocationCounter {
    /// Returns the number of blocks that have been allocated
    pub fn allocations(&self) -> usize {
        self.allocations.load(Ordering::SeqCst)
    }

    /// Returns the number of blocks that have been released
    pub fn deallocations(&self) -> usize {
        self.deallocations.load(Ordering::SeqCst)
    }

    /// Returns the number of blocks that have been allocated but not yet released
    pub fn live_allocations(&self) -> usize {
        self.allocations() - self.deallocations()
    }

    /// Returns the total size of the blocks that haven't been released yet
    pub fn live_bytes(&self) -> usize {
        self.live_bytes.load(Ordering::SeqCst)
    }
}

impl AllocationSink for AllocationCounter {
    fn allocated(&self, layout: Layout) {
        self.allocations.fetch_add(1, Ordering::SeqCst);
        self.live_bytes.fetch_add(layout.size(), Ordering::SeqCst);
    }

    fn deallocated(&self, layout: Layout) {
        self.deallocations.fetch_add(1, Ordering::SeqCst);
        self.live_bytes.fetch_sub(layout.size(), Ordering::SeqCst);
    }
}

/// An allocator adapter that reports every allocation to an [AllocationSink]
///
/// # Example
///
/// ```
/// use holder::{AllocationCounter, Global, Tracked, allocate_shared};
/// use std::sync::Arc;
///
/// let counter = Arc::new(AllocationCounter::default());
/// let shared = allocate_shared(Tracked::new(Global, counter.clone()), 42).unwrap();
/// assert_eq!(counter.live_allocations(), 1);
///
/// drop(shared);
/// assert_eq!(counter.live_allocations(), 0);
/// ```
#[derive(Clone, Debug, Default)]
pub struct Tracked<A, S> {
    inner: A,
    sink: S,
}

impl<A, S> Tracked<A, S> {
    /// Wraps `inner`, reporting to `sink`
    pub fn new(inner: A, sink: S) -> Self {
        Self { inner, sink }
    }

    /// Returns a reference to the sink
    pub fn sink(&self) -> &S {
        &self.sink
    }
}

unsafe impl<A: Allocator, S: AllocationSink> Allocator for Tracked<A, S> {
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocError> {
        let ptr = self.inner.allocate(layout)?;
        self.sink.allocated(layout);
        Ok(ptr)
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        unsafe { self.inner.deallocate(ptr, layout) };
        self.sink.deallocated(layout);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracked_global_allocations_are_counted() {
        let counter = Arc::new(AllocationCounter::default());
        let allocator = Tracked::new(Global, counter.clone());
        let layout = Layout::new::<[u64; 4]>();

        let block = allocator.allocate(layout).unwrap();
        assert_eq!(counter.allocations(), 1);
        assert_eq!(counter.live_bytes(), 32);

        unsafe { allocator.deallocate(block, layout) };
        assert_eq!(counter.deallocations(), 1);
        assert_eq!(counter.live_allocations(), 0);
        assert_eq!(counter.live_bytes(), 0);
    }

    #[test]
    fn shared_allocator() {
        let counter = Arc::new(AllocationCounter::default());
        let allocator = Arc::new(Tracked::new(Global, counter.clone()));
        let layout = Layout::new::<u32>();

        let a = allocator.allocate(layout).unwrap();
        let b = allocator.clone().allocate(layout).unwrap();
        assert_eq!(counter.live_allocations(), 2);

        unsafe {
            allocator.deallocate(a, layout);
            allocator.deallocate(b, layout);
        }
        assert_eq!(counter.live_allocations(), 0);
    }
}
