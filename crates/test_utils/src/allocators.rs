use holder::{AllocError, AllocationSink, Allocator, Global};
use parking_lot::Mutex;
use std::{
    alloc::Layout,
    ptr::NonNull,
    sync::atomic::{AtomicUsize, Ordering},
};

/// An allocator that starts failing after a fixed number of successful allocations
///
/// Successful allocations are forwarded to the global allocator.
#[derive(Debug)]
pub struct FailingAllocator {
    remaining: AtomicUsize,
}

impl FailingAllocator {
    /// Makes an allocator that fails every request
    pub fn always() -> Self {
        Self::after(0)
    }

    /// Makes an allocator that succeeds `successes` times and then fails
    pub fn after(successes: usize) -> Self {
        Self {
            remaining: AtomicUsize::new(successes),
        }
    }
}

unsafe impl Allocator for FailingAllocator {
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocError> {
        self.remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .map_err(|_| AllocError)?;
        Global.allocate(layout)
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        unsafe { Global.deallocate(ptr, layout) }
    }
}

/// An event reported to a [RecordingSink]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AllocationEvent {
    /// A block with the given layout was allocated
    Allocated(Layout),
    /// A block with the given layout was released
    Deallocated(Layout),
}

/// An [AllocationSink] that records every event in order
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<AllocationEvent>>,
}

impl RecordingSink {
    /// Returns a copy of the events recorded so far
    pub fn events(&self) -> Vec<AllocationEvent> {
        self.events.lock().clone()
    }

    /// Clears the recorded events
    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl AllocationSink for RecordingSink {
    fn allocated(&self, layout: Layout) {
        self.events.lock().push(AllocationEvent::Allocated(layout));
    }

    fn deallocated(&self, layout: Layout) {
        self.events.lock().push(AllocationEvent::Deallocated(layout));
    }
}
