//! Testing utilities for the holder crate

#![warn(missing_docs)]

mod allocators;
mod drop_tracking;

pub use allocators::{AllocationEvent, FailingAllocator, RecordingSink};
pub use drop_tracking::{Counted, CountingDeleter, DropCounter};
