//! Ownership records
//!
//! Every independently constructed managed object gets exactly one record, shared by all of the
//! [SharedPtr](crate::SharedPtr)s in its ownership group. Records of any concrete type start with
//! a [RecordHeader], which holds the reference counts and a teardown function that knows how the
//! rest of the record (and the managed object) must be destroyed. Handles only ever see the
//! header, so handles of unrelated element types can share a record.

pub(crate) mod colocated;
pub(crate) mod detached;

use crate::{Address, count_impl::RefCount};
use std::ptr::NonNull;

/// Describes how an ownership record stores its managed object
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum RecordKind {
    /// The object was allocated separately and is destroyed by a deleter
    ///
    /// The record is stored using the global allocator.
    Detached,
    /// The object was allocated separately and is destroyed by a deleter
    ///
    /// The record is stored using a caller-provided allocator.
    DetachedInAllocator,
    /// The object lives in the same allocation as the record, directly after it
    CoLocated,
}

/// The common prefix of every ownership record
///
/// Concrete records are `#[repr(C)]` with the header as their first field, so a pointer to the
/// header is also a pointer to the record.
#[repr(C)]
pub(crate) struct RecordHeader {
    strong: RefCount,
    weak: RefCount,
    kind: RecordKind,
    teardown: unsafe fn(NonNull<RecordHeader>),
}

impl RecordHeader {
    /// Makes a header with a strong count of 1
    ///
    /// `teardown` is called when the strong count drops to zero, and must destroy the managed
    /// object and then release the record's storage.
    pub(crate) const fn new(kind: RecordKind, teardown: unsafe fn(NonNull<RecordHeader>)) -> Self {
        Self {
            strong: RefCount::new(1),
            weak: RefCount::new(0),
            kind,
            teardown,
        }
    }
}

/// A counted reference to a live ownership record
///
/// Copying a `RecordRef` doesn't touch the counts, callers are responsible for pairing each
/// [acquire](Self::acquire) with a [release](Self::release).
#[derive(Copy, Clone, PartialEq, Eq)]
pub(crate) struct RecordRef(NonNull<RecordHeader>);

impl RecordRef {
    /// Wraps a pointer to an initialized record header
    ///
    /// # Safety
    ///
    /// `header` must point to the header of a live record, and the caller must own one of the
    /// record's strong references.
    pub(crate) unsafe fn from_header(header: NonNull<RecordHeader>) -> Self {
        Self(header)
    }

    fn header(&self) -> &RecordHeader {
        // SAFETY: a RecordRef is only held while a strong reference keeps the record alive
        unsafe { self.0.as_ref() }
    }

    pub(crate) fn strong_count(self) -> usize {
        self.header().strong.get()
    }

    pub(crate) fn weak_count(self) -> usize {
        self.header().weak.get()
    }

    pub(crate) fn kind(self) -> RecordKind {
        self.header().kind
    }

    pub(crate) fn address(self) -> Address {
        self.0.as_ptr().into()
    }

    /// Adds a strong reference to the record
    #[inline]
    pub(crate) fn acquire(self) {
        self.header().strong.increment();
    }

    /// Drops a strong reference, tearing the record down if it was the last one
    ///
    /// # Safety
    ///
    /// The caller must own a strong reference to the record that hasn't been released yet, and
    /// must not use this `RecordRef` afterwards.
    #[inline]
    pub(crate) unsafe fn release(self) {
        let header = self.0.as_ptr();

        // SAFETY: the caller's strong reference keeps the record alive until the decrement
        let previous = unsafe { (*header).strong.decrement() };

        // Only the decrement that observed 1 can reach this point
        if previous == 1 {
            let teardown = unsafe { (*header).teardown };
            unsafe { teardown(self.0) };
        }
    }
}
