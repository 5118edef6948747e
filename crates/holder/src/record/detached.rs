//! Records for objects that were allocated independently of their record

use super::{RecordHeader, RecordKind, RecordRef};
use crate::{Allocator, Deleter, Error, Global, Result};
use std::{alloc::Layout, ptr::NonNull};

/// A record that owns a pointer and the deleter that destroys it
///
/// The record itself is stored with the [Global] allocator.
#[repr(C)]
pub(crate) struct DeleterOwned<T: ?Sized, D> {
    header: RecordHeader,
    pointer: Option<NonNull<T>>,
    deleter: D,
}

impl<T: ?Sized, D: Deleter<T>> DeleterOwned<T, D> {
    /// Allocates a record that takes ownership of `pointer`
    ///
    /// If the record can't be allocated then `pointer` is passed to the deleter before the error
    /// is returned.
    ///
    /// # Safety
    ///
    /// `pointer`, if present, must be valid for `deleter` to destroy once the record is torn down.
    pub(crate) unsafe fn allocate(pointer: Option<NonNull<T>>, deleter: D) -> Result<RecordRef> {
        let layout = Layout::new::<Self>();

        let Ok(block) = Global.allocate(layout) else {
            unsafe { delete_owned(pointer, deleter) };
            return Err(Error::AllocationFailed { layout });
        };

        let record = block.cast::<Self>();
        unsafe {
            record.as_ptr().write(Self {
                header: RecordHeader::new(RecordKind::Detached, Self::teardown),
                pointer,
                deleter,
            });
            Ok(RecordRef::from_header(record.cast()))
        }
    }

    unsafe fn teardown(header: NonNull<RecordHeader>) {
        let record = header.cast::<Self>();

        // SAFETY: the header is the first field of a DeleterOwned<T, D>, and the record is read
        // out exactly once, by the last strong reference
        let Self { pointer, deleter, .. } = unsafe { record.as_ptr().read() };

        unsafe {
            delete_owned(pointer, deleter);
            Global.deallocate(record.cast(), Layout::new::<Self>());
        }
    }
}

/// A record that owns a pointer and its deleter, stored using a caller-provided allocator
#[repr(C)]
pub(crate) struct AllocatorOwned<T: ?Sized, D, A> {
    header: RecordHeader,
    pointer: Option<NonNull<T>>,
    deleter: D,
    allocator: A,
}

impl<T: ?Sized, D: Deleter<T>, A: Allocator> AllocatorOwned<T, D, A> {
    /// Allocates a record with `allocator` that takes ownership of `pointer`
    ///
    /// The allocator is moved into the record and is used again to release the record's storage.
    /// If the record can't be allocated then `pointer` is passed to the deleter before the error
    /// is returned.
    ///
    /// # Safety
    ///
    /// `pointer`, if present, must be valid for `deleter` to destroy once the record is torn down.
    pub(crate) unsafe fn allocate(
        pointer: Option<NonNull<T>>,
        deleter: D,
        allocator: A,
    ) -> Result<RecordRef> {
        let layout = Layout::new::<Self>();

        let Ok(block) = allocator.allocate(layout) else {
            unsafe { delete_owned(pointer, deleter) };
            return Err(Error::AllocationFailed { layout });
        };

        let record = block.cast::<Self>();
        unsafe {
            record.as_ptr().write(Self {
                header: RecordHeader::new(RecordKind::DetachedInAllocator, Self::teardown),
                pointer,
                deleter,
                allocator,
            });
            Ok(RecordRef::from_header(record.cast()))
        }
    }

    unsafe fn teardown(header: NonNull<RecordHeader>) {
        let record = header.cast::<Self>();

        // SAFETY: see DeleterOwned::teardown
        let Self {
            pointer,
            deleter,
            allocator,
            ..
        } = unsafe { record.as_ptr().read() };

        unsafe {
            delete_owned(pointer, deleter);
            allocator.deallocate(record.cast(), Layout::new::<Self>());
        }
    }
}

/// Passes the pointer (if any) to the deleter, and then drops the deleter
unsafe fn delete_owned<T: ?Sized, D: Deleter<T>>(pointer: Option<NonNull<T>>, mut deleter: D) {
    if let Some(pointer) = pointer {
        unsafe { deleter.delete(pointer) };
    }
}
