//! Records that share a single allocation with their managed object
//!
//! The block starts with the record, and the value follows at [CoLocated::VALUE_OFFSET], which
//! is the size of the record rounded up to the value's alignment:
//!
//! ```text
//! [header | allocator | padding][value]
//! ^ record address               ^ record address + VALUE_OFFSET
//! ```
//!
//! No pointer to the value is stored, teardown recomputes it from the record's address.

use super::{RecordHeader, RecordKind, RecordRef};
use crate::{Allocator, Error, Result};
use std::{
    alloc::Layout,
    marker::PhantomData,
    mem,
    ptr::{self, NonNull},
};

#[repr(C)]
pub(crate) struct CoLocated<T, A> {
    header: RecordHeader,
    allocator: A,
    _value: PhantomData<T>,
}

impl<T, A: Allocator> CoLocated<T, A> {
    /// The offset in bytes from the start of the record to the start of the value
    pub(crate) const VALUE_OFFSET: usize = size_of::<Self>().next_multiple_of(align_of::<T>());

    const BLOCK_SIZE: Option<usize> = Self::VALUE_OFFSET.checked_add(size_of::<T>());

    const BLOCK_ALIGN: usize = if align_of::<Self>() > align_of::<T>() {
        align_of::<Self>()
    } else {
        align_of::<T>()
    };

    /// Returns the layout of the block that holds the record followed by the value
    pub(crate) fn block_layout() -> Result<Layout> {
        let size = Self::BLOCK_SIZE.ok_or(Error::LayoutOverflow)?;
        Layout::from_size_align(size, Self::BLOCK_ALIGN).map_err(|_| Error::LayoutOverflow)
    }

    /// Returns a pointer to the value that follows the record
    fn value_ptr(record: NonNull<Self>) -> NonNull<T> {
        // SAFETY: the value lies within the record's block
        unsafe { record.cast::<u8>().add(Self::VALUE_OFFSET).cast() }
    }

    /// Allocates a single block containing a new record, followed by the value returned by `init`
    ///
    /// The record is written first, then `init` is called to produce the value. If `init` panics
    /// then the record is destroyed and the block is released before the panic continues.
    pub(crate) fn allocate(
        allocator: A,
        init: impl FnOnce() -> T,
    ) -> Result<(RecordRef, NonNull<T>)> {
        let layout = Self::block_layout()?;
        let block = allocator
            .allocate(layout)
            .map_err(|_| Error::AllocationFailed { layout })?;

        let record = block.cast::<Self>();
        unsafe {
            record.as_ptr().write(Self {
                header: RecordHeader::new(RecordKind::CoLocated, Self::teardown),
                allocator,
                _value: PhantomData,
            });
        }

        let guard = ReleaseBlock { record, layout };
        let value = Self::value_ptr(record);
        let initial = init();
        unsafe { value.as_ptr().write(initial) };
        mem::forget(guard);

        Ok((unsafe { RecordRef::from_header(record.cast()) }, value))
    }

    unsafe fn teardown(header: NonNull<RecordHeader>) {
        let record = header.cast::<Self>();

        // The block is released when the guard is dropped, even if the value's destructor panics
        let _release = ReleaseBlock {
            record,
            // SAFETY: the layout was validated when the block was allocated
            layout: unsafe {
                Layout::from_size_align_unchecked(
                    Self::VALUE_OFFSET + size_of::<T>(),
                    Self::BLOCK_ALIGN,
                )
            },
        };

        unsafe { ptr::drop_in_place(Self::value_ptr(record).as_ptr()) };
    }
}

/// Destroys a record and releases its block when dropped
///
/// Used during teardown after the value has been dropped, and during allocation in case the
/// value's initializer panics.
struct ReleaseBlock<T, A: Allocator> {
    record: NonNull<CoLocated<T, A>>,
    layout: Layout,
}

impl<T, A: Allocator> Drop for ReleaseBlock<T, A> {
    fn drop(&mut self) {
        // SAFETY: the record is read out exactly once, and the block is released with the
        // layout it was allocated with
        unsafe {
            let CoLocated { allocator, .. } = self.record.as_ptr().read();
            allocator.deallocate(self.record.cast(), self.layout);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AllocationCounter, Global, Tracked};
    use std::{
        mem::MaybeUninit,
        panic::{AssertUnwindSafe, catch_unwind},
        sync::Arc,
    };

    #[allow(dead_code)]
    #[repr(C)]
    struct Expected<T, A> {
        record: CoLocated<T, A>,
        value: T,
    }

    #[allow(dead_code)]
    #[repr(align(64))]
    struct CacheLine([u8; 64]);

    fn check_layout<T>() {
        let expected = MaybeUninit::<Expected<T, Global>>::uninit();
        let base = expected.as_ptr();
        let expected_offset = unsafe { &raw const (*base).value } as usize - base as usize;

        let offset = CoLocated::<T, Global>::VALUE_OFFSET;
        assert_eq!(offset, expected_offset);
        assert_eq!(offset % align_of::<T>(), 0);

        let layout = CoLocated::<T, Global>::block_layout().unwrap();
        assert_eq!(layout.size(), offset + size_of::<T>());
        assert!(layout.align() >= align_of::<T>());
        assert!(layout.align() >= align_of::<RecordHeader>());
    }

    #[test]
    fn value_offset_matches_a_repr_c_pair() {
        check_layout::<u8>();
        check_layout::<[u8; 3]>();
        check_layout::<u64>();
        check_layout::<u128>();
        check_layout::<()>();
        check_layout::<CacheLine>();
        check_layout::<String>();
    }

    #[test]
    fn value_is_stored_after_the_record() {
        let (record, value) = CoLocated::allocate(Global, || 19u32).unwrap();

        let distance = value.as_ptr() as usize - record.address().as_usize();
        assert_eq!(distance, CoLocated::<u32, Global>::VALUE_OFFSET);
        assert_eq!(unsafe { *value.as_ptr() }, 19);
        assert_eq!(record.kind(), RecordKind::CoLocated);

        unsafe { record.release() };
    }

    #[test]
    fn one_block_per_value() {
        let counter = Arc::new(AllocationCounter::default());
        let allocator = Tracked::new(Global, counter.clone());

        let (record, _) = CoLocated::allocate(allocator, || String::from("colocated")).unwrap();
        assert_eq!(counter.allocations(), 1);
        assert_eq!(
            counter.live_bytes(),
            CoLocated::<String, Tracked<Global, Arc<AllocationCounter>>>::block_layout()
                .unwrap()
                .size()
        );

        unsafe { record.release() };
        assert_eq!(counter.deallocations(), 1);
        assert_eq!(counter.live_bytes(), 0);
    }

    #[test]
    fn panicking_initializer_releases_the_block() {
        let counter = Arc::new(AllocationCounter::default());
        let allocator = Tracked::new(Global, counter.clone());

        let result = catch_unwind(AssertUnwindSafe(|| {
            CoLocated::<u64, _>::allocate(allocator, || panic!("initializer failed"))
        }));

        assert!(result.is_err());
        assert_eq!(counter.allocations(), 1);
        assert_eq!(counter.deallocations(), 1);
    }

    #[test]
    fn panicking_destructor_releases_the_block() {
        struct PanicOnDrop;

        impl Drop for PanicOnDrop {
            fn drop(&mut self) {
                panic!("destructor failed");
            }
        }

        let counter = Arc::new(AllocationCounter::default());
        let allocator = Tracked::new(Global, counter.clone());
        let (record, _) = CoLocated::allocate(allocator, || PanicOnDrop).unwrap();

        let result = catch_unwind(AssertUnwindSafe(|| unsafe { record.release() }));

        assert!(result.is_err());
        assert_eq!(counter.allocations(), 1);
        assert_eq!(counter.deallocations(), 1);
        assert_eq!(counter.live_bytes(), 0);
    }
}
