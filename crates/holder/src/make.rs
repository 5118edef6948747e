//! Construction helpers

use crate::{
    Allocator, Global, MaybeSend, Result, SharedPtr, UniquePtr, error::unwrap_or_alloc_error,
    record::colocated::CoLocated,
};

/// Makes a [SharedPtr] that stores `value` in the same allocation as its ownership record
///
/// Only a single allocation is made, containing the record followed by the value.
///
/// # Example
///
/// ```
/// use holder::{RecordKind, SharedPtr, make_shared};
///
/// let shared = make_shared(String::from("hello"));
/// assert_eq!(shared.as_str(), "hello");
/// assert_eq!(SharedPtr::record_kind(&shared), Some(RecordKind::CoLocated));
/// ```
pub fn make_shared<T>(value: T) -> SharedPtr<T> {
    unwrap_or_alloc_error(try_make_shared(value))
}

/// Fallible version of [make_shared]
///
/// `value` is dropped if an error is returned.
pub fn try_make_shared<T>(value: T) -> Result<SharedPtr<T>> {
    allocate_shared(Global, value)
}

/// Makes a [SharedPtr] with a single allocation, constructing the value in place with `init`
///
/// `init` is called after the block has been allocated. If it panics, the block is released
/// before the panic continues.
pub fn make_shared_with<T, F>(init: F) -> SharedPtr<T>
where
    F: FnOnce() -> T,
{
    unwrap_or_alloc_error(allocate_shared_with(Global, init))
}

/// Makes a [SharedPtr] with a single allocation provided by `allocator`
///
/// The allocator is stored in the record and releases the block once the last owner has been
/// dropped. `value` is dropped if an error is returned.
pub fn allocate_shared<T, A>(allocator: A, value: T) -> Result<SharedPtr<T>>
where
    A: Allocator + MaybeSend + 'static,
{
    allocate_shared_with(allocator, move || value)
}

/// Makes a [SharedPtr] with a single allocation provided by `allocator`, constructing the value
/// in place with `init`
///
/// `init` isn't called if the allocation fails.
pub fn allocate_shared_with<T, A, F>(allocator: A, init: F) -> Result<SharedPtr<T>>
where
    A: Allocator + MaybeSend + 'static,
    F: FnOnce() -> T,
{
    let (record, value) = CoLocated::allocate(allocator, init)?;
    // SAFETY: the new record's initial strong reference is handed to the SharedPtr
    Ok(unsafe { SharedPtr::from_parts(Some(value), Some(record)) })
}

/// Makes a [UniquePtr] that owns `value`
pub fn make_unique<T>(value: T) -> UniquePtr<T> {
    UniquePtr::new(value)
}
