use std::ptr::NonNull;

/// Destroys the object behind an owning pointer
///
/// A deleter is invoked at most once per owned pointer, and never with a null pointer.
///
/// Any `FnMut(NonNull<T>)` closure or function can be used as a deleter.
///
/// # Example
///
/// ```
/// use holder::UniquePtr;
/// use std::ptr::NonNull;
///
/// let raw = Box::into_raw(Box::new(String::from("hello")));
/// let owned = unsafe {
///     UniquePtr::from_raw_with_deleter(raw, |ptr: NonNull<String>| {
///         drop(unsafe { Box::from_raw(ptr.as_ptr()) });
///     })
/// };
/// assert_eq!(owned.as_str(), "hello");
/// ```
pub trait Deleter<T: ?Sized> {
    /// Destroys the object at `ptr` and releases its storage
    ///
    /// # Safety
    ///
    /// `ptr` must point to an object that this deleter knows how to destroy, and the object
    /// must not be used again afterwards.
    unsafe fn delete(&mut self, ptr: NonNull<T>);
}

/// The default deleter, for objects that were allocated with [Box]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DefaultDelete;

impl<T: ?Sized> Deleter<T> for DefaultDelete {
    #[inline]
    unsafe fn delete(&mut self, ptr: NonNull<T>) {
        drop(unsafe { Box::from_raw(ptr.as_ptr()) });
    }
}

impl<T: ?Sized, F> Deleter<T> for F
where
    F: FnMut(NonNull<T>),
{
    #[inline]
    unsafe fn delete(&mut self, ptr: NonNull<T>) {
        self(ptr)
    }
}
