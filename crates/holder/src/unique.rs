use crate::{DefaultDelete, Deleter};
use std::{
    fmt,
    marker::PhantomData,
    mem::{self, ManuallyDrop},
    ops::{Deref, DerefMut},
    ptr::{self, NonNull},
};

/// A pointer with a single owner, which destroys its object with a [Deleter]
///
/// `UniquePtr` can't be cloned, ownership is transferred by moving the pointer. The deleter is
/// only invoked when the pointer isn't null, either when the `UniquePtr` is dropped or when the
/// object is replaced with [reset](Self::reset).
///
/// Like [Box], the pointer's own functions are associated functions (e.g. `UniquePtr::get(&p)`)
/// to avoid clashing with methods on the pointee.
///
/// Dereferencing a null `UniquePtr` panics, see [UniquePtr::as_ref] for a non-panicking
/// alternative.
pub struct UniquePtr<T: ?Sized, D: Deleter<T> = DefaultDelete> {
    pointer: Option<NonNull<T>>,
    deleter: D,
    _owns: PhantomData<T>,
}

unsafe impl<T: ?Sized + Send, D: Deleter<T> + Send> Send for UniquePtr<T, D> {}
unsafe impl<T: ?Sized + Sync, D: Deleter<T> + Sync> Sync for UniquePtr<T, D> {}

impl<T> UniquePtr<T> {
    /// Moves the provided value into newly allocated memory
    pub fn new(value: T) -> Self {
        Self::from_box(Box::new(value))
    }
}

impl<T: ?Sized> UniquePtr<T> {
    /// Takes ownership of a boxed value
    pub fn from_box(boxed: Box<T>) -> Self {
        Self {
            pointer: Some(NonNull::from(Box::leak(boxed))),
            deleter: DefaultDelete,
            _owns: PhantomData,
        }
    }

    /// Converts the pointer back into a [Box], or returns `None` if the pointer is null
    pub fn into_box(this: Self) -> Option<Box<T>> {
        let (pointer, _) = Self::into_parts(this);
        // SAFETY: pointers owned with DefaultDelete were allocated with Box
        pointer.map(|pointer| unsafe { Box::from_raw(pointer.as_ptr()) })
    }
}

impl<T: ?Sized, D: Deleter<T>> UniquePtr<T, D> {
    /// Makes a null pointer with a default-constructed deleter
    pub fn null() -> Self
    where
        D: Default,
    {
        Self {
            pointer: None,
            deleter: D::default(),
            _owns: PhantomData,
        }
    }

    /// Takes ownership of a raw pointer, using a default-constructed deleter
    ///
    /// A null `pointer` produces a null `UniquePtr`.
    ///
    /// # Safety
    ///
    /// A non-null `pointer` must be valid for reads and writes, and must be safe to pass to the
    /// deleter once the `UniquePtr` no longer needs it.
    pub unsafe fn from_raw(pointer: *mut T) -> Self
    where
        D: Default,
    {
        unsafe { Self::from_raw_with_deleter(pointer, D::default()) }
    }

    /// Takes ownership of a raw pointer along with the deleter that should destroy it
    ///
    /// # Safety
    ///
    /// See [UniquePtr::from_raw].
    pub unsafe fn from_raw_with_deleter(pointer: *mut T, deleter: D) -> Self {
        Self {
            pointer: NonNull::new(pointer),
            deleter,
            _owns: PhantomData,
        }
    }

    /// Returns the owned pointer without giving up ownership
    pub fn get(this: &Self) -> Option<NonNull<T>> {
        this.pointer
    }

    /// Returns true if the pointer is null
    pub fn is_null(this: &Self) -> bool {
        this.pointer.is_none()
    }

    /// Returns a reference to the owned object, or `None` if the pointer is null
    pub fn as_ref(this: &Self) -> Option<&T> {
        // SAFETY: the object stays alive for as long as it's owned
        this.pointer.map(|pointer| unsafe { pointer.as_ref() })
    }

    /// Returns a mutable reference to the owned object, or `None` if the pointer is null
    pub fn as_mut(this: &mut Self) -> Option<&mut T> {
        // SAFETY: ownership is exclusive, so no other references to the object exist
        this.pointer.map(|mut pointer| unsafe { pointer.as_mut() })
    }

    /// Returns a reference to the deleter
    pub fn get_deleter(this: &Self) -> &D {
        &this.deleter
    }

    /// Returns a mutable reference to the deleter
    pub fn get_deleter_mut(this: &mut Self) -> &mut D {
        &mut this.deleter
    }

    /// Gives up ownership of the object without destroying it
    ///
    /// The caller becomes responsible for the returned pointer, and this `UniquePtr` is left null.
    #[must_use = "the released object will leak unless it is destroyed by the caller"]
    pub fn release(this: &mut Self) -> Option<NonNull<T>> {
        this.pointer.take()
    }

    /// Replaces the owned object with `pointer`, destroying the previous object if there was one
    ///
    /// # Safety
    ///
    /// See [UniquePtr::from_raw].
    pub unsafe fn reset(this: &mut Self, pointer: *mut T) {
        let previous = mem::replace(&mut this.pointer, NonNull::new(pointer));
        if let Some(previous) = previous {
            unsafe { this.deleter.delete(previous) };
        }
    }

    /// Destroys the owned object (if any), leaving the pointer null
    pub fn reset_null(this: &mut Self) {
        if let Some(previous) = this.pointer.take() {
            unsafe { this.deleter.delete(previous) };
        }
    }

    /// Swaps the objects and deleters of two pointers
    pub fn swap(this: &mut Self, other: &mut Self) {
        mem::swap(this, other);
    }

    /// Splits the pointer into its owned pointer and deleter without destroying the object
    pub fn into_parts(this: Self) -> (Option<NonNull<T>>, D) {
        let this = ManuallyDrop::new(this);
        // SAFETY: `this` is never dropped, so the deleter is moved out exactly once
        let deleter = unsafe { ptr::read(&this.deleter) };
        (this.pointer, deleter)
    }
}

impl<T: ?Sized, D: Deleter<T>> Drop for UniquePtr<T, D> {
    fn drop(&mut self) {
        Self::reset_null(self);
    }
}

impl<T: ?Sized, D: Deleter<T>> Deref for UniquePtr<T, D> {
    type Target = T;

    fn deref(&self) -> &T {
        match Self::as_ref(self) {
            Some(value) => value,
            None => null_dereference("UniquePtr"),
        }
    }
}

impl<T: ?Sized, D: Deleter<T>> DerefMut for UniquePtr<T, D> {
    fn deref_mut(&mut self) -> &mut T {
        match Self::as_mut(self) {
            Some(value) => value,
            None => null_dereference("UniquePtr"),
        }
    }
}

impl<T: ?Sized, D: Deleter<T> + Default> Default for UniquePtr<T, D> {
    fn default() -> Self {
        Self::null()
    }
}

impl<T: ?Sized> From<Box<T>> for UniquePtr<T> {
    fn from(boxed: Box<T>) -> Self {
        Self::from_box(boxed)
    }
}

impl<T: ?Sized + fmt::Debug, D: Deleter<T>> fmt::Debug for UniquePtr<T, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("UniquePtr").field(&Self::as_ref(self)).finish()
    }
}

#[cold]
#[track_caller]
pub(crate) fn null_dereference(pointer_type: &str) -> ! {
    panic!("Attempted to dereference a null {pointer_type}")
}
