use crate::{
    Address, Allocator, DefaultDelete, Deleter, MaybeSend, MaybeSync, RecordKind, Result,
    UniquePtr,
    error::unwrap_or_alloc_error,
    make_shared,
    record::{
        RecordRef,
        detached::{AllocatorOwned, DeleterOwned},
    },
    unique::null_dereference,
};
use std::{
    cmp::Ordering,
    fmt,
    hash::{Hash, Hasher},
    marker::PhantomData,
    mem::ManuallyDrop,
    ops::Deref,
    ptr::NonNull,
};

/// A reference-counted pointer to an object that is shared between multiple owners
///
/// A `SharedPtr` is made up of a stored pointer (what the handle dereferences to) and a pointer
/// to an ownership record (which decides when the managed object is destroyed). Cloning a
/// `SharedPtr` increments the record's strong count, and dropping it decrements the count.
/// The handle whose drop brings the count to zero tears down the record, which destroys the
/// managed object and then releases the record's storage.
///
/// The stored pointer and the managed object are usually the same, but aliasing handles (see
/// [SharedPtr::project] and [SharedPtr::alias]) can point at a sub-object, or any other object,
/// while keeping the original managed object alive.
///
/// Like [std::sync::Arc], the pointer's own functions are associated functions
/// (e.g. `SharedPtr::use_count(&p)`) to avoid clashing with methods on the pointee.
///
/// # Feature-specific behavior
///
/// - With the "atomic" feature, the reference counts are atomic and `SharedPtr<T>` is `Send` and
///   `Sync` when `T` is `Send + Sync`.
/// - With the "local" feature, the counts aren't atomic and `SharedPtr` can't leave its thread.
///
/// # Example
///
/// ```
/// use holder::{SharedPtr, make_shared};
///
/// let a = make_shared(19);
/// let b = a.clone();
/// assert_eq!(*b, 19);
/// assert_eq!(SharedPtr::use_count(&a), 2);
///
/// drop(a);
/// assert_eq!(SharedPtr::use_count(&b), 1);
/// ```
pub struct SharedPtr<T: ?Sized> {
    pointer: Option<NonNull<T>>,
    record: Option<RecordRef>,
    // True when the stored pointer was derived from a shared reference or provided by an alias,
    // rather than being the record's managed object
    projected: bool,
    _owns: PhantomData<T>,
}

#[cfg(feature = "atomic")]
unsafe impl<T: ?Sized + Send + Sync> Send for SharedPtr<T> {}
#[cfg(feature = "atomic")]
unsafe impl<T: ?Sized + Send + Sync> Sync for SharedPtr<T> {}

impl<T> SharedPtr<T> {
    /// Moves the provided value into a single allocation shared with its ownership record
    ///
    /// See [make_shared].
    pub fn new(value: T) -> Self {
        make_shared(value)
    }
}

impl<T: ?Sized> SharedPtr<T> {
    /// Makes an empty pointer, with no object and no ownership record
    pub const fn null() -> Self {
        Self {
            pointer: None,
            record: None,
            projected: false,
            _owns: PhantomData,
        }
    }

    /// Assembles a pointer from a stored pointer and a counted record reference
    ///
    /// # Safety
    ///
    /// The caller transfers one strong reference to the record (if present) to the new pointer,
    /// and the stored pointer must stay valid while the record is alive.
    pub(crate) unsafe fn from_parts(pointer: Option<NonNull<T>>, record: Option<RecordRef>) -> Self {
        Self {
            pointer,
            record,
            projected: false,
            _owns: PhantomData,
        }
    }

    /// Assembles a pointer whose stored pointer isn't the record's managed object
    ///
    /// Projected pointers are never given mutable access to their pointee.
    ///
    /// # Safety
    ///
    /// See [SharedPtr::from_parts].
    unsafe fn from_projection(pointer: Option<NonNull<T>>, record: Option<RecordRef>) -> Self {
        Self {
            pointer,
            record,
            projected: true,
            _owns: PhantomData,
        }
    }

    /// Gives up the handle's record reference without releasing it
    fn into_record(this: Self) -> Option<RecordRef> {
        ManuallyDrop::new(this).record
    }

    /// Takes ownership of a boxed value
    ///
    /// The value stays in the box's allocation, and a separate ownership record is allocated
    /// for it.
    pub fn from_box(boxed: Box<T>) -> Self {
        unwrap_or_alloc_error(Self::try_from_box(boxed))
    }

    /// Takes ownership of a boxed value, returning an error if the record can't be allocated
    ///
    /// The boxed value is dropped if an error is returned.
    pub fn try_from_box(boxed: Box<T>) -> Result<Self> {
        // SAFETY: the pointer comes from a Box, which is what DefaultDelete expects
        unsafe { Self::try_from_raw_with_deleter(Box::into_raw(boxed), DefaultDelete) }
    }

    /// Takes ownership of a raw pointer that was allocated with [Box]
    ///
    /// A null pointer produces an empty `SharedPtr` without allocating a record.
    ///
    /// # Safety
    ///
    /// A non-null `pointer` must have been produced by [Box::into_raw], and must not be owned by
    /// anything else.
    pub unsafe fn from_raw(pointer: *mut T) -> Self {
        unwrap_or_alloc_error(unsafe { Self::try_from_raw(pointer) })
    }

    /// Fallible version of [SharedPtr::from_raw]
    ///
    /// If the record can't be allocated then the object is destroyed before the error is
    /// returned.
    ///
    /// # Safety
    ///
    /// See [SharedPtr::from_raw].
    pub unsafe fn try_from_raw(pointer: *mut T) -> Result<Self> {
        if pointer.is_null() {
            Ok(Self::null())
        } else {
            unsafe { Self::try_from_raw_with_deleter(pointer, DefaultDelete) }
        }
    }

    /// Takes ownership of a raw pointer along with the deleter that should destroy it
    ///
    /// A record is allocated even when `pointer` is null, so the resulting `SharedPtr` has a
    /// use count of 1. The deleter is never called with a null pointer.
    ///
    /// # Safety
    ///
    /// A non-null `pointer` must be valid for reads for as long as the record is alive, and must
    /// be safe to pass to `deleter` once the last owner has been dropped.
    pub unsafe fn from_raw_with_deleter<D>(pointer: *mut T, deleter: D) -> Self
    where
        D: Deleter<T> + MaybeSend + 'static,
    {
        unwrap_or_alloc_error(unsafe { Self::try_from_raw_with_deleter(pointer, deleter) })
    }

    /// Fallible version of [SharedPtr::from_raw_with_deleter]
    ///
    /// If the record can't be allocated then `deleter` is called with the pointer before the
    /// error is returned.
    ///
    /// # Safety
    ///
    /// See [SharedPtr::from_raw_with_deleter].
    pub unsafe fn try_from_raw_with_deleter<D>(pointer: *mut T, deleter: D) -> Result<Self>
    where
        D: Deleter<T> + MaybeSend + 'static,
    {
        let pointer = NonNull::new(pointer);
        let record = unsafe { DeleterOwned::allocate(pointer, deleter)? };
        Ok(unsafe { Self::from_parts(pointer, Some(record)) })
    }

    /// Takes ownership of a raw pointer and its deleter, storing the record with `allocator`
    ///
    /// The allocator is kept in the record and is used to release the record's storage once the
    /// last owner has been dropped. If the record can't be allocated then `deleter` is called
    /// with the pointer before the error is returned.
    ///
    /// # Safety
    ///
    /// See [SharedPtr::from_raw_with_deleter].
    pub unsafe fn from_raw_in<D, A>(pointer: *mut T, deleter: D, allocator: A) -> Result<Self>
    where
        D: Deleter<T> + MaybeSend + 'static,
        A: Allocator + MaybeSend + 'static,
    {
        let pointer = NonNull::new(pointer);
        let record = unsafe { AllocatorOwned::allocate(pointer, deleter, allocator)? };
        Ok(unsafe { Self::from_parts(pointer, Some(record)) })
    }

    /// Takes ownership of the object owned by a [UniquePtr], along with its deleter
    ///
    /// A null `UniquePtr` produces an empty `SharedPtr`.
    pub fn from_unique<D>(unique: UniquePtr<T, D>) -> Self
    where
        D: Deleter<T> + MaybeSend + 'static,
    {
        unwrap_or_alloc_error(Self::try_from_unique(unique))
    }

    /// Fallible version of [SharedPtr::from_unique]
    ///
    /// If the record can't be allocated then the object is passed to the deleter before the
    /// error is returned.
    pub fn try_from_unique<D>(unique: UniquePtr<T, D>) -> Result<Self>
    where
        D: Deleter<T> + MaybeSend + 'static,
    {
        match UniquePtr::into_parts(unique) {
            (Some(pointer), deleter) => {
                // SAFETY: ownership of the pointer is transferred from the UniquePtr
                let record = unsafe { DeleterOwned::allocate(Some(pointer), deleter)? };
                Ok(unsafe { Self::from_parts(Some(pointer), Some(record)) })
            }
            (None, _) => Ok(Self::null()),
        }
    }

    /// Takes ownership of the object owned by a [UniquePtr], storing the record with `allocator`
    ///
    /// A null `UniquePtr` produces an empty `SharedPtr` without allocating. If the record can't
    /// be allocated then the object is passed to the deleter before the error is returned.
    pub fn try_from_unique_in<D, A>(unique: UniquePtr<T, D>, allocator: A) -> Result<Self>
    where
        D: Deleter<T> + MaybeSend + 'static,
        A: Allocator + MaybeSend + 'static,
    {
        match UniquePtr::into_parts(unique) {
            (Some(pointer), deleter) => {
                // SAFETY: ownership of the pointer is transferred from the UniquePtr
                let record = unsafe { AllocatorOwned::allocate(Some(pointer), deleter, allocator)? };
                Ok(unsafe { Self::from_parts(Some(pointer), Some(record)) })
            }
            (None, _) => Ok(Self::null()),
        }
    }

    /// Makes a pointer that shares ownership with `owner`, but stores an unrelated pointer
    ///
    /// The new pointer dereferences to `pointer`, while keeping `owner`'s managed object alive.
    /// If `owner` is empty then the result has no record, and doesn't keep anything alive.
    ///
    /// See [SharedPtr::project] for a safe alternative when `pointer` refers to part of the
    /// owner's object.
    ///
    /// # Safety
    ///
    /// A non-null `pointer` must stay valid for reads for as long as `owner`'s managed object
    /// is alive.
    pub unsafe fn alias<U>(owner: &SharedPtr<U>, pointer: *const T) -> Self
    where
        U: ?Sized + MaybeSend + MaybeSync + 'static,
    {
        if let Some(record) = owner.record {
            record.acquire();
        }

        unsafe { Self::from_projection(NonNull::new(pointer.cast_mut()), owner.record) }
    }

    /// Makes a new pointer to a part of this pointer's object, sharing its ownership
    ///
    /// The use count is incremented, and the whole object is kept alive for as long as the
    /// projected pointer exists. An empty pointer projects to an empty pointer.
    ///
    /// Projection can also be used to convert to a trait object.
    ///
    /// The object's type must be `'static`, the projected pointer doesn't carry any of its
    /// lifetimes and can't be allowed to outlive data that the object borrows:
    ///
    /// ```compile_fail
    /// use holder::{SharedPtr, make_shared};
    ///
    /// let owned = String::from("borrowed");
    /// let parent: SharedPtr<&str> = make_shared(owned.as_str());
    /// let escaped: SharedPtr<str> = SharedPtr::map(parent, |s| *s);
    /// drop(owned);
    /// println!("{}", &*escaped);
    /// ```
    ///
    /// # Example
    ///
    /// ```
    /// use holder::{SharedPtr, make_shared};
    ///
    /// struct Point { x: i32, y: i32 }
    ///
    /// let point = make_shared(Point { x: 1, y: 2 });
    /// let y = SharedPtr::project(&point, |point| &point.y);
    /// drop(point);
    ///
    /// assert_eq!(*y, 2);
    /// assert_eq!(SharedPtr::use_count(&y), 1);
    /// ```
    pub fn project<U, F>(this: &Self, f: F) -> SharedPtr<U>
    where
        T: MaybeSend + MaybeSync + 'static,
        U: ?Sized,
        F: FnOnce(&T) -> &U,
    {
        Self::map(this.clone(), f)
    }

    /// Converts the pointer into a pointer to a part of its object, sharing its ownership
    ///
    /// Like [SharedPtr::project], but consumes the pointer, so the use count doesn't change.
    pub fn map<U, F>(this: Self, f: F) -> SharedPtr<U>
    where
        T: MaybeSend + MaybeSync + 'static,
        U: ?Sized,
        F: FnOnce(&T) -> &U,
    {
        let pointer = Self::as_ref(&this).map(|value| NonNull::from(f(value)));
        unsafe { SharedPtr::from_projection(pointer, Self::into_record(this)) }
    }

    /// Makes a new pointer for an optional component of this pointer's object
    ///
    /// If the pointer is empty, or if the closure returns `None`, then the original pointer is
    /// returned as the error.
    pub fn filter_map<U, F>(this: Self, f: F) -> std::result::Result<SharedPtr<U>, Self>
    where
        T: MaybeSend + MaybeSync + 'static,
        U: ?Sized,
        F: FnOnce(&T) -> Option<&U>,
    {
        match Self::as_ref(&this).and_then(f).map(NonNull::from) {
            Some(pointer) => {
                let record = Self::into_record(this);
                Ok(unsafe { SharedPtr::from_projection(Some(pointer), record) })
            }
            None => Err(this),
        }
    }

    /// Returns the stored pointer
    pub fn get(this: &Self) -> Option<NonNull<T>> {
        this.pointer
    }

    /// Returns a reference to the stored object, or `None` if the stored pointer is null
    pub fn as_ref(this: &Self) -> Option<&T> {
        // SAFETY: the stored pointer is valid while the record is alive, and this handle keeps
        // the record alive
        this.pointer.map(|pointer| unsafe { pointer.as_ref() })
    }

    /// Returns a mutable reference to the stored object if this is its only owner
    ///
    /// `None` is returned if the stored pointer is null, if the object is shared, or if the
    /// pointer was made by [SharedPtr::project], [SharedPtr::map], [SharedPtr::filter_map] or
    /// [SharedPtr::alias], which only provide read access to their pointee.
    pub fn get_mut(this: &mut Self) -> Option<&mut T> {
        if !this.projected && Self::unique(this) && Self::weak_count(this) == 0 {
            // SAFETY: no other handle shares the record, so no other references exist
            this.pointer.map(|mut pointer| unsafe { pointer.as_mut() })
        } else {
            None
        }
    }

    /// Returns true if the stored pointer is null
    pub fn is_null(this: &Self) -> bool {
        this.pointer.is_none()
    }

    /// Returns the number of strong references to the pointer's record
    ///
    /// An empty pointer has a use count of 0.
    pub fn use_count(this: &Self) -> usize {
        this.record.map_or(0, RecordRef::strong_count)
    }

    /// Returns the number of weak references to the pointer's record
    pub fn weak_count(this: &Self) -> usize {
        this.record.map_or(0, RecordRef::weak_count)
    }

    /// Returns true if this is the only pointer that owns the record
    pub fn unique(this: &Self) -> bool {
        Self::use_count(this) == 1
    }

    /// Returns how the pointer's record stores the managed object
    pub fn record_kind(this: &Self) -> Option<RecordKind> {
        this.record.map(RecordRef::kind)
    }

    /// Returns the address of the pointer's ownership record
    ///
    /// Pointers with the same owner address belong to the same ownership group.
    pub fn owner_address(this: &Self) -> Option<Address> {
        this.record.map(RecordRef::address)
    }

    /// Returns true if the two pointers store the same address
    ///
    /// See also: [SharedPtr::same_owner]
    pub fn ptr_eq(this: &Self, other: &Self) -> bool {
        this.pointer.map(NonNull::cast::<u8>) == other.pointer.map(NonNull::cast::<u8>)
    }

    /// Returns true if the two pointers share an ownership record
    ///
    /// Empty pointers share ownership with each other.
    pub fn same_owner<U: ?Sized>(this: &Self, other: &SharedPtr<U>) -> bool {
        this.record == other.record
    }

    /// Orders pointers by their ownership records rather than by their stored pointers
    ///
    /// Two aliases of the same object are equivalent in this ordering, even when they store
    /// different pointers. Empty pointers are ordered before all other pointers.
    pub fn owner_before<U: ?Sized>(this: &Self, other: &SharedPtr<U>) -> bool {
        Self::owner_address(this) < SharedPtr::owner_address(other)
    }

    /// Releases this pointer's ownership, leaving it empty
    pub fn reset(this: &mut Self) {
        *this = Self::null();
    }

    /// Releases this pointer's ownership and takes ownership of a raw pointer allocated by [Box]
    ///
    /// # Safety
    ///
    /// See [SharedPtr::from_raw].
    pub unsafe fn reset_raw(this: &mut Self, pointer: *mut T) {
        *this = unsafe { Self::from_raw(pointer) };
    }

    /// Releases this pointer's ownership and takes ownership of a raw pointer and its deleter
    ///
    /// # Safety
    ///
    /// See [SharedPtr::from_raw_with_deleter].
    pub unsafe fn reset_raw_with_deleter<D>(this: &mut Self, pointer: *mut T, deleter: D)
    where
        D: Deleter<T> + MaybeSend + 'static,
    {
        *this = unsafe { Self::from_raw_with_deleter(pointer, deleter) };
    }

    /// Releases this pointer's ownership and takes ownership of a raw pointer and its deleter,
    /// with the record stored using `allocator`
    ///
    /// If an error is returned then this pointer is left unchanged.
    ///
    /// # Safety
    ///
    /// See [SharedPtr::from_raw_with_deleter].
    pub unsafe fn reset_raw_in<D, A>(
        this: &mut Self,
        pointer: *mut T,
        deleter: D,
        allocator: A,
    ) -> Result<()>
    where
        D: Deleter<T> + MaybeSend + 'static,
        A: Allocator + MaybeSend + 'static,
    {
        *this = unsafe { Self::from_raw_in(pointer, deleter, allocator)? };
        Ok(())
    }

    /// Releases this pointer's ownership, then takes ownership of a [UniquePtr]'s object
    ///
    /// If the new record can't be allocated then the object is passed to the `UniquePtr`'s
    /// deleter, and this pointer is left empty.
    pub fn assign_unique<D>(this: &mut Self, unique: UniquePtr<T, D>) -> Result<()>
    where
        D: Deleter<T> + MaybeSend + 'static,
    {
        Self::reset(this);
        *this = Self::try_from_unique(unique)?;
        Ok(())
    }

    /// Swaps the stored pointers and records of two pointers
    pub fn swap(this: &mut Self, other: &mut Self) {
        std::mem::swap(this, other);
    }
}

impl<T: ?Sized> Drop for SharedPtr<T> {
    fn drop(&mut self) {
        if let Some(record) = self.record.take() {
            // SAFETY: the handle owned a strong reference, which is given up here
            unsafe { record.release() };
        }
    }
}

impl<T: ?Sized> Clone for SharedPtr<T> {
    fn clone(&self) -> Self {
        if let Some(record) = self.record {
            record.acquire();
        }

        Self {
            pointer: self.pointer,
            record: self.record,
            projected: self.projected,
            _owns: PhantomData,
        }
    }

    fn clone_from(&mut self, source: &Self) {
        if self.record == source.record {
            // Already in the same ownership group, so the counts stay as they are
            self.pointer = source.pointer;
            self.projected = source.projected;
        } else {
            *self = source.clone();
        }
    }
}

impl<T: ?Sized> Deref for SharedPtr<T> {
    type Target = T;

    fn deref(&self) -> &T {
        match Self::as_ref(self) {
            Some(value) => value,
            None => null_dereference("SharedPtr"),
        }
    }
}

impl<T: ?Sized> Default for SharedPtr<T> {
    fn default() -> Self {
        Self::null()
    }
}

impl<T> From<T> for SharedPtr<T> {
    fn from(value: T) -> Self {
        make_shared(value)
    }
}

impl<T: ?Sized> From<Box<T>> for SharedPtr<T> {
    fn from(boxed: Box<T>) -> Self {
        Self::from_box(boxed)
    }
}

impl<T: ?Sized, D> From<UniquePtr<T, D>> for SharedPtr<T>
where
    D: Deleter<T> + MaybeSend + 'static,
{
    fn from(unique: UniquePtr<T, D>) -> Self {
        Self::from_unique(unique)
    }
}

impl<T> From<Vec<T>> for SharedPtr<[T]> {
    fn from(value: Vec<T>) -> Self {
        Self::from_box(value.into_boxed_slice())
    }
}

impl From<&str> for SharedPtr<str> {
    fn from(value: &str) -> Self {
        Self::from_box(value.into())
    }
}

impl From<String> for SharedPtr<str> {
    fn from(value: String) -> Self {
        Self::from_box(value.into_boxed_str())
    }
}

impl<T: ?Sized + fmt::Debug> fmt::Debug for SharedPtr<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SharedPtr").field(&Self::as_ref(self)).finish()
    }
}

impl<T: ?Sized + fmt::Display> fmt::Display for SharedPtr<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match Self::as_ref(self) {
            Some(value) => value.fmt(f),
            None => f.write_str("null"),
        }
    }
}

impl<T: ?Sized + PartialEq> PartialEq for SharedPtr<T> {
    fn eq(&self, other: &Self) -> bool {
        Self::as_ref(self) == Self::as_ref(other)
    }
}

impl<T: ?Sized + Eq> Eq for SharedPtr<T> {}

impl<T: ?Sized + Hash> Hash for SharedPtr<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        Self::as_ref(self).hash(state)
    }
}

impl<T: ?Sized + Ord> Ord for SharedPtr<T> {
    #[inline]
    fn cmp(&self, other: &Self) -> Ordering {
        Self::as_ref(self).cmp(&Self::as_ref(other))
    }
}

impl<T: ?Sized + PartialOrd> PartialOrd for SharedPtr<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Self::as_ref(self).partial_cmp(&Self::as_ref(other))
    }
}
