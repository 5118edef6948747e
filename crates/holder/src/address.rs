use std::{
    fmt,
    hash::{Hash, Hasher},
};

/// A wrapper for comparing, ordering, and hashing pointer addresses
///
/// Used to identify ownership records, see [SharedPtr::owner_address](crate::SharedPtr).
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct Address(*const u8);

impl<T: ?Sized> From<*const T> for Address {
    fn from(pointer: *const T) -> Self {
        Self(pointer as *const u8)
    }
}

impl<T: ?Sized> From<*mut T> for Address {
    fn from(pointer: *mut T) -> Self {
        Self(pointer as *const u8)
    }
}

impl Address {
    /// Returns the address as an integer
    pub fn as_usize(self) -> usize {
        self.0 as usize
    }
}

impl Hash for Address {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_usize(self.as_usize());
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.0)
    }
}
