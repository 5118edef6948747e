use std::alloc::Layout;
use thiserror::Error;

/// The errors that can occur while constructing an owning pointer
#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum Error {
    /// Storage for an ownership record (or a colocated record and value) couldn't be allocated
    #[error(
        "Failed to allocate {} bytes (alignment {}) for an ownership record",
        .layout.size(),
        .layout.align()
    )]
    AllocationFailed {
        /// The layout that was requested from the allocator
        layout: Layout,
    },
    /// The combined size of a record and its colocated value can't be described by a `Layout`
    #[error("The size of the colocated record and value overflows the maximum allocation size")]
    LayoutOverflow,
}

/// The error returned by an [Allocator](crate::Allocator) when it can't satisfy a request
#[derive(Error, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[error("Memory allocation failed")]
pub struct AllocError;

/// The result type used by fallible constructors
pub type Result<T> = std::result::Result<T, Error>;

/// Unwraps the result of a fallible constructor, treating errors as fatal
///
/// Allocation failures are passed to [std::alloc::handle_alloc_error].
pub(crate) fn unwrap_or_alloc_error<T>(result: Result<T>) -> T {
    match result {
        Ok(value) => value,
        Err(Error::AllocationFailed { layout }) => std::alloc::handle_alloc_error(layout),
        Err(error) => panic!("{error}"),
    }
}
