//! Owning pointers with deterministic destruction
//!
//! Two pointer types are provided:
//!
//! - [UniquePtr], a pointer with a single owner that destroys its object with a [Deleter].
//! - [SharedPtr], a reference-counted pointer whose object is destroyed when the last owner is
//!   dropped.
//!
//! Each group of `SharedPtr`s that share an object also share an ownership record, which holds
//! the reference counts along with everything needed to destroy the object. The record's concrete
//! type depends on how the object was provided:
//!
//! - [make_shared] and [allocate_shared] store the record and the object in one allocation.
//! - [SharedPtr::from_raw_with_deleter] and [SharedPtr::from_unique] keep the object in its own
//!   allocation, with the deleter stored in the record.
//! - [SharedPtr::from_raw_in] additionally stores the record using a caller-provided
//!   [Allocator].
//!
//! Handles only see a type-erased header, so pointers with different element types can share a
//! record (see [SharedPtr::project] and [SharedPtr::alias]).
//!
//! Only the ownership bookkeeping is safe to use concurrently, the pointed-to object needs its own
//! synchronization if it's mutated from multiple threads.

#![warn(missing_docs)]

#[cfg(all(feature = "atomic", feature = "local"))]
compile_error!("A single reference counting feature can be enabled at a time");

#[cfg(not(any(feature = "atomic", feature = "local")))]
compile_error!("Either the `atomic` or the `local` feature needs to be enabled");

mod address;
mod allocator;
mod count_impl;
mod deleter;
mod error;
mod make;
mod record;
mod shared;
mod unique;

pub use crate::{
    address::Address,
    allocator::{AllocationCounter, AllocationSink, Allocator, Global, Tracked},
    count_impl::{MaybeSend, MaybeSync},
    deleter::{DefaultDelete, Deleter},
    error::{AllocError, Error, Result},
    make::{
        allocate_shared, allocate_shared_with, make_shared, make_shared_with, make_unique,
        try_make_shared,
    },
    record::RecordKind,
    shared::SharedPtr,
    unique::UniquePtr,
};
