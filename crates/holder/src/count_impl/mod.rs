#[cfg(feature = "atomic")]
mod atomic;
#[cfg(feature = "atomic")]
pub(crate) use atomic::RefCount;
#[cfg(feature = "atomic")]
pub use atomic::{MaybeSend, MaybeSync};

#[cfg(feature = "local")]
mod local;
#[cfg(feature = "local")]
pub(crate) use local::RefCount;
#[cfg(feature = "local")]
pub use local::{MaybeSend, MaybeSync};
