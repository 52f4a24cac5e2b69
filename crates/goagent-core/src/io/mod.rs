//! Filesystem primitives for the pidfile
//!
//! - **Atomic replace**: write to a sibling temp file, then `rename` over the
//!   target, so readers never see a torn pid
//! - **File locking**: advisory `flock` with exponential backoff, used by the
//!   exclusive launch mode

pub mod atomic;
pub mod error;
pub mod lock;

pub use atomic::atomic_replace;
pub use error::PidFileError;
pub use lock::{FileLock, acquire_lock};
