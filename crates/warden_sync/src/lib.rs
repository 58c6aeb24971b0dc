//! # WARDEN Sync
//!
//! Threading runtime with checked ownership:
//! - [`Mutex`] records its owner, so a wrong-thread unlock or a self-deadlock
//!   is an error rather than undefined behaviour
//! - [`Condition`] is bound to one mutex and always hands it back on return
//! - [`ScopedLock`] and [`ProcessGuard`] release on every exit path
//! - [`ThreadOfControl`] runs a [`Task`] with an explicit
//!   `Idle -> Started -> Running -> Finished` lifecycle
//!
//! ## Example
//!
//! ```rust,ignore
//! use warden_sync::{Control, ThreadOfControl};
//!
//! let worker = ThreadOfControl::named("worker", |control: &Control| {
//!     while control.wait_for(Duration::from_secs(1))? {
//!         // periodic work
//!     }
//! });
//! worker.start()?;   // returns once the body is running
//! worker.cancel()?;  // wakes the timed wait early
//! worker.join()?;
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod condition;
pub mod error;
pub mod guarded;
pub mod locker;
pub mod mutex;
pub mod thread;

pub use condition::{Condition, ConditionRef};
pub use error::{Fault, SyncError, SyncResult};
pub use guarded::{Guarded, GuardedRef};
pub use locker::{ProcessGuard, ScopedLock};
pub use mutex::{Mutex, MutexKind, MutexRef};
pub use thread::{Control, Task, ThreadOfControl, ThreadState};
