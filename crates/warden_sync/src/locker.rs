//! # Scoped Locks
//!
//! [`ScopedLock`] acquires a mutex when it is created and releases it when
//! it goes out of scope, on every exit path including `?` and unwinding.
//! [`ProcessGuard`] is the same thing over one process-wide mutex.
//!
//! ```rust,ignore
//! {
//!     let _sentry = ProcessGuard::enter()?;
//!     // one thread at a time in here
//! }
//! ```

use std::marker::PhantomData;
use std::sync::OnceLock;

use crate::condition::Condition;
use crate::error::SyncResult;
use crate::mutex::{Mutex, MutexKind};

/// Holds a mutex for the lifetime of a lexical scope.
///
/// The guard borrows the mutex and is neither `Send` nor `Clone`: it must be
/// dropped on the thread that created it, in nesting order.
#[must_use = "the mutex is released as soon as the lock is dropped"]
pub struct ScopedLock<'a> {
    mutex: &'a Mutex,
    _not_send: PhantomData<*const ()>,
}

impl<'a> ScopedLock<'a> {
    /// Blocks until `mutex` is held by the calling thread.
    ///
    /// # Errors
    ///
    /// Propagates [`SyncError::LockFailure`](crate::SyncError::LockFailure)
    /// from [`Mutex::lock`].
    pub fn new(mutex: &'a Mutex) -> SyncResult<Self> {
        mutex.lock()?;
        Ok(Self {
            mutex,
            _not_send: PhantomData,
        })
    }

    /// Locks the mutex bound to `condition`.
    ///
    /// # Errors
    ///
    /// Propagates [`SyncError::LockFailure`](crate::SyncError::LockFailure)
    /// from [`Mutex::lock`].
    pub fn on_condition(condition: &'a Condition) -> SyncResult<Self> {
        Self::new(condition.mutex())
    }

    /// Returns the held mutex.
    #[inline]
    #[must_use]
    pub fn mutex(&self) -> &Mutex {
        self.mutex
    }
}

impl Drop for ScopedLock<'_> {
    fn drop(&mut self) {
        if let Err(err) = self.mutex.unlock() {
            tracing::error!(error = %err, "scoped lock could not release its mutex");
        }
    }
}

static PROCESS_MUTEX: OnceLock<Mutex> = OnceLock::new();

/// Serializes one process-wide critical section.
///
/// Every guard shares the same error-checking mutex, created on first use no
/// matter how many threads race to enter. Entering again from a thread that
/// already holds a guard is reported as a deadlock.
#[must_use = "the critical section ends as soon as the guard is dropped"]
pub struct ProcessGuard {
    _lock: ScopedLock<'static>,
}

impl ProcessGuard {
    /// Enters the process-wide critical section, blocking until it is free.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::LockFailure`](crate::SyncError::LockFailure) if
    /// the calling thread is already inside.
    pub fn enter() -> SyncResult<Self> {
        Ok(Self {
            _lock: ScopedLock::new(Self::mutex())?,
        })
    }

    /// Returns the process-wide mutex, creating it on first use.
    #[must_use]
    pub fn mutex() -> &'static Mutex {
        PROCESS_MUTEX.get_or_init(|| Mutex::new(MutexKind::ErrorCheck))
    }
}
