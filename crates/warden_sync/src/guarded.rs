//! # Guarded State
//!
//! Pairs a value with its own error-checking [`Mutex`] so the value can only
//! be reached through a live [`ScopedLock`].
//!
//! ## Safety Note
//!
//! This module needs unsafe code to hand out references to the value while
//! the runtime mutex, not the borrow checker, provides exclusion.

#![allow(unsafe_code)]

use std::cell::UnsafeCell;
use std::fmt;
use std::ops::{Deref, DerefMut};

use crate::error::SyncResult;
use crate::locker::ScopedLock;
use crate::mutex::{Mutex, MutexKind};

/// A value reachable only while its mutex is held.
pub struct Guarded<T> {
    mutex: Mutex,
    value: UnsafeCell<T>,
}

// SAFETY: the value is only reachable through `GuardedRef`, which exists only
// while the error-checking mutex is held by the current thread. The mutex
// cannot be re-entered, so at most one `GuardedRef` exists at a time.
unsafe impl<T: Send> Send for Guarded<T> {}
// SAFETY: see above.
unsafe impl<T: Send> Sync for Guarded<T> {}

impl<T> Guarded<T> {
    /// Wraps `value` behind a fresh error-checking mutex.
    pub fn new(value: T) -> Self {
        Self {
            mutex: Mutex::new(MutexKind::ErrorCheck),
            value: UnsafeCell::new(value),
        }
    }

    /// Blocks until the value is exclusively available.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::LockFailure`](crate::SyncError::LockFailure) if
    /// the calling thread already holds a guard for this value.
    pub fn lock(&self) -> SyncResult<GuardedRef<'_, T>> {
        let lock = ScopedLock::new(&self.mutex)?;
        Ok(GuardedRef {
            _lock: lock,
            value: &self.value,
        })
    }

    /// Returns true if some thread currently holds the value.
    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.mutex.is_locked()
    }

    /// Mutable access without locking; the exclusive borrow proves no guard
    /// is alive.
    pub fn get_mut(&mut self) -> &mut T {
        self.value.get_mut()
    }

    /// Consumes the wrapper and returns the value.
    pub fn into_inner(self) -> T {
        self.value.into_inner()
    }
}

impl<T: Default> Default for Guarded<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T> fmt::Debug for Guarded<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Guarded")
            .field("locked", &self.mutex.is_locked())
            .finish_non_exhaustive()
    }
}

/// Exclusive access to a [`Guarded`] value. Releases the mutex on drop.
#[must_use = "the value is released as soon as the guard is dropped"]
pub struct GuardedRef<'a, T> {
    _lock: ScopedLock<'a>,
    value: &'a UnsafeCell<T>,
}

impl<T> Deref for GuardedRef<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // SAFETY: the mutex is held for as long as `self` lives.
        unsafe { &*self.value.get() }
    }
}

impl<T> DerefMut for GuardedRef<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY: the mutex is held for as long as `self` lives, and `&mut
        // self` rules out other borrows through this guard.
        unsafe { &mut *self.value.get() }
    }
}
