//! # Error-Checking Mutex
//!
//! A mutual-exclusion lock that records which thread owns it. Unlike a
//! guard-based lock, `lock` and `unlock` are separate calls, so ownership is
//! checked at runtime: releasing a lock the caller does not hold, or
//! re-acquiring one it already holds, is reported instead of corrupting state.
//!
//! ## Layout
//!
//! ```text
//! Mutex
//!  ├── state: parking_lot::Mutex<LockState>   (owner thread + depth)
//!  └── released: Condvar                       (lock waiters park here)
//! ```
//!
//! The inner `parking_lot` lock is only held for the few instructions it
//! takes to inspect or update the owner record. Threads that find the mutex
//! owned park on `released` until the owner lets go.

use std::fmt;
use std::sync::Arc;
use std::thread::{self, ThreadId};

use parking_lot::{Condvar, MutexGuard};

use crate::error::{Fault, SyncError, SyncResult};

/// Shared handle to a [`Mutex`]. The mutex lives as long as any holder.
pub type MutexRef = Arc<Mutex>;

/// Behaviour of a mutex when the owning thread locks it again.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum MutexKind {
    /// Relocking from the owner fails; `try_lock` from the owner reports
    /// plain contention.
    Normal,
    /// The owner may lock again; each lock needs a matching unlock.
    Recursive,
    /// Relocking or `try_lock` from the owner is reported as a deadlock.
    #[default]
    ErrorCheck,
}

/// Owner record kept behind the inner lock.
#[derive(Debug, Default)]
pub(crate) struct LockState {
    owner: Option<ThreadId>,
    depth: usize,
}

/// Mutual-exclusion lock with owner tracking.
///
/// Prefer [`ScopedLock`](crate::ScopedLock) over calling `lock`/`unlock`
/// directly; it releases the mutex on every exit path.
pub struct Mutex {
    kind: MutexKind,
    state: parking_lot::Mutex<LockState>,
    released: Condvar,
}

impl Mutex {
    /// Creates an unlocked mutex of the given kind.
    #[must_use]
    pub fn new(kind: MutexKind) -> Self {
        Self {
            kind,
            state: parking_lot::Mutex::new(LockState::default()),
            released: Condvar::new(),
        }
    }

    /// Creates a shared mutex of the given kind.
    #[must_use]
    pub fn make(kind: MutexKind) -> MutexRef {
        Arc::new(Self::new(kind))
    }

    /// Returns the kind this mutex was created with.
    #[inline]
    #[must_use]
    pub const fn kind(&self) -> MutexKind {
        self.kind
    }

    /// Blocks until the calling thread owns the mutex.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::LockFailure`] with [`Fault::WouldDeadlock`] if the
    /// caller already owns a non-recursive mutex.
    pub fn lock(&self) -> SyncResult<()> {
        let me = thread::current().id();
        let mut state = self.state.lock();
        self.acquire(&mut state, me)
    }

    /// Attempts to take the mutex without blocking.
    ///
    /// Returns `Ok(false)` when another thread holds it.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::LockFailure`] if the caller already owns an
    /// error-checking mutex.
    pub fn try_lock(&self) -> SyncResult<bool> {
        let me = thread::current().id();
        let mut state = self.state.lock();
        match state.owner {
            None => {
                state.owner = Some(me);
                state.depth = 1;
                Ok(true)
            }
            Some(owner) if owner == me => match self.kind {
                MutexKind::Recursive => {
                    state.depth += 1;
                    Ok(true)
                }
                MutexKind::ErrorCheck => Err(SyncError::LockFailure(Fault::WouldDeadlock)),
                MutexKind::Normal => Ok(false),
            },
            Some(_) => Ok(false),
        }
    }

    /// Releases one level of ownership.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::UnlockFailure`] if the mutex is not locked or is
    /// owned by another thread.
    pub fn unlock(&self) -> SyncResult<()> {
        let me = thread::current().id();
        let mut state = self.state.lock();
        match state.owner {
            None => Err(SyncError::UnlockFailure(Fault::NotLocked)),
            Some(owner) if owner != me => Err(SyncError::UnlockFailure(Fault::NotOwner)),
            Some(_) => {
                state.depth -= 1;
                if state.depth == 0 {
                    state.owner = None;
                    drop(state);
                    self.released.notify_one();
                }
                Ok(())
            }
        }
    }

    /// Returns true if any thread currently owns the mutex.
    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.state.lock().owner.is_some()
    }

    /// Returns true if the calling thread owns the mutex.
    #[must_use]
    pub fn is_held_by_current_thread(&self) -> bool {
        self.state.lock().owner == Some(thread::current().id())
    }

    /// Locks the owner record. Used by [`Condition`](crate::Condition) so the
    /// release-and-park sequence is atomic.
    pub(crate) fn raw_state(&self) -> MutexGuard<'_, LockState> {
        self.state.lock()
    }

    fn acquire(&self, state: &mut MutexGuard<'_, LockState>, me: ThreadId) -> SyncResult<()> {
        if state.owner == Some(me) {
            return match self.kind {
                MutexKind::Recursive => {
                    state.depth += 1;
                    Ok(())
                }
                MutexKind::Normal | MutexKind::ErrorCheck => {
                    Err(SyncError::LockFailure(Fault::WouldDeadlock))
                }
            };
        }
        while state.owner.is_some() {
            self.released.wait(state);
        }
        state.owner = Some(me);
        state.depth = 1;
        Ok(())
    }

    /// Gives up every level of ownership held by `me` and returns the depth
    /// so it can be restored after a condition wait.
    pub(crate) fn release_all(
        &self,
        state: &mut MutexGuard<'_, LockState>,
        me: ThreadId,
    ) -> Result<usize, Fault> {
        match state.owner {
            None => Err(Fault::NotLocked),
            Some(owner) if owner != me => Err(Fault::NotOwner),
            Some(_) => {
                let depth = state.depth;
                state.owner = None;
                state.depth = 0;
                self.released.notify_one();
                Ok(depth)
            }
        }
    }

    /// Blocks until `me` owns the mutex again at the saved depth.
    pub(crate) fn reacquire(&self, state: &mut MutexGuard<'_, LockState>, me: ThreadId, depth: usize) {
        while state.owner.is_some() {
            self.released.wait(state);
        }
        state.owner = Some(me);
        state.depth = depth;
    }
}

impl Default for Mutex {
    fn default() -> Self {
        Self::new(MutexKind::default())
    }
}

impl PartialEq for Mutex {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self, other)
    }
}

impl Eq for Mutex {}

impl fmt::Debug for Mutex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("Mutex")
            .field("kind", &self.kind)
            .field("owner", &state.owner)
            .field("depth", &state.depth)
            .finish()
    }
}
