//! # Condition Variables
//!
//! A condition is always bound to exactly one [`Mutex`]. Waiting releases
//! that mutex and parks the caller in one step; every return from a wait,
//! whether signalled, broadcast or timed out, hands the mutex back to the
//! caller before it continues.
//!
//! Spurious wake-ups are allowed. Re-check the predicate after every wait:
//!
//! ```rust,ignore
//! let _lock = ScopedLock::on_condition(&condition)?;
//! while !ready.load(Ordering::Acquire) {
//!     condition.wait_for_signal()?;
//! }
//! ```

use std::fmt;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Condvar;

use crate::error::{SyncError, SyncResult};
use crate::mutex::{Mutex, MutexKind, MutexRef};

/// Shared handle to a [`Condition`].
pub type ConditionRef = Arc<Condition>;

/// Condition variable bound to a mutex.
pub struct Condition {
    mutex: MutexRef,
    signal: Condvar,
}

impl Condition {
    /// Creates a condition with a fresh error-checking mutex.
    #[must_use]
    pub fn make() -> ConditionRef {
        Self::make_with(Mutex::make(MutexKind::ErrorCheck))
    }

    /// Creates a condition bound to an existing mutex.
    #[must_use]
    pub fn make_with(mutex: MutexRef) -> ConditionRef {
        Arc::new(Self {
            mutex,
            signal: Condvar::new(),
        })
    }

    /// Returns the bound mutex.
    #[inline]
    #[must_use]
    pub fn mutex(&self) -> &MutexRef {
        &self.mutex
    }

    /// Wakes at most one waiter.
    pub fn signal(&self) {
        self.signal.notify_one();
    }

    /// Wakes every waiter.
    pub fn broadcast(&self) {
        self.signal.notify_all();
    }

    /// Releases the bound mutex, parks until woken, then takes the mutex back.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::WaitFailure`] if the caller does not hold the
    /// bound mutex. In that case nothing is released and the caller does not
    /// block.
    pub fn wait_for_signal(&self) -> SyncResult<()> {
        let me = thread::current().id();
        let mut state = self.mutex.raw_state();
        let depth = self
            .mutex
            .release_all(&mut state, me)
            .map_err(SyncError::WaitFailure)?;
        self.signal.wait(&mut state);
        self.mutex.reacquire(&mut state, me, depth);
        Ok(())
    }

    /// Like [`wait_for_signal`](Self::wait_for_signal), but gives up after
    /// `duration`.
    ///
    /// Returns `false` on timeout and `true` otherwise. The bound mutex is
    /// held again in both cases.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::TimedWaitFailure`] if the caller does not hold
    /// the bound mutex.
    pub fn timed_wait_for_signal(&self, duration: Duration) -> SyncResult<bool> {
        let me = thread::current().id();
        let mut state = self.mutex.raw_state();
        let depth = self
            .mutex
            .release_all(&mut state, me)
            .map_err(SyncError::TimedWaitFailure)?;
        let result = self.signal.wait_for(&mut state, duration);
        self.mutex.reacquire(&mut state, me, depth);
        Ok(!result.timed_out())
    }
}

impl fmt::Debug for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Condition").field("mutex", &self.mutex).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Fault;
    use crate::ScopedLock;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Instant;

    #[test]
    fn test_wait_without_lock_fails() {
        let condition = Condition::make();
        assert_eq!(
            condition.wait_for_signal(),
            Err(SyncError::WaitFailure(Fault::NotLocked))
        );
        assert_eq!(
            condition.timed_wait_for_signal(Duration::from_millis(1)),
            Err(SyncError::TimedWaitFailure(Fault::NotLocked))
        );
    }

    #[test]
    fn test_timed_wait_times_out_with_mutex_held() {
        let condition = Condition::make();
        let _lock = ScopedLock::on_condition(&condition).unwrap();

        let start = Instant::now();
        let woken = condition
            .timed_wait_for_signal(Duration::from_millis(20))
            .unwrap();

        assert!(!woken);
        assert!(start.elapsed() >= Duration::from_millis(20));
        assert!(condition.mutex().is_held_by_current_thread());
    }

    #[test]
    fn test_signal_wakes_waiter_with_mutex_held() {
        let condition = Condition::make();
        let ready = Arc::new(AtomicBool::new(false));

        let waiter = {
            let condition = Arc::clone(&condition);
            let ready = Arc::clone(&ready);
            thread::spawn(move || {
                let _lock = ScopedLock::on_condition(&condition).unwrap();
                while !ready.load(Ordering::Acquire) {
                    condition.wait_for_signal().unwrap();
                }
                condition.mutex().is_held_by_current_thread()
            })
        };

        thread::sleep(Duration::from_millis(10));
        {
            let _lock = ScopedLock::on_condition(&condition).unwrap();
            ready.store(true, Ordering::Release);
            condition.signal();
        }

        assert!(waiter.join().unwrap());
        assert!(!condition.mutex().is_locked());
    }

    #[test]
    fn test_wait_restores_recursive_depth() {
        let condition = Condition::make_with(Mutex::make(MutexKind::Recursive));
        let mutex = Arc::clone(condition.mutex());
        mutex.lock().unwrap();
        mutex.lock().unwrap();

        assert!(!condition
            .timed_wait_for_signal(Duration::from_millis(5))
            .unwrap());

        mutex.unlock().unwrap();
        assert!(mutex.is_held_by_current_thread());
        mutex.unlock().unwrap();
        assert!(!mutex.is_locked());
    }
}
