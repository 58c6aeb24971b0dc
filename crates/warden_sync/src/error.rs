//! # Threading Error Types
//!
//! Every failure a synchronization primitive or thread can report. Failures
//! are returned to the immediate caller and never retried.

use thiserror::Error;

/// Underlying cause of a [`SyncError`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Fault {
    /// The calling thread would block on a lock it already holds.
    #[error("operation would deadlock the calling thread")]
    WouldDeadlock,

    /// The lock is held, but by a different thread.
    #[error("calling thread does not own the lock")]
    NotOwner,

    /// The lock is not held by anyone.
    #[error("lock is not held")]
    NotLocked,

    /// `start` was already called on this thread of control.
    #[error("thread was already started")]
    AlreadyStarted,

    /// The thread of control was never started.
    #[error("thread was never started")]
    NotStarted,

    /// The system refused to create a new thread.
    #[error("system thread could not be created: {0}")]
    Spawn(String),

    /// The thread body unwound instead of returning.
    #[error("thread body panicked: {0}")]
    Panicked(String),
}

/// Errors reported by the threading runtime.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    /// Acquiring a mutex failed.
    #[error("Mutex::lock failed: {0}")]
    LockFailure(Fault),

    /// Releasing a mutex failed.
    #[error("Mutex::unlock failed: {0}")]
    UnlockFailure(Fault),

    /// Waiting on a condition failed.
    #[error("Condition::wait_for_signal failed: {0}")]
    WaitFailure(Fault),

    /// Waiting on a condition with a timeout failed.
    #[error("Condition::timed_wait_for_signal failed: {0}")]
    TimedWaitFailure(Fault),

    /// Creating the system thread failed.
    #[error("ThreadOfControl::start failed: {0}")]
    CreateFailure(Fault),

    /// Joining the system thread failed.
    #[error("ThreadOfControl::join failed: {0}")]
    JoinFailure(Fault),

    /// Requesting cancellation failed.
    #[error("ThreadOfControl::cancel failed: {0}")]
    CancelFailure(Fault),
}

impl SyncError {
    /// Returns the underlying cause.
    #[must_use]
    pub fn fault(&self) -> &Fault {
        match self {
            Self::LockFailure(fault)
            | Self::UnlockFailure(fault)
            | Self::WaitFailure(fault)
            | Self::TimedWaitFailure(fault)
            | Self::CreateFailure(fault)
            | Self::JoinFailure(fault)
            | Self::CancelFailure(fault) => fault,
        }
    }
}

/// Result type for threading operations.
pub type SyncResult<T> = Result<T, SyncError>;
