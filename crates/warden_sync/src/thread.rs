//! # Threads of Control
//!
//! A [`ThreadOfControl`] wraps a [`Task`] and runs it on a new system thread
//! with an explicit lifecycle:
//!
//! ```text
//! Idle ──start()──> Started ──(body begins)──> Running ──(body returns)──> Finished
//! ```
//!
//! `start` does not return until the new thread is inside its body, and the
//! thread announces `Finished` before it exits, waking anyone blocked in
//! [`ThreadOfControl::wait_to_finish`]. Both hand-offs go through one
//! [`Condition`].
//!
//! Cancellation is cooperative: [`ThreadOfControl::cancel`] raises a flag and
//! broadcasts on the lifecycle condition. The body notices it through the
//! [`Control`] handle, either by polling or by sleeping in
//! [`Control::wait_for`], which returns early.

use std::any::Any;
use std::fmt;
use std::io;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle, ThreadId};
use std::time::{Duration, Instant};

use crate::condition::{Condition, ConditionRef};
use crate::error::{Fault, SyncError, SyncResult};
use crate::locker::ScopedLock;

/// Unit of work executed on a [`ThreadOfControl`].
///
/// Closures taking `&Control` implement it directly.
pub trait Task: Send + 'static {
    /// Runs on the spawned thread. Check `control` for cancellation at
    /// points where stopping is safe.
    fn run(&mut self, control: &Control);
}

impl<F> Task for F
where
    F: FnMut(&Control) + Send + 'static,
{
    fn run(&mut self, control: &Control) {
        self(control);
    }
}

/// Lifecycle state of a [`ThreadOfControl`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum ThreadState {
    /// Constructed; no system thread yet.
    Idle = 0,
    /// System thread created; body not entered yet.
    Started = 1,
    /// Body is executing.
    Running = 2,
    /// Body has returned (or unwound).
    Finished = 3,
}

impl From<u8> for ThreadState {
    fn from(v: u8) -> Self {
        match v {
            0 => Self::Idle,
            1 => Self::Started,
            2 => Self::Running,
            _ => Self::Finished,
        }
    }
}

/// State shared between the handle and the spawned thread. The flags are
/// only written while the condition's mutex is held.
struct Lifecycle {
    condition: ConditionRef,
    state: AtomicU8,
    cancelled: AtomicBool,
}

impl Lifecycle {
    fn state(&self) -> ThreadState {
        ThreadState::from(self.state.load(Ordering::Acquire))
    }

    fn announce(&self, state: ThreadState) {
        match ScopedLock::on_condition(&self.condition) {
            Ok(_lock) => {
                self.state.store(state as u8, Ordering::Release);
                self.condition.broadcast();
            }
            Err(err) => {
                tracing::error!(error = %err, ?state, "failed to announce thread state");
            }
        }
    }
}

/// Announces `Finished` when dropped, so waiters are released even if the
/// body unwinds.
struct FinishAnnouncer(Arc<Lifecycle>);

impl Drop for FinishAnnouncer {
    fn drop(&mut self) {
        self.0.announce(ThreadState::Finished);
    }
}

/// Handle given to a running [`Task`].
pub struct Control {
    lifecycle: Arc<Lifecycle>,
}

impl Control {
    /// Returns true once cancellation has been requested.
    #[inline]
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.lifecycle.cancelled.load(Ordering::Acquire)
    }

    /// Sleeps for `duration` unless cancelled first.
    ///
    /// Returns `true` if the full duration elapsed and `false` if the wait
    /// was cut short by cancellation. A duration too long to form a deadline
    /// waits for cancellation alone.
    ///
    /// # Errors
    ///
    /// Propagates lock and wait failures from the lifecycle condition.
    pub fn wait_for(&self, duration: Duration) -> SyncResult<bool> {
        // No representable deadline: only cancellation ends the wait.
        let deadline = Instant::now().checked_add(duration);
        let condition = &self.lifecycle.condition;
        let _lock = ScopedLock::on_condition(condition)?;
        loop {
            if self.is_cancelled() {
                return Ok(false);
            }
            match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Ok(true);
                    }
                    condition.timed_wait_for_signal(deadline - now)?;
                }
                None => condition.wait_for_signal()?,
            }
        }
    }
}

enum HandleState {
    Unstarted,
    Joinable(JoinHandle<()>),
    Joined,
    Detached,
}

/// A task plus the system thread that runs it.
///
/// Dropping a handle whose thread is still running detaches the thread and
/// logs a warning; join or detach explicitly to avoid it.
pub struct ThreadOfControl {
    name: Option<String>,
    task: Arc<parking_lot::Mutex<Option<Box<dyn Task>>>>,
    tid: parking_lot::Mutex<ThreadId>,
    lifecycle: Arc<Lifecycle>,
    handle: parking_lot::Mutex<HandleState>,
}

impl ThreadOfControl {
    /// Wraps `task`. Until [`start`](Self::start) is called the instance
    /// represents the creating thread.
    pub fn new(task: impl Task) -> Self {
        Self::build(None, Box::new(task))
    }

    /// Like [`new`](Self::new), but names the system thread.
    pub fn named(name: impl Into<String>, task: impl Task) -> Self {
        Self::build(Some(name.into()), Box::new(task))
    }

    fn build(name: Option<String>, task: Box<dyn Task>) -> Self {
        Self {
            name,
            task: Arc::new(parking_lot::Mutex::new(Some(task))),
            tid: parking_lot::Mutex::new(thread::current().id()),
            lifecycle: Arc::new(Lifecycle {
                condition: Condition::make(),
                state: AtomicU8::new(ThreadState::Idle as u8),
                cancelled: AtomicBool::new(false),
            }),
            handle: parking_lot::Mutex::new(HandleState::Unstarted),
        }
    }

    /// Pauses the calling thread.
    pub fn sleep(duration: Duration) {
        thread::sleep(duration);
    }

    /// Returns the id of the calling thread.
    #[must_use]
    pub fn current() -> ThreadId {
        thread::current().id()
    }

    /// Spawns the system thread and blocks until the task has begun running.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::CreateFailure`] if the instance was already
    /// started or the system refuses to create a thread. After a refused
    /// spawn the instance is still idle and `start` may be retried.
    pub fn start(&self) -> SyncResult<()> {
        self.start_with(|builder, body| builder.spawn(body))
    }

    fn start_with<S>(&self, spawn: S) -> SyncResult<()>
    where
        S: FnOnce(thread::Builder, Box<dyn FnOnce() + Send>) -> io::Result<JoinHandle<()>>,
    {
        let condition = &self.lifecycle.condition;
        let _lock = ScopedLock::on_condition(condition)?;
        if self.lifecycle.state() != ThreadState::Idle {
            return Err(SyncError::CreateFailure(Fault::AlreadyStarted));
        }

        // The task stays in its slot until the new thread takes it, so a
        // refused spawn leaves it in place.
        let slot = Arc::clone(&self.task);
        let lifecycle = Arc::clone(&self.lifecycle);
        let body: Box<dyn FnOnce() + Send> = Box::new(move || {
            let _finished = FinishAnnouncer(Arc::clone(&lifecycle));
            let Some(mut task) = slot.lock().take() else {
                return;
            };
            lifecycle.announce(ThreadState::Running);
            let control = Control { lifecycle };
            task.run(&control);
        });

        let mut builder = thread::Builder::new();
        if let Some(name) = &self.name {
            builder = builder.name(name.clone());
        }
        let handle = spawn(builder, body)
            .map_err(|err| SyncError::CreateFailure(Fault::Spawn(err.to_string())))?;

        *self.tid.lock() = handle.thread().id();
        *self.handle.lock() = HandleState::Joinable(handle);
        self.lifecycle
            .state
            .store(ThreadState::Started as u8, Ordering::Release);

        // The child cannot announce until we release the mutex in the wait.
        while self.lifecycle.state() < ThreadState::Running {
            condition.wait_for_signal()?;
        }

        tracing::debug!(name = ?self.name, "thread of control started");
        Ok(())
    }

    /// Blocks until the task body has returned. Returns at once if the
    /// thread was never started.
    ///
    /// # Errors
    ///
    /// Propagates lock and wait failures from the lifecycle condition.
    pub fn wait_to_finish(&self) -> SyncResult<()> {
        let condition = &self.lifecycle.condition;
        let _lock = ScopedLock::on_condition(condition)?;
        while matches!(
            self.lifecycle.state(),
            ThreadState::Started | ThreadState::Running
        ) {
            condition.wait_for_signal()?;
        }
        Ok(())
    }

    /// Blocks until the system thread has terminated and reclaims it.
    ///
    /// Returns `Ok(false)` if there is nothing to join: never started,
    /// already joined, or detached.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::JoinFailure`] when called from the thread itself
    /// or when the task body panicked.
    pub fn join(&self) -> SyncResult<bool> {
        if self.is_active() && self.state() != ThreadState::Idle {
            return Err(SyncError::JoinFailure(Fault::WouldDeadlock));
        }

        let handle = {
            let mut slot = self.handle.lock();
            match std::mem::replace(&mut *slot, HandleState::Joined) {
                HandleState::Joinable(handle) => handle,
                other => {
                    *slot = other;
                    return Ok(false);
                }
            }
        };

        handle
            .join()
            .map_err(|payload| SyncError::JoinFailure(Fault::Panicked(panic_message(&*payload))))?;
        Ok(true)
    }

    /// Lets the system thread clean up after itself. Later joins return
    /// `Ok(false)`.
    ///
    /// Returns `false` if there was no joinable thread.
    pub fn detach(&self) -> bool {
        let mut slot = self.handle.lock();
        if matches!(*slot, HandleState::Joinable(_)) {
            // Dropping a JoinHandle detaches the thread.
            *slot = HandleState::Detached;
            true
        } else {
            false
        }
    }

    /// Requests cooperative cancellation. Cancelling a finished thread is
    /// not an error.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::CancelFailure`] with [`Fault::NotStarted`] if the
    /// thread was never started: no body exists yet to observe the request.
    /// Propagates lock failures on the lifecycle condition.
    pub fn cancel(&self) -> SyncResult<()> {
        if self.state() == ThreadState::Idle {
            return Err(SyncError::CancelFailure(Fault::NotStarted));
        }
        let condition = &self.lifecycle.condition;
        let _lock = ScopedLock::on_condition(condition)?;
        self.lifecycle.cancelled.store(true, Ordering::Release);
        condition.broadcast();
        Ok(())
    }

    /// Returns true while the task body is executing.
    ///
    /// Not synchronized with the lifecycle condition; fine for polling.
    #[inline]
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.lifecycle.state.load(Ordering::Relaxed) == ThreadState::Running as u8
    }

    /// Returns true if cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.lifecycle.cancelled.load(Ordering::Acquire)
    }

    /// Returns the current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ThreadState {
        self.lifecycle.state()
    }

    /// Returns true if the calling thread is the one this instance
    /// represents.
    #[must_use]
    pub fn is_active(&self) -> bool {
        thread::current().id() == *self.tid.lock()
    }

    /// Returns the id of the represented thread.
    #[must_use]
    pub fn thread_id(&self) -> ThreadId {
        *self.tid.lock()
    }

    /// Returns the thread name, if one was given.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

impl PartialEq for ThreadOfControl {
    fn eq(&self, other: &Self) -> bool {
        self.thread_id() == other.thread_id()
    }
}

impl Eq for ThreadOfControl {}

impl fmt::Debug for ThreadOfControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThreadOfControl")
            .field("name", &self.name)
            .field("tid", &self.thread_id())
            .field("state", &self.state())
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

impl Drop for ThreadOfControl {
    fn drop(&mut self) {
        let joinable = matches!(self.handle.get_mut(), HandleState::Joinable(_));
        if joinable && self.lifecycle.state() != ThreadState::Finished {
            tracing::warn!(name = ?self.name, "dropping a running thread of control; detaching it");
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
