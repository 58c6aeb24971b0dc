//! Integration tests for the threading runtime.
//!
//! Run with: cargo test --package warden_sync --test threading_test

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use warden_sync::{
    Condition, ConditionRef, Control, Guarded, ScopedLock, Task, ThreadOfControl, ThreadState,
};

/// Bounded queue built from the raw primitives.
struct Mailbox {
    condition: ConditionRef,
    items: Guarded<VecDeque<u32>>,
    closed: AtomicBool,
}

impl Mailbox {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            condition: Condition::make(),
            items: Guarded::new(VecDeque::new()),
            closed: AtomicBool::new(false),
        })
    }

    fn push(&self, value: u32) {
        let _lock = ScopedLock::on_condition(&self.condition).unwrap();
        self.items.lock().unwrap().push_back(value);
        self.condition.signal();
    }

    fn close(&self) {
        let _lock = ScopedLock::on_condition(&self.condition).unwrap();
        self.closed.store(true, Ordering::Release);
        self.condition.broadcast();
    }

    fn pop(&self) -> Option<u32> {
        let _lock = ScopedLock::on_condition(&self.condition).unwrap();
        loop {
            if let Some(value) = self.items.lock().unwrap().pop_front() {
                return Some(value);
            }
            if self.closed.load(Ordering::Acquire) {
                return None;
            }
            self.condition.wait_for_signal().unwrap();
            assert!(self.condition.mutex().is_held_by_current_thread());
        }
    }
}

struct Consumer {
    mailbox: Arc<Mailbox>,
    total: Arc<AtomicUsize>,
}

impl Task for Consumer {
    fn run(&mut self, _control: &Control) {
        while let Some(value) = self.mailbox.pop() {
            self.total.fetch_add(value as usize, Ordering::SeqCst);
        }
    }
}

#[test]
fn test_producer_consumers_over_condition() {
    let mailbox = Mailbox::new();
    let total = Arc::new(AtomicUsize::new(0));

    let consumers: Vec<_> = (0..4)
        .map(|i| {
            ThreadOfControl::named(
                format!("consumer-{i}"),
                Consumer {
                    mailbox: Arc::clone(&mailbox),
                    total: Arc::clone(&total),
                },
            )
        })
        .collect();

    for consumer in &consumers {
        consumer.start().unwrap();
        assert_eq!(consumer.state(), ThreadState::Running);
    }

    for value in 1..=100 {
        mailbox.push(value);
    }
    mailbox.close();

    for consumer in &consumers {
        consumer.wait_to_finish().unwrap();
        assert_eq!(consumer.join(), Ok(true));
        assert_eq!(consumer.state(), ThreadState::Finished);
    }

    assert_eq!(total.load(Ordering::SeqCst), 5050);
    assert!(!mailbox.condition.mutex().is_locked());
}

#[test]
fn test_broadcast_wakes_every_waiter_with_mutex_held() {
    let condition = Condition::make();
    let released = Arc::new(AtomicBool::new(false));
    let woken = Arc::new(AtomicUsize::new(0));

    let waiters: Vec<_> = (0..3)
        .map(|_| {
            let condition = Arc::clone(&condition);
            let released = Arc::clone(&released);
            let woken = Arc::clone(&woken);
            ThreadOfControl::new(move |_: &Control| {
                let _lock = ScopedLock::on_condition(&condition).unwrap();
                while !released.load(Ordering::Acquire) {
                    condition.wait_for_signal().unwrap();
                }
                assert!(condition.mutex().is_held_by_current_thread());
                woken.fetch_add(1, Ordering::SeqCst);
            })
        })
        .collect();

    for waiter in &waiters {
        waiter.start().unwrap();
    }

    ThreadOfControl::sleep(Duration::from_millis(20));
    {
        let _lock = ScopedLock::on_condition(&condition).unwrap();
        released.store(true, Ordering::Release);
        condition.broadcast();
    }

    for waiter in &waiters {
        assert_eq!(waiter.join(), Ok(true));
    }
    assert_eq!(woken.load(Ordering::SeqCst), 3);
}

#[test]
fn test_periodic_worker_stops_on_cancel() {
    let ticks = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&ticks);

    let worker = ThreadOfControl::named("ticker", move |control: &Control| {
        while !control.is_cancelled() {
            if !control.wait_for(Duration::from_millis(5)).unwrap() {
                break;
            }
            counter.fetch_add(1, Ordering::SeqCst);
        }
    });

    worker.start().unwrap();
    while ticks.load(Ordering::SeqCst) < 3 {
        ThreadOfControl::sleep(Duration::from_millis(1));
    }

    worker.cancel().unwrap();
    assert_eq!(worker.join(), Ok(true));
    assert!(!worker.is_running());

    let after = ticks.load(Ordering::SeqCst);
    ThreadOfControl::sleep(Duration::from_millis(20));
    assert_eq!(ticks.load(Ordering::SeqCst), after);
}
