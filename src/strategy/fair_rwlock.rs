//! Strictly FIFO reader-writer lock.
//!
//! Readers and writers share one arrival queue. A newcomer only bypasses the
//! queue when it is empty and the lock is compatible; otherwise it waits its
//! turn. On release the head of the queue is granted, and if the head is a
//! reader, every reader directly behind it is granted with it, up to the next
//! queued writer. Readers that arrive after a queued writer wait for it even
//! while other readers hold the lock.

use std::collections::VecDeque;
use std::marker::PhantomData;
use std::sync::Arc;

use parking_lot::Mutex;

use super::fifo::{WaitMode, Waiter};

#[derive(Debug, Default)]
struct State {
    readers: usize,
    writer: bool,
    queue: VecDeque<Arc<Waiter>>,
}

impl State {
    /// Grant the longest compatible prefix of the queue.
    fn dispatch(&mut self) {
        while let Some(head) = self.queue.front() {
            match head.mode() {
                WaitMode::Exclusive => {
                    if self.writer || self.readers > 0 {
                        break;
                    }
                    self.writer = true;
                }
                WaitMode::Shared => {
                    if self.writer {
                        break;
                    }
                    self.readers += 1;
                }
            }
            if let Some(granted) = self.queue.pop_front() {
                granted.grant();
            }
            if self.writer {
                break;
            }
        }
    }
}

/// A reader-writer lock serving readers and writers in arrival order.
#[derive(Debug, Default)]
pub struct FairRwLock {
    state: Mutex<State>,
}

/// Shared access. Released on drop.
#[derive(Debug)]
#[must_use = "the lock is released as soon as the guard drops"]
pub struct FairReadGuard<'a> {
    lock: &'a FairRwLock,
    _marker: PhantomData<*mut ()>,
}

/// Exclusive access. Released on drop.
#[derive(Debug)]
#[must_use = "the lock is released as soon as the guard drops"]
pub struct FairWriteGuard<'a> {
    lock: &'a FairRwLock,
    _marker: PhantomData<*mut ()>,
}

impl Drop for FairReadGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.lock.state.lock();
        state.readers -= 1;
        if state.readers == 0 {
            state.dispatch();
        }
    }
}

impl Drop for FairWriteGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.lock.state.lock();
        state.writer = false;
        state.dispatch();
    }
}

impl FairRwLock {
    /// Create an unlocked lock.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire shared access.
    pub fn read(&self) -> FairReadGuard<'_> {
        let waiter = {
            let mut state = self.state.lock();
            if state.queue.is_empty() && !state.writer {
                state.readers += 1;
                return self.read_guard();
            }
            let waiter = Waiter::current(WaitMode::Shared);
            state.queue.push_back(Arc::clone(&waiter));
            waiter
        };

        waiter.park_until_granted();
        self.read_guard()
    }

    /// Acquire exclusive access.
    pub fn write(&self) -> FairWriteGuard<'_> {
        let waiter = {
            let mut state = self.state.lock();
            if state.queue.is_empty() && !state.writer && state.readers == 0 {
                state.writer = true;
                return self.write_guard();
            }
            let waiter = Waiter::current(WaitMode::Exclusive);
            state.queue.push_back(Arc::clone(&waiter));
            waiter
        };

        waiter.park_until_granted();
        self.write_guard()
    }

    /// Threads currently holding shared access.
    #[must_use]
    pub fn reader_count(&self) -> usize {
        self.state.lock().readers
    }

    /// Whether a writer holds the lock.
    #[must_use]
    pub fn is_write_locked(&self) -> bool {
        self.state.lock().writer
    }

    /// Threads queued for access of either kind.
    #[must_use]
    pub fn queue_length(&self) -> usize {
        self.state.lock().queue.len()
    }

    const fn read_guard(&self) -> FairReadGuard<'_> {
        FairReadGuard {
            lock: self,
            _marker: PhantomData,
        }
    }

    const fn write_guard(&self) -> FairWriteGuard<'_> {
        FairWriteGuard {
            lock: self,
            _marker: PhantomData,
        }
    }
}
