//! Strictly FIFO reentrant mutex.
//!
//! `parking_lot::FairMutex` is only eventually fair (it hands off on timeout
//! or on `unlock_fair`), so the fair exclusive strategy uses this lock instead:
//! every contended acquisition joins a queue and ownership is handed to the
//! queue head on release.
//!
//! The owning thread may re-acquire without queueing; the lock is released when
//! the hold count returns to zero.

use std::collections::VecDeque;
use std::marker::PhantomData;
use std::sync::Arc;
use std::thread::{self, ThreadId};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use super::fifo::{WaitMode, Waiter};

#[derive(Debug, Default)]
struct State {
    owner: Option<ThreadId>,
    holds: usize,
    queue: VecDeque<Arc<Waiter>>,
}

/// A reentrant mutex granting ownership in strict arrival order.
#[derive(Debug, Default)]
pub struct FairReentrantMutex {
    state: Mutex<State>,
}

/// Proof that the current thread holds the lock. Releases one hold on drop.
///
/// `!Send`: a hold belongs to the thread that took it.
#[derive(Debug)]
#[must_use = "the lock is released as soon as the guard drops"]
pub struct FairReentrantGuard<'a> {
    lock: &'a FairReentrantMutex,
    _marker: PhantomData<*mut ()>,
}

impl Drop for FairReentrantGuard<'_> {
    fn drop(&mut self) {
        self.lock.release();
    }
}

impl FairReentrantMutex {
    /// Create an unlocked mutex.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire, queueing behind every earlier waiter.
    pub fn lock(&self) -> FairReentrantGuard<'_> {
        let me = thread::current().id();
        let waiter = {
            let mut state = self.state.lock();
            if Self::try_acquire_locked(&mut state, me) {
                return self.guard();
            }
            let waiter = Waiter::current(WaitMode::Exclusive);
            state.queue.push_back(Arc::clone(&waiter));
            waiter
        };

        waiter.park_until_granted();
        self.guard()
    }

    /// Acquire only if that does not require waiting.
    ///
    /// Succeeds for the owner (reentrant) or when the lock is free and nobody
    /// is queued; never jumps the queue.
    pub fn try_lock(&self) -> Option<FairReentrantGuard<'_>> {
        let me = thread::current().id();
        let mut state = self.state.lock();
        Self::try_acquire_locked(&mut state, me).then(|| self.guard())
    }

    /// Acquire in FIFO order, giving up after `timeout`.
    ///
    /// A waiter that gives up leaves the queue; if ownership reached it while
    /// it was timing out, it keeps the lock and returns the guard.
    pub fn try_lock_for(&self, timeout: Duration) -> Option<FairReentrantGuard<'_>> {
        let deadline = Instant::now() + timeout;
        let me = thread::current().id();
        let waiter = {
            let mut state = self.state.lock();
            if Self::try_acquire_locked(&mut state, me) {
                return Some(self.guard());
            }
            let waiter = Waiter::current(WaitMode::Exclusive);
            state.queue.push_back(Arc::clone(&waiter));
            waiter
        };

        if waiter.park_until_granted_or(deadline) {
            return Some(self.guard());
        }

        let mut state = self.state.lock();
        if waiter.is_granted() {
            return Some(self.guard());
        }
        state.queue.retain(|queued| !Arc::ptr_eq(queued, &waiter));
        None
    }

    /// Times the current thread holds the lock (0 if it does not own it).
    #[must_use]
    pub fn hold_count(&self) -> usize {
        let state = self.state.lock();
        if state.owner == Some(thread::current().id()) {
            state.holds
        } else {
            0
        }
    }

    /// Whether the current thread owns the lock.
    #[must_use]
    pub fn is_held_by_current_thread(&self) -> bool {
        self.state.lock().owner == Some(thread::current().id())
    }

    /// Whether any thread owns the lock.
    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.state.lock().owner.is_some()
    }

    /// Threads currently queued for the lock.
    #[must_use]
    pub fn queue_length(&self) -> usize {
        self.state.lock().queue.len()
    }

    /// Whether any thread is queued.
    #[must_use]
    pub fn has_queued_threads(&self) -> bool {
        !self.state.lock().queue.is_empty()
    }

    fn try_acquire_locked(state: &mut State, me: ThreadId) -> bool {
        match state.owner {
            Some(owner) if owner == me => {
                state.holds += 1;
                true
            }
            None if state.queue.is_empty() => {
                state.owner = Some(me);
                state.holds = 1;
                true
            }
            _ => false,
        }
    }

    const fn guard(&self) -> FairReentrantGuard<'_> {
        FairReentrantGuard {
            lock: self,
            _marker: PhantomData,
        }
    }

    fn release(&self) {
        let mut state = self.state.lock();
        debug_assert_eq!(
            state.owner,
            Some(thread::current().id()),
            "release by non-owner"
        );

        state.holds -= 1;
        if state.holds > 0 {
            return;
        }

        match state.queue.pop_front() {
            Some(next) => {
                state.owner = Some(next.thread_id());
                state.holds = 1;
                next.grant();
            }
            None => state.owner = None,
        }
    }
}
