//! Waiter records for the FIFO handoff locks.
//!
//! A blocked thread enqueues a [`Waiter`] and parks. The releasing thread
//! updates the lock state on the waiter's behalf (ownership moves before the
//! waiter wakes), then calls [`Waiter::grant`]. Because ownership is handed
//! over rather than released, a newly arriving thread can never slip in ahead
//! of a queued one.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, Thread, ThreadId};
use std::time::Instant;

/// Access a waiter is asking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WaitMode {
    Shared,
    Exclusive,
}

/// One queued acquisition request.
#[derive(Debug)]
pub(crate) struct Waiter {
    thread: Thread,
    mode: WaitMode,
    granted: AtomicBool,
}

impl Waiter {
    /// Record for the calling thread.
    pub(crate) fn current(mode: WaitMode) -> Arc<Self> {
        Arc::new(Self {
            thread: thread::current(),
            mode,
            granted: AtomicBool::new(false),
        })
    }

    #[inline]
    pub(crate) const fn mode(&self) -> WaitMode {
        self.mode
    }

    #[inline]
    pub(crate) fn thread_id(&self) -> ThreadId {
        self.thread.id()
    }

    #[inline]
    pub(crate) fn is_granted(&self) -> bool {
        self.granted.load(Ordering::Acquire)
    }

    /// Hand the lock to this waiter and wake it.
    ///
    /// Must be called with the lock's state mutex held, after the state has
    /// been updated to reflect the new owner.
    pub(crate) fn grant(&self) {
        self.granted.store(true, Ordering::Release);
        self.thread.unpark();
    }

    /// Park until granted. Tolerates spurious wakeups.
    pub(crate) fn park_until_granted(&self) {
        while !self.is_granted() {
            thread::park();
        }
    }

    /// Park until granted or `deadline` passes. Returns whether granted.
    ///
    /// A `false` result is only a hint: the grant may land between the last
    /// check and the caller re-taking the state mutex, so callers must recheck
    /// [`is_granted`](Self::is_granted) under the mutex before withdrawing.
    pub(crate) fn park_until_granted_or(&self, deadline: Instant) -> bool {
        loop {
            if self.is_granted() {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            thread::park_timeout(deadline - now);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_grant_wakes_parked_thread() {
        let (tx, rx) = std::sync::mpsc::channel();
        let handle = thread::spawn(move || {
            let waiter = Waiter::current(WaitMode::Exclusive);
            tx.send(Arc::clone(&waiter)).unwrap();
            waiter.park_until_granted();
            waiter.is_granted()
        });

        let waiter = rx.recv().unwrap();
        thread::sleep(Duration::from_millis(10));
        waiter.grant();

        assert!(handle.join().unwrap());
    }

    #[test]
    fn test_deadline_without_grant() {
        let waiter = Waiter::current(WaitMode::Shared);
        let granted = waiter.park_until_granted_or(Instant::now() + Duration::from_millis(5));
        assert!(!granted);
        assert_eq!(waiter.mode(), WaitMode::Shared);
        assert_eq!(waiter.thread_id(), thread::current().id());
    }
}
