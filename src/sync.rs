//! Harness rendezvous primitives.
//!
//! These must be race-free no matter which strategy is being measured, so they
//! never touch the lock under test.
//!
//! - [`StartGate`]: one-shot broadcast. Workers block until the runner opens it.
//! - [`FinishCounter`]: outstanding-worker count. Workers decrement once on
//!   completion; the runner waits, bounded by a timeout, for zero.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::error::BenchError;

// ============================================================================
//  StartGate
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GateState {
    Closed,
    Open,
    Abandoned,
}

/// One-shot signal all workers wait on before measured work begins.
///
/// Transitions only away from `Closed`: once opened or abandoned it stays so.
#[derive(Debug)]
pub struct StartGate {
    state: Mutex<GateState>,
    changed: Condvar,
}

impl StartGate {
    /// A closed gate.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: Mutex::new(GateState::Closed),
            changed: Condvar::new(),
        }
    }

    /// Block until the gate opens.
    ///
    /// # Errors
    /// [`BenchError::InterruptedWait`] if the gate was abandoned instead.
    pub fn wait(&self) -> Result<(), BenchError> {
        let mut state = self.state.lock();
        while *state == GateState::Closed {
            self.changed.wait(&mut state);
        }
        match *state {
            GateState::Open => Ok(()),
            _ => Err(BenchError::InterruptedWait),
        }
    }

    /// Release every waiter. No effect if already abandoned.
    pub fn open(&self) {
        self.transition(GateState::Open);
    }

    /// Wake every waiter with [`BenchError::InterruptedWait`].
    ///
    /// Used when scheduling fails part-way; no effect if already open.
    pub fn abandon(&self) {
        self.transition(GateState::Abandoned);
    }

    /// Whether the gate has been opened.
    #[must_use]
    pub fn is_open(&self) -> bool {
        *self.state.lock() == GateState::Open
    }

    fn transition(&self, to: GateState) {
        let mut state = self.state.lock();
        if *state == GateState::Closed {
            *state = to;
            self.changed.notify_all();
        }
    }
}

impl Default for StartGate {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
//  FinishCounter
// ============================================================================

/// Count of workers that have not yet finished.
#[derive(Debug)]
pub struct FinishCounter {
    remaining: AtomicUsize,
    lock: Mutex<()>,
    reached_zero: Condvar,
}

impl FinishCounter {
    /// A counter expecting `workers` signals.
    #[must_use]
    pub const fn new(workers: usize) -> Self {
        Self {
            remaining: AtomicUsize::new(workers),
            lock: Mutex::new(()),
            reached_zero: Condvar::new(),
        }
    }

    /// Workers still outstanding.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.remaining.load(Ordering::Acquire)
    }

    /// Record one worker's completion.
    ///
    /// Extra signals past zero are ignored.
    pub fn signal(&self) {
        let previous = self
            .remaining
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1));

        if previous == Ok(1) {
            // Taking the lock orders this notify after any waiter's check.
            let _guard = self.lock.lock();
            self.reached_zero.notify_all();
        }
    }

    /// Block until every worker has signalled or `timeout` elapses.
    ///
    /// # Errors
    /// `Err(outstanding)` with the number of workers still missing.
    pub fn wait_timeout(&self, timeout: Duration) -> Result<(), usize> {
        let deadline = Instant::now() + timeout;
        let mut guard = self.lock.lock();

        loop {
            let remaining = self.remaining();
            if remaining == 0 {
                return Ok(());
            }
            if self.reached_zero.wait_until(&mut guard, deadline).timed_out() {
                return match self.remaining() {
                    0 => Ok(()),
                    outstanding => Err(outstanding),
                };
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_gate_releases_all_waiters() {
        let gate = Arc::new(StartGate::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let gate = Arc::clone(&gate);
                thread::spawn(move || gate.wait().is_ok())
            })
            .collect();

        thread::sleep(Duration::from_millis(10));
        assert!(!gate.is_open());
        gate.open();

        for handle in handles {
            assert!(handle.join().unwrap());
        }
    }

    #[test]
    fn test_wait_after_open_returns_immediately() {
        let gate = StartGate::new();
        gate.open();
        assert!(gate.wait().is_ok());
    }

    #[test]
    fn test_abandoned_gate_interrupts_waiters() {
        let gate = Arc::new(StartGate::new());
        let waiter = {
            let gate = Arc::clone(&gate);
            thread::spawn(move || gate.wait())
        };

        thread::sleep(Duration::from_millis(10));
        gate.abandon();

        assert!(matches!(
            waiter.join().unwrap(),
            Err(BenchError::InterruptedWait)
        ));
    }

    #[test]
    fn test_gate_is_one_shot() {
        let gate = StartGate::new();
        gate.open();
        gate.abandon();
        assert!(gate.wait().is_ok());

        let gate = StartGate::new();
        gate.abandon();
        gate.open();
        assert!(gate.wait().is_err());
    }

    #[test]
    fn test_counter_reaches_zero() {
        let counter = Arc::new(FinishCounter::new(4));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let counter = Arc::clone(&counter);
                thread::spawn(move || counter.signal())
            })
            .collect();

        assert_eq!(counter.wait_timeout(Duration::from_secs(5)), Ok(()));
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(counter.remaining(), 0);
    }

    #[test]
    fn test_counter_times_out_with_outstanding() {
        let counter = FinishCounter::new(3);
        counter.signal();
        assert_eq!(counter.wait_timeout(Duration::from_millis(20)), Err(2));
    }

    #[test]
    fn test_zero_workers_is_immediately_done() {
        let counter = FinishCounter::new(0);
        counter.signal();
        assert_eq!(counter.remaining(), 0);
        assert_eq!(counter.wait_timeout(Duration::from_millis(1)), Ok(()));
    }
}
