//! Workload threads.
//!
//! A [`Worker`] performs a fixed number of reader or writer operations through
//! one [`LockStrategy`] against one [`SharedState`]. It signals the
//! [`FinishCounter`] only after its loop completes naturally: an abandoned gate
//! or a panic inside the loop leaves the counter untouched, and the runner sees
//! the missing signal as a liveness failure.
//!
//! Every worker also shares its case's abort flag. Once the runner gives up on
//! a case it raises the flag, and workers still able to make progress leave
//! their loop at the next iteration instead of running on detached.

use std::fmt as StdFmt;
use std::hint::black_box;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::BenchError;
use crate::state::{SharedState, Snapshot};
use crate::strategy::LockStrategy;
use crate::sync::{FinishCounter, StartGate};
use crate::tracing_helpers::{debug_log, warn_log};

/// What a worker does in its critical sections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Shared access; never mutates the state.
    Reader,
    /// Exclusive access; bumps the counter and inserts a map entry.
    Writer,
}

impl StdFmt::Display for Role {
    fn fmt(&self, f: &mut StdFmt::Formatter<'_>) -> StdFmt::Result {
        f.write_str(match self {
            Self::Reader => "reader",
            Self::Writer => "writer",
        })
    }
}

/// How a single read obtained its snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadPath {
    /// Lock-free read that passed stamp validation.
    Optimistic,
    /// Optimistic attempt failed (or a writer held the lock); shared lock taken.
    Fallback,
    /// Strategy has no optimistic mode; read under its read lock.
    Locked,
}

/// Per-path read tallies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadStats {
    /// Reads served without blocking.
    pub optimistic: u64,
    /// Optimistic reads that had to retry under the shared lock.
    pub fallback: u64,
    /// Reads that went straight to the read lock.
    pub locked: u64,
}

impl ReadStats {
    /// Count one read.
    #[inline]
    pub const fn record(&mut self, path: ReadPath) {
        match path {
            ReadPath::Optimistic => self.optimistic += 1,
            ReadPath::Fallback => self.fallback += 1,
            ReadPath::Locked => self.locked += 1,
        }
    }

    /// Fold another worker's tallies into these.
    pub const fn merge(&mut self, other: &Self) {
        self.optimistic += other.optimistic;
        self.fallback += other.fallback;
        self.locked += other.locked;
    }

    /// All reads counted.
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.optimistic + self.fallback + self.locked
    }
}

/// What a worker hands back through its join handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerReport {
    /// The worker's role.
    pub role: Role,
    /// Operations completed.
    pub operations: u64,
    /// Read tallies (all zero for writers).
    pub reads: ReadStats,
}

/// One reader or writer thread's workload.
#[derive(Debug)]
pub struct Worker {
    role: Role,
    loop_count: u64,
    strategy: Arc<LockStrategy>,
    state: Arc<SharedState>,
    gate: Arc<StartGate>,
    finish: Arc<FinishCounter>,
    abort: Arc<AtomicBool>,
}

impl Worker {
    /// Bundle a workload. `state` must be guarded by `strategy` and nothing else.
    #[must_use]
    pub const fn new(
        role: Role,
        loop_count: u64,
        strategy: Arc<LockStrategy>,
        state: Arc<SharedState>,
        gate: Arc<StartGate>,
        finish: Arc<FinishCounter>,
        abort: Arc<AtomicBool>,
    ) -> Self {
        Self {
            role,
            loop_count,
            strategy,
            state,
            gate,
            finish,
            abort,
        }
    }

    /// Wait for the gate, run the loop, signal completion.
    ///
    /// # Errors
    /// - [`BenchError::InterruptedWait`] if the gate was abandoned.
    /// - [`BenchError::Aborted`] if the abort flag was raised mid-loop.
    ///
    /// The finish counter is not signalled in either case.
    pub fn run(self) -> Result<WorkerReport, BenchError> {
        if let Err(err) = self.gate.wait() {
            warn_log!(role = %self.role, error = %err, "worker exiting without completion");
            return Err(err);
        }

        let mut reads = ReadStats::default();
        for done in 0..self.loop_count {
            // Relaxed: the flag only ends the loop early, it publishes nothing.
            if self.abort.load(Ordering::Relaxed) {
                debug_log!(role = %self.role, operations = done, "worker aborted");
                return Err(BenchError::Aborted);
            }
            match self.role {
                Role::Writer => {
                    self.write_once();
                }
                Role::Reader => {
                    let (snapshot, path) = self.read_once();
                    debug_assert!(snapshot.is_consistent(), "torn read: {snapshot:?}");
                    reads.record(path);
                }
            }
        }

        self.finish.signal();
        debug_log!(role = %self.role, operations = self.loop_count, "worker finished");

        Ok(WorkerReport {
            role: self.role,
            operations: self.loop_count,
            reads,
        })
    }

    /// One exclusive section: counter increment plus map insert.
    #[inline]
    pub fn write_once(&self) -> u64 {
        let access = self.strategy.begin_write();
        // SAFETY: `access` is exclusive write access from the strategy that
        // guards `state`.
        let next = unsafe { self.state.apply_write() };
        self.strategy.end_write(access);
        next
    }

    /// One read: optimistic attempt where supported, locked read otherwise.
    #[inline]
    pub fn read_once(&self) -> (Snapshot, ReadPath) {
        let path = if self.strategy.kind().is_optimistic() {
            if let Some(stamp) = self.strategy.try_optimistic_read() {
                let snapshot = self.state.snapshot();
                if self.strategy.validate(stamp) {
                    return (black_box(snapshot), ReadPath::Optimistic);
                }
            }
            ReadPath::Fallback
        } else {
            ReadPath::Locked
        };

        let access = self.strategy.begin_read();
        // SAFETY: `access` is read access from the strategy that guards `state`.
        let snapshot = unsafe { self.state.read_locked() };
        self.strategy.end_read(access);

        (black_box(snapshot), path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::StrategyKind;
    use std::thread;
    use std::time::Duration;

    struct Rig {
        strategy: Arc<LockStrategy>,
        state: Arc<SharedState>,
        gate: Arc<StartGate>,
        finish: Arc<FinishCounter>,
        abort: Arc<AtomicBool>,
    }

    impl Rig {
        fn new(kind: StrategyKind, workers: usize) -> Self {
            Self {
                strategy: Arc::new(LockStrategy::new(kind)),
                state: Arc::new(SharedState::new(64)),
                gate: Arc::new(StartGate::new()),
                finish: Arc::new(FinishCounter::new(workers)),
                abort: Arc::new(AtomicBool::new(false)),
            }
        }

        fn worker(&self, role: Role, loop_count: u64) -> Worker {
            Worker::new(
                role,
                loop_count,
                Arc::clone(&self.strategy),
                Arc::clone(&self.state),
                Arc::clone(&self.gate),
                Arc::clone(&self.finish),
                Arc::clone(&self.abort),
            )
        }
    }

    #[test]
    fn test_writer_counts_and_signals() {
        let rig = Rig::new(StrategyKind::ExclusiveMutex, 1);
        rig.gate.open();

        let report = rig.worker(Role::Writer, 100).run().unwrap();

        assert_eq!(report.operations, 100);
        assert_eq!(report.reads.total(), 0);
        assert_eq!(rig.state.counter(), 100);
        assert_eq!(rig.finish.remaining(), 0);
    }

    #[test]
    fn test_reader_paths_by_kind() {
        for kind in StrategyKind::ALL {
            let rig = Rig::new(kind, 1);
            rig.gate.open();

            let report = rig.worker(Role::Reader, 10).run().unwrap();

            assert_eq!(report.reads.total(), 10, "{kind}");
            if kind.is_optimistic() {
                // Uncontended: every read validates.
                assert_eq!(report.reads.optimistic, 10);
            } else {
                assert_eq!(report.reads.locked, 10);
            }
            assert_eq!(rig.state.counter(), 0);
        }
    }

    #[test]
    fn test_optimistic_reader_falls_back_while_writer_holds() {
        let rig = Rig::new(StrategyKind::OptimisticStamped, 1);
        let reader = rig.worker(Role::Reader, 1);
        let access = rig.strategy.begin_write();

        let handle = thread::spawn(move || reader.read_once());
        thread::sleep(Duration::from_millis(20));
        // SAFETY: `access` is exclusive write access for `state`.
        let _ = unsafe { rig.state.apply_write() };
        rig.strategy.end_write(access);

        let (snapshot, path) = handle.join().unwrap();
        assert_eq!(path, ReadPath::Fallback);
        assert_eq!(snapshot.counter, 1);
        assert!(snapshot.is_consistent());
    }

    #[test]
    fn test_abandoned_gate_does_not_signal() {
        let rig = Rig::new(StrategyKind::ReadWriteUnfair, 1);
        let worker = rig.worker(Role::Writer, 5);
        let handle = thread::spawn(move || worker.run());

        thread::sleep(Duration::from_millis(10));
        rig.gate.abandon();

        assert!(matches!(
            handle.join().unwrap(),
            Err(BenchError::InterruptedWait)
        ));
        assert_eq!(rig.finish.remaining(), 1);
        assert_eq!(rig.state.counter(), 0);
    }

    #[test]
    fn test_panicking_worker_does_not_signal() {
        let rig = Rig::new(StrategyKind::ExclusiveMutex, 1);
        rig.gate.open();
        let worker = rig.worker(Role::Writer, 3);

        let result = thread::spawn(move || {
            let _ = worker.write_once();
            panic!("injected failure inside the loop");
        })
        .join();

        assert!(result.is_err());
        assert_eq!(rig.finish.remaining(), 1);
        // The panicking thread's guard was released during unwinding.
        let access = rig.strategy.begin_write();
        rig.strategy.end_write(access);
    }

    #[test]
    fn test_abort_flag_stops_loop_without_signal() {
        let rig = Rig::new(StrategyKind::ExclusiveMutex, 1);
        rig.gate.open();
        let held = rig.strategy.begin_write();

        let worker = rig.worker(Role::Writer, u64::MAX);
        let handle = thread::spawn(move || worker.run());

        // The worker is parked on the held lock; raise the flag, then let it in.
        thread::sleep(Duration::from_millis(20));
        rig.abort.store(true, Ordering::Relaxed);
        rig.strategy.end_write(held);

        assert!(matches!(handle.join().unwrap(), Err(BenchError::Aborted)));
        assert_eq!(rig.finish.remaining(), 1);
        assert!(rig.state.counter() <= 1);
    }

    #[test]
    fn test_raised_abort_flag_skips_all_work() {
        let rig = Rig::new(StrategyKind::OptimisticStamped, 1);
        rig.gate.open();
        rig.abort.store(true, Ordering::Relaxed);

        let result = rig.worker(Role::Reader, 10).run();

        assert!(matches!(result, Err(BenchError::Aborted)));
        assert_eq!(rig.finish.remaining(), 1);
    }

    #[test]
    fn test_stats_merge() {
        let mut total = ReadStats::default();
        let mut a = ReadStats::default();
        a.record(ReadPath::Optimistic);
        a.record(ReadPath::Fallback);
        let mut b = ReadStats::default();
        b.record(ReadPath::Locked);

        total.merge(&a);
        total.merge(&b);
        assert_eq!(
            total,
            ReadStats {
                optimistic: 1,
                fallback: 1,
                locked: 1
            }
        );
        assert_eq!(total.total(), 3);
    }
}
