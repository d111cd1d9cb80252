//! Execute one test case end to end.
//!
//! # Algorithm
//! 1. Reject cases with no threads at all.
//! 2. Build a fresh [`SharedState`] and a fresh [`LockStrategy`].
//! 3. Split the (fairness-scaled) budget evenly across each role's threads.
//! 4. Spawn every worker, open the start gate, start the clock.
//! 5. Wait on the finish counter, bounded by the case timeout. On timeout,
//!    raise the case's abort flag so workers that can still move stop early.
//! 6. Stop the clock, join the workers, check the counter.
//! 7. Record the duration only if everything above succeeded.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::config::BenchConfig;
use crate::error::BenchError;
use crate::matrix::TestCase;
use crate::state::SharedState;
use crate::strategy::{LockStrategy, StrategyKind};
use crate::sync::{FinishCounter, StartGate};
use crate::tracing_helpers::{debug_log, error_log, warn_log};
use crate::worker::{ReadStats, Role, Worker, WorkerReport};

// ============================================================================
//  WorkloadPlan
// ============================================================================

/// How a case's budget is divided between threads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkloadPlan {
    /// Budget after fairness scaling.
    pub effective_budget: u64,
    /// Operations per writer thread (0 without writers).
    pub writer_loop: u64,
    /// Operations per reader thread (0 without readers).
    pub reader_loop: u64,
    /// Writer threads.
    pub writer_threads: usize,
    /// Reader threads.
    pub reader_threads: usize,
}

impl WorkloadPlan {
    /// Divide `case`'s budget. Remainders of the integer division are dropped.
    #[must_use]
    pub fn for_case(case: &TestCase, fairness_scaling_factor: u64) -> Self {
        let effective_budget = effective_budget(
            case.strategy(),
            case.loop_budget(),
            fairness_scaling_factor,
        );

        Self {
            effective_budget,
            writer_loop: per_thread(effective_budget, case.writer_threads()),
            reader_loop: per_thread(effective_budget, case.reader_threads()),
            writer_threads: case.writer_threads(),
            reader_threads: case.reader_threads(),
        }
    }

    /// Counter value the writers must leave behind.
    ///
    /// Equals `effective_budget` whenever the writer count divides it.
    #[must_use]
    pub fn expected_counter(&self) -> u64 {
        self.writer_loop * self.writer_threads as u64
    }

    /// Threads the case spawns.
    #[must_use]
    pub const fn total_threads(&self) -> usize {
        self.writer_threads + self.reader_threads
    }
}

/// Budget a strategy actually runs: fair kinds are scaled down.
///
/// A zero divisor is treated as one.
#[must_use]
pub const fn effective_budget(kind: StrategyKind, loop_budget: u64, fairness_scaling_factor: u64) -> u64 {
    if kind.is_fair() {
        let divisor = if fairness_scaling_factor == 0 {
            1
        } else {
            fairness_scaling_factor
        };
        loop_budget / divisor
    } else {
        loop_budget
    }
}

const fn per_thread(budget: u64, threads: usize) -> u64 {
    if threads == 0 { 0 } else { budget / threads as u64 }
}

// ============================================================================
//  CaseOutcome
// ============================================================================

/// A successfully completed case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseOutcome {
    /// The case, with its duration recorded.
    pub case: TestCase,
    /// How the budget was split.
    pub plan: WorkloadPlan,
    /// Counter value after every worker finished.
    pub final_counter: u64,
    /// Merged read tallies across reader threads.
    pub reads: ReadStats,
}

impl CaseOutcome {
    /// Measured wall time.
    #[must_use]
    pub fn duration(&self) -> Duration {
        self.case.duration().unwrap_or_default()
    }
}

// ============================================================================
//  BenchmarkRunner
// ============================================================================

/// Runs individual cases under one configuration.
#[derive(Debug, Clone, Default)]
pub struct BenchmarkRunner {
    config: BenchConfig,
}

impl BenchmarkRunner {
    /// A runner using `config`.
    #[must_use]
    pub const fn new(config: BenchConfig) -> Self {
        Self { config }
    }

    /// The configuration in use.
    #[must_use]
    pub const fn config(&self) -> &BenchConfig {
        &self.config
    }

    /// Run `case` once.
    ///
    /// On success the case's duration is recorded and a copy is returned in
    /// the outcome. On failure the duration stays unset.
    ///
    /// # Errors
    /// - [`BenchError::InvalidConfiguration`]: no readers and no writers.
    /// - [`BenchError::Spawn`]: a worker thread could not be created.
    /// - [`BenchError::LivenessFailure`]: workers did not finish in time.
    /// - [`BenchError::CorrectnessFailure`]: the counter lost or gained updates.
    pub fn run_case(&self, case: &mut TestCase) -> Result<CaseOutcome, BenchError> {
        if case.total_threads() == 0 {
            return Err(BenchError::InvalidConfiguration { case: case.clone() });
        }

        let plan = WorkloadPlan::for_case(case, self.config.fairness_scaling_factor);
        let state = Arc::new(SharedState::new(self.config.map_window));
        self.execute(case, plan, state)
    }

    /// Spawn, time and check one case against `state`.
    ///
    /// The runner keeps no handle on `state` past return; once every worker
    /// has exited the state is dropped.
    fn execute(
        &self,
        case: &mut TestCase,
        plan: WorkloadPlan,
        state: Arc<SharedState>,
    ) -> Result<CaseOutcome, BenchError> {
        let strategy = Arc::new(LockStrategy::new(case.strategy()));
        let gate = Arc::new(StartGate::new());
        let finish = Arc::new(FinishCounter::new(plan.total_threads()));
        let abort = Arc::new(AtomicBool::new(false));

        debug_log!(
            case = %case,
            effective_budget = plan.effective_budget,
            writer_loop = plan.writer_loop,
            reader_loop = plan.reader_loop,
            "scheduling workers"
        );

        let mut handles: Vec<JoinHandle<Result<WorkerReport, BenchError>>> =
            Vec::with_capacity(plan.total_threads());
        let roles = [
            (Role::Reader, plan.reader_threads, plan.reader_loop),
            (Role::Writer, plan.writer_threads, plan.writer_loop),
        ];

        for (role, threads, loop_count) in roles {
            for index in 0..threads {
                let worker = Worker::new(
                    role,
                    loop_count,
                    Arc::clone(&strategy),
                    Arc::clone(&state),
                    Arc::clone(&gate),
                    Arc::clone(&finish),
                    Arc::clone(&abort),
                );

                let spawned = thread::Builder::new()
                    .name(format!("{}-{role}-{index}", case.strategy().slug()))
                    .spawn(move || worker.run());

                match spawned {
                    Ok(handle) => handles.push(handle),
                    Err(source) => {
                        gate.abandon();
                        for handle in handles {
                            let _ = handle.join();
                        }
                        error_log!(case = %case, error = %source, "worker spawn failed");
                        return Err(BenchError::Spawn {
                            case: case.clone(),
                            source,
                        });
                    }
                }
            }
        }

        gate.open();
        let start = Instant::now();

        if let Err(outstanding) = finish.wait_timeout(self.config.case_timeout) {
            // The case has failed. Workers still making progress see the flag
            // and exit; a worker deadlocked inside the strategy stays detached.
            abort.store(true, Ordering::Relaxed);
            warn_log!(case = %case, outstanding, "case timed out, aborting workers");
            return Err(BenchError::LivenessFailure {
                case: case.clone(),
                outstanding,
                timeout: self.config.case_timeout,
            });
        }

        let elapsed = start.elapsed();

        // Every worker signalled, so none can still be waiting on the gate.
        let reads = collect_reads(case, handles);

        let final_counter = state.counter();
        if plan.writer_threads > 0 {
            let expected = plan.expected_counter();
            if final_counter != expected {
                return Err(BenchError::CorrectnessFailure {
                    case: case.clone(),
                    actual: final_counter,
                    expected,
                });
            }
        }

        case.record_duration(elapsed);

        Ok(CaseOutcome {
            case: case.clone(),
            plan,
            final_counter,
            reads,
        })
    }
}

/// Join every worker and merge the read tallies of those that reported.
///
/// A worker without a report is logged, since its reads are missing from the
/// returned totals.
fn collect_reads(
    case: &TestCase,
    handles: Vec<JoinHandle<Result<WorkerReport, BenchError>>>,
) -> ReadStats {
    let mut reads = ReadStats::default();
    for handle in handles {
        match handle.join() {
            Ok(Ok(report)) => reads.merge(&report.reads),
            Ok(Err(err)) => {
                error_log!(case = %case, error = %err, "worker report missing from read totals");
            }
            Err(_) => {
                error_log!(case = %case, "worker panicked; its reads are not counted");
            }
        }
    }
    reads
}
