//! # `lockbench`
//!
//! Throughput and correctness harness for mutual-exclusion strategies under
//! reader/writer contention.
//!
//! Six strategies guard the same small resource (a counter plus a keyed map):
//!
//! | Strategy | Reads | Writes | Order |
//! |----------|-------|--------|-------|
//! | `ExclusiveMutex` | exclusive | exclusive | unspecified |
//! | `ReentrantUnfair` | exclusive | reentrant | unspecified |
//! | `ReentrantFair` | exclusive | reentrant | strict FIFO |
//! | `ReadWriteUnfair` | shared | exclusive | unspecified |
//! | `ReadWriteFair` | shared | exclusive | strict FIFO |
//! | `OptimisticStamped` | optimistic + validated | exclusive | unfair |
//!
//! Each case spawns its reader and writer threads, releases them together
//! through a start gate, times them until the last one signals completion, and
//! then checks that no write was lost.
//!
//! ```rust
//! use std::time::Duration;
//! use lockbench::{BenchConfig, StrategyKind, TestMatrix};
//!
//! let config = BenchConfig {
//!     loop_budget: 10_000,
//!     cooldown_pause: Duration::ZERO,
//!     ..BenchConfig::default()
//! };
//! let matrix = TestMatrix::new(
//!     vec![StrategyKind::ExclusiveMutex, StrategyKind::OptimisticStamped],
//!     vec![(1, 0), (2, 2)],
//!     config.loop_budget,
//! );
//!
//! let report = lockbench::run(&matrix, &config);
//! assert!(report.all_passed());
//! assert_eq!(report.duration_groups().len(), 2);
//! ```
//!
//! ## Guarantees checked per case
//!
//! - Final counter equals the total number of writer operations.
//! - Every worker finishes within the case timeout.
//! - Optimistic reads that fail validation fall back to a shared read.
//!
//! A failing case is reported with its `(strategy, writers, readers)` tuple and
//! does not stop the sweep. No case is retried.

#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::inline_always)]

pub mod config;
pub mod cooldown;
pub mod error;
pub mod matrix;
pub mod report;
pub mod runner;
pub mod state;
pub mod strategy;
pub mod sync;
pub mod worker;

mod tracing_helpers;

pub use config::BenchConfig;
pub use cooldown::{Cooldown, NoCooldown, PauseCooldown};
pub use error::BenchError;
pub use matrix::{DEFAULT_THREAD_PAIRS, TestCase, TestMatrix};
pub use report::{Report, ReportEntry};
pub use runner::{BenchmarkRunner, CaseOutcome, WorkloadPlan};
pub use state::{SharedState, Snapshot};
pub use strategy::{LockStrategy, StrategyKind};
pub use worker::{ReadPath, ReadStats, Role};

use tracing_helpers::{error_log, info_log};

/// Run every case of `matrix` once, pausing `config.cooldown_pause` before each.
///
/// Each case runs its own [`TestCase::loop_budget`]; `config.loop_budget` is
/// not consulted here. Build the matrix with
/// [`TestMatrix::full(config.loop_budget)`](TestMatrix::full) to sweep the
/// configured budget. The remaining settings (fairness divisor, timeout, map
/// window, cooldown) all come from `config`.
#[must_use]
pub fn run(matrix: &TestMatrix, config: &BenchConfig) -> Report {
    let runner = BenchmarkRunner::new(config.clone());
    let cooldown = PauseCooldown::new(config.cooldown_pause);
    run_with(matrix, &runner, &cooldown)
}

/// Run every case of `matrix` once with an explicit runner and cooldown.
///
/// Failures are logged and recorded; the sweep always continues.
pub fn run_with(matrix: &TestMatrix, runner: &BenchmarkRunner, cooldown: &dyn Cooldown) -> Report {
    let mut report = Report::new(matrix.group_width());
    let total = matrix.len();

    for (index, mut case) in matrix.cases().enumerate() {
        cooldown.cool_down();
        info_log!(case = %case, index = index + 1, total, "start benchmark");

        let result = runner.run_case(&mut case);
        match &result {
            Ok(outcome) => {
                info_log!(
                    case = %case,
                    duration_ms = case.duration_ms().unwrap_or_default(),
                    counter = outcome.final_counter,
                    optimistic_reads = outcome.reads.optimistic,
                    fallback_reads = outcome.reads.fallback,
                    "finish benchmark"
                );
            }
            Err(err) => {
                error_log!(case = %case, error = %err, "benchmark failed");
            }
        }

        report.record(case, result);
    }

    report
}
