//! Micro-benchmarks for the lock strategies.
//!
//! The full sweep (`cargo run --release`) measures whole cases with large
//! budgets. These cover what the sweep can't isolate:
//! - **Uncontended cost**: one begin/end pair per strategy, single thread
//! - **Optimistic path**: stamp + snapshot + validate with no writer
//! - **Small contended cases**: `run_case` with a reduced budget
//!
//! Run with: `cargo bench --bench lock_strategies`
//! With mimalloc: `cargo bench --bench lock_strategies --features mimalloc`

#![expect(clippy::unwrap_used)]

use divan::{Bencher, black_box};
use lockbench::{BenchConfig, BenchmarkRunner, LockStrategy, SharedState, StrategyKind, TestCase};
use std::time::Duration;

#[cfg(feature = "mimalloc")]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

fn main() {
    divan::main();
}

const SMALL_BUDGET: u64 = 20_000;

fn small_runner() -> BenchmarkRunner {
    BenchmarkRunner::new(BenchConfig {
        loop_budget: SMALL_BUDGET,
        fairness_scaling_factor: 10,
        case_timeout: Duration::from_secs(60),
        cooldown_pause: Duration::ZERO,
        map_window: 1024,
    })
}

// =============================================================================
// 01: UNCONTENDED ACCESS
// =============================================================================

#[divan::bench_group(name = "01_uncontended")]
mod uncontended {
    use super::{Bencher, LockStrategy, SharedState, StrategyKind, black_box};

    #[divan::bench(args = StrategyKind::ALL)]
    fn write(bencher: Bencher, kind: StrategyKind) {
        let strategy = LockStrategy::new(kind);
        let state = SharedState::new(1024);

        bencher.bench_local(|| {
            let access = strategy.begin_write();
            // SAFETY: exclusive write access for `state`.
            let counter = unsafe { state.apply_write() };
            strategy.end_write(access);
            black_box(counter)
        });
    }

    #[divan::bench(args = StrategyKind::ALL)]
    fn locked_read(bencher: Bencher, kind: StrategyKind) {
        let strategy = LockStrategy::new(kind);
        let state = SharedState::new(1024);

        bencher.bench_local(|| {
            let access = strategy.begin_read();
            // SAFETY: read access for `state`.
            let snapshot = unsafe { state.read_locked() };
            strategy.end_read(access);
            black_box(snapshot)
        });
    }

    #[divan::bench]
    fn optimistic_read(bencher: Bencher) {
        let strategy = LockStrategy::new(StrategyKind::OptimisticStamped);
        let state = SharedState::new(1024);

        bencher.bench_local(|| {
            let stamp = strategy.try_optimistic_read().unwrap();
            let snapshot = state.snapshot();
            black_box(strategy.validate(stamp));
            black_box(snapshot)
        });
    }
}

// =============================================================================
// 02: SMALL CONTENDED CASES
// =============================================================================

#[divan::bench_group(name = "02_contended_case", sample_count = 10)]
mod contended_case {
    use super::{Bencher, SMALL_BUDGET, StrategyKind, TestCase, small_runner};

    #[divan::bench(args = StrategyKind::ALL)]
    fn writers_only_4(bencher: Bencher, kind: StrategyKind) {
        let runner = small_runner();
        bencher.bench_local(|| {
            let mut case = TestCase::new(kind, 4, 0, SMALL_BUDGET);
            runner.run_case(&mut case).unwrap()
        });
    }

    #[divan::bench(args = StrategyKind::ALL)]
    fn mixed_4_4(bencher: Bencher, kind: StrategyKind) {
        let runner = small_runner();
        bencher.bench_local(|| {
            let mut case = TestCase::new(kind, 4, 4, SMALL_BUDGET);
            runner.run_case(&mut case).unwrap()
        });
    }

    #[divan::bench(args = StrategyKind::ALL)]
    fn read_heavy_1_8(bencher: Bencher, kind: StrategyKind) {
        let runner = small_runner();
        bencher.bench_local(|| {
            let mut case = TestCase::new(kind, 1, 8, SMALL_BUDGET);
            runner.run_case(&mut case).unwrap()
        });
    }
}
