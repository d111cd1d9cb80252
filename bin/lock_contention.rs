//! Lock Contention Profiling Binary
//!
//! Runs one case repeatedly to expose outliers: slow runs, unexpected fallback
//! rates on the optimistic path, or fair strategies stalling. Reports the
//! median, slowest and fastest run. When tracing is enabled, per-case events
//! are written to a JSON log.
//!
//! Run with:
//! ```bash
//! # Default case (stamped, 10 writers, 10 readers), 10 runs
//! cargo run --release --features mimalloc --bin lock_contention
//!
//! # Pick the case and run count
//! LOCKBENCH_PROFILE_CASE=rwlock-fair:50:50 LOCKBENCH_PROFILE_RUNS=20 \
//!     cargo run --release --bin lock_contention
//!
//! # Inspect failures
//! rg '"level":"ERROR"' logs/lock_contention.json
//! ```

#![allow(clippy::cast_precision_loss)]

use std::env;
use std::process::ExitCode;
use std::time::Duration;

use lockbench::{BenchConfig, BenchmarkRunner, CaseOutcome, StrategyKind, TestCase};

#[cfg(feature = "mimalloc")]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

const DEFAULT_CASE: &str = "stamped:10:10";
const DEFAULT_RUNS: usize = 10;

#[cfg(feature = "tracing")]
type TracingGuard = tracing_appender::non_blocking::WorkerGuard;

#[cfg(not(feature = "tracing"))]
type TracingGuard = ();

// =============================================================================
// Custom Tracing Initialization (JSON to file)
// =============================================================================

#[cfg(feature = "tracing")]
fn init_json_tracing() -> TracingGuard {
    use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

    let log_dir = "logs";
    let filter_str = env::var("RUST_LOG").unwrap_or_else(|_| "lockbench=info".to_string());

    let _ = std::fs::create_dir_all(log_dir);

    let file_appender = tracing_appender::rolling::never(log_dir, "lock_contention.json");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_target(true)
        .with_ansi(false)
        .json()
        .with_filter(EnvFilter::try_new(&filter_str).unwrap_or_else(|_| EnvFilter::new("info")));

    let _ = tracing_subscriber::registry().with(file_layer).try_init();

    println!("Tracing enabled: logs/lock_contention.json (filter: {filter_str})");

    guard
}

#[cfg(not(feature = "tracing"))]
fn init_json_tracing() -> TracingGuard {
    println!("Tracing disabled (compile with --features tracing)");
}

// =============================================================================
// Case selection
// =============================================================================

/// Parse `kind:writers:readers`.
fn parse_case(spec: &str, loop_budget: u64) -> Result<TestCase, String> {
    let mut parts = spec.split(':');
    let (Some(kind), Some(writers), Some(readers), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(format!("expected kind:writers:readers, got {spec:?}"));
    };

    let kind: StrategyKind = kind.parse().map_err(|err| format!("{err}"))?;
    let writers: usize = writers
        .trim()
        .parse()
        .map_err(|err| format!("writers {writers:?}: {err}"))?;
    let readers: usize = readers
        .trim()
        .parse()
        .map_err(|err| format!("readers {readers:?}: {err}"))?;

    Ok(TestCase::new(kind, writers, readers, loop_budget))
}

fn profile_runs() -> Result<usize, String> {
    match env::var("LOCKBENCH_PROFILE_RUNS") {
        Ok(raw) => match raw.trim().parse() {
            Ok(0) => Err("LOCKBENCH_PROFILE_RUNS must be at least 1".to_string()),
            Ok(runs) => Ok(runs),
            Err(err) => Err(format!("LOCKBENCH_PROFILE_RUNS {raw:?}: {err}")),
        },
        Err(_) => Ok(DEFAULT_RUNS),
    }
}

// =============================================================================
// Reporting
// =============================================================================

fn median(outcomes: &[CaseOutcome]) -> Duration {
    let mut sorted: Vec<Duration> = outcomes.iter().map(CaseOutcome::duration).collect();
    sorted.sort_unstable();

    let mid = sorted.len() / 2;
    match (sorted.len() % 2, sorted.get(mid)) {
        (1, Some(middle)) => *middle,
        (_, Some(hi)) => sorted
            .get(mid.wrapping_sub(1))
            .map_or(*hi, |lo| (*lo + *hi) / 2),
        (_, None) => Duration::ZERO,
    }
}

fn print_stats(label: &str, index: usize, outcome: &CaseOutcome, baseline: Duration) {
    let elapsed_ms = outcome.duration().as_secs_f64() * 1000.0;
    let reads = &outcome.reads;

    println!("\n--- {label} run #{} ---", index + 1);
    println!("Elapsed:          {elapsed_ms:.2} ms");
    println!("Effective budget: {}", outcome.plan.effective_budget);
    println!(
        "Per thread:       {} writes, {} reads",
        outcome.plan.writer_loop, outcome.plan.reader_loop
    );
    println!("Final counter:    {}", outcome.final_counter);

    if reads.total() > 0 {
        let fallback_pct = reads.fallback as f64 / reads.total() as f64 * 100.0;
        println!("Optimistic reads: {}", reads.optimistic);
        println!("Fallback reads:   {} ({fallback_pct:.1}%)", reads.fallback);
        println!("Locked reads:     {}", reads.locked);
    }

    let baseline_ms = baseline.as_secs_f64() * 1000.0;
    if baseline_ms > 0.0 && elapsed_ms > baseline_ms * 3.0 {
        let ratio = elapsed_ms / baseline_ms;
        println!("!!! OUTLIER: ~{ratio:.1}x slower than median");
    }
}

// =============================================================================
// Main
// =============================================================================

fn main() -> ExitCode {
    let _guard = init_json_tracing();

    println!("Lock Contention Profiling");
    println!("=========================\n");

    let config = match BenchConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("invalid configuration: {err}");
            return ExitCode::from(2);
        }
    };

    let spec = env::var("LOCKBENCH_PROFILE_CASE").unwrap_or_else(|_| DEFAULT_CASE.to_string());
    let (template, runs) = match (parse_case(&spec, config.loop_budget), profile_runs()) {
        (Ok(case), Ok(runs)) => (case, runs),
        (Err(err), _) | (_, Err(err)) => {
            eprintln!("{err}");
            return ExitCode::from(2);
        }
    };

    let runner = BenchmarkRunner::new(config);
    println!("Running: {template} x {runs}");

    let mut outcomes: Vec<(usize, CaseOutcome)> = Vec::with_capacity(runs);
    let mut failures = 0usize;

    for run in 0..runs {
        print!("  Run {}/{runs}... ", run + 1);
        let _ = std::io::Write::flush(&mut std::io::stdout());

        let mut case = template.clone();
        match runner.run_case(&mut case) {
            Ok(outcome) => {
                println!("{:?}", outcome.duration());
                outcomes.push((run, outcome));
            }
            Err(err) => {
                println!("FAILED: {err}");
                failures += 1;
            }
        }
    }

    let completed: Vec<CaseOutcome> = outcomes.iter().map(|(_, outcome)| outcome.clone()).collect();
    let baseline = median(&completed);

    let slowest = outcomes.iter().max_by_key(|(_, outcome)| outcome.duration());
    let fastest = outcomes.iter().min_by_key(|(_, outcome)| outcome.duration());

    if let (Some((slow_idx, slow)), Some((fast_idx, fast))) = (slowest, fastest) {
        println!("\nBaseline (median) run: {baseline:?}");
        print_stats("Slowest", *slow_idx, slow, baseline);
        print_stats("Fastest", *fast_idx, fast, baseline);

        let fast_secs = fast.duration().as_secs_f64();
        if fast_secs > 0.0 {
            println!(
                "\nSpread: {:.1}x (slowest / fastest)",
                slow.duration().as_secs_f64() / fast_secs
            );
        }
    }

    if failures == 0 {
        ExitCode::SUCCESS
    } else {
        println!("\n{failures}/{runs} runs failed");
        ExitCode::FAILURE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_case() {
        let case = parse_case("rwlock-fair:50:50", 1000).unwrap();
        assert_eq!(case.strategy(), StrategyKind::ReadWriteFair);
        assert_eq!(case.writer_threads(), 50);
        assert_eq!(case.reader_threads(), 50);
        assert_eq!(case.loop_budget(), 1000);
    }

    #[test]
    fn test_parse_case_rejects_malformed() {
        assert!(parse_case("stamped:1", 10).is_err());
        assert!(parse_case("stamped:1:2:3", 10).is_err());
        assert!(parse_case("spinlock:1:1", 10).is_err());
        assert!(parse_case("mutex:x:1", 10).is_err());
    }
}
