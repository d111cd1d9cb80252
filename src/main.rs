//! Full benchmark sweep.
//!
//! Runs every strategy against every default thread pair once, then prints one
//! CSV row of millisecond durations per strategy (`-` marks a failed case).
//! Exits non-zero if any case failed.
//!
//! Run with:
//! ```bash
//! cargo run --release --features mimalloc
//!
//! # Quick sweep with progress logging
//! LOCKBENCH_LOOP_BUDGET=100_000 RUST_LOG=lockbench=info cargo run --release
//! ```

use std::process::ExitCode;

use lockbench::{BenchConfig, Report, TestMatrix};

#[cfg(feature = "mimalloc")]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[cfg(feature = "tracing")]
fn init_tracing() {
    use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("lockbench=info"));
    let console = tracing_subscriber::fmt::layer()
        .with_thread_names(true)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact();

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .try_init();
}

#[cfg(not(feature = "tracing"))]
const fn init_tracing() {}

fn print_csv(report: &Report) {
    for row in report.duration_groups() {
        let cells: Vec<String> = row
            .iter()
            .map(|ms| ms.map_or_else(|| "-".to_string(), |ms| ms.to_string()))
            .collect();
        println!("{}", cells.join(","));
    }
}

fn main() -> ExitCode {
    init_tracing();

    let config = match BenchConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("invalid configuration: {err}");
            return ExitCode::from(2);
        }
    };

    let matrix = TestMatrix::full(config.loop_budget);
    eprintln!(
        "lockbench: {} cases, budget {}, fairness divisor {}",
        matrix.len(),
        config.loop_budget,
        config.fairness_scaling_factor
    );

    let report = lockbench::run(&matrix, &config);
    print_csv(&report);

    if report.all_passed() {
        return ExitCode::SUCCESS;
    }

    eprintln!();
    for failure in report.failures() {
        eprintln!("FAILED: {failure}");
    }
    ExitCode::FAILURE
}
