//! Shared helpers for the integration tests.
//!
//! ```rust,ignore
//! mod common;
//!
//! #[test]
//! fn my_test() {
//!     common::init_tracing();
//!     let report = lockbench::run_with(&matrix, &common::runner(10_000), &NoCooldown);
//! }
//! ```
//!
//! # Logging
//!
//! - `RUST_LOG`: filter directives (default `lockbench=warn`)
//! - `LOCKBENCH_LOG_DIR`: directory for `lockbench.jsonl` (default `logs/`)
//! - `LOCKBENCH_LOG_CONSOLE`: set to "0" to silence console output
//!
//! The file is appended to as NDJSON, one event per line:
//!
//! ```bash
//! jq 'select(.level == "ERROR")' logs/lockbench.jsonl
//! jq 'select(.fields.case | startswith("ReadWriteFair"))' logs/lockbench.jsonl
//! ```

#![allow(dead_code)]

use std::env;
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Once;
use std::time::Duration;

use lockbench::{BenchConfig, BenchmarkRunner};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

const DEFAULT_FILTER: &str = "lockbench=warn";

static INIT: Once = Once::new();

/// Install console and NDJSON file logging once per test binary.
pub fn init_tracing() {
    INIT.call_once(install_subscriber);
}

fn filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

fn install_subscriber() {
    let log_dir = env::var("LOCKBENCH_LOG_DIR").map_or_else(|_| PathBuf::from("logs"), PathBuf::from);
    let console = !env::var("LOCKBENCH_LOG_CONSOLE").is_ok_and(|v| v == "0");

    // Tests run in parallel processes under nextest, so append rather than truncate.
    let file = std::fs::create_dir_all(&log_dir).ok().and_then(|()| {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_dir.join("lockbench.jsonl"))
            .ok()
    });

    let file_layer = file.map(|file| {
        tracing_subscriber::fmt::layer()
            .with_writer(std::sync::Mutex::new(file))
            .with_thread_names(true)
            .with_target(true)
            .json()
            .with_filter(filter())
    });

    let console_layer = console.then(|| {
        tracing_subscriber::fmt::layer()
            .with_test_writer()
            .with_thread_names(true)
            .compact()
            .with_filter(filter())
    });

    let _ = Registry::default()
        .with(console_layer)
        .with(file_layer)
        .try_init();
}

/// A runner with no cooldown, a generous timeout and a small map window.
pub fn runner(loop_budget: u64) -> BenchmarkRunner {
    BenchmarkRunner::new(config(loop_budget))
}

/// Test configuration for `loop_budget` operations per role.
pub fn config(loop_budget: u64) -> BenchConfig {
    BenchConfig {
        loop_budget,
        fairness_scaling_factor: 10,
        case_timeout: Duration::from_secs(120),
        cooldown_pause: Duration::ZERO,
        map_window: 256,
    }
}
