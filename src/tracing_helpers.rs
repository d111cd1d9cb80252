//! Zero-cost logging helpers.
//!
//! With the `tracing` feature (on by default) these macros forward to the
//! `tracing` crate. Without it they expand to nothing, so a build without
//! logging measures the locks and nothing else.
//!
//! ```bash
//! # Per-case progress lines
//! RUST_LOG=lockbench=info cargo run --release
//!
//! # Worker anomalies and gate transitions as well
//! RUST_LOG=lockbench=debug cargo test --features tracing runner
//!
//! # No logging code compiled in at all
//! cargo run --release --no-default-features
//! ```
//!
//! Arguments are never evaluated when the feature is off, so callers must not
//! rely on side effects inside a log statement.

#![allow(unused_macros, unused_imports)]

/// Debug-level logging. Compiles to no-op without `tracing` feature.
#[cfg(feature = "tracing")]
macro_rules! debug_log {
    ($($arg:tt)*) => {
        tracing::debug!($($arg)*)
    };
}

#[cfg(not(feature = "tracing"))]
macro_rules! debug_log {
    ($($arg:tt)*) => {};
}

/// Info-level logging, used for per-case progress lines.
#[cfg(feature = "tracing")]
macro_rules! info_log {
    ($($arg:tt)*) => {
        tracing::info!($($arg)*)
    };
}

#[cfg(not(feature = "tracing"))]
macro_rules! info_log {
    ($($arg:tt)*) => {};
}

/// Warn-level logging. Compiles to no-op without `tracing` feature.
#[cfg(feature = "tracing")]
macro_rules! warn_log {
    ($($arg:tt)*) => {
        tracing::warn!($($arg)*)
    };
}

#[cfg(not(feature = "tracing"))]
macro_rules! warn_log {
    ($($arg:tt)*) => {};
}

/// Error-level logging. Compiles to no-op without `tracing` feature.
#[cfg(feature = "tracing")]
macro_rules! error_log {
    ($($arg:tt)*) => {
        tracing::error!($($arg)*)
    };
}

#[cfg(not(feature = "tracing"))]
macro_rules! error_log {
    ($($arg:tt)*) => {};
}

pub(crate) use debug_log;
pub(crate) use error_log;
pub(crate) use info_log;
pub(crate) use warn_log;
