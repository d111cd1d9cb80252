//! Failure taxonomy for benchmark cases and configuration.

use std::io;
use std::time::Duration;

use crate::matrix::TestCase;

/// Why a case (or the configuration feeding it) failed.
///
/// Every case-level variant carries the offending [`TestCase`], whose
/// `Display` names the `(strategy, writers, readers)` tuple.
#[derive(Debug, thiserror::Error)]
pub enum BenchError {
    /// The finish counter did not reach zero before the case timeout.
    #[error("liveness failure in {case}: {outstanding} worker(s) unfinished after {timeout:?}")]
    LivenessFailure {
        /// The case that timed out.
        case: TestCase,
        /// Workers that never signalled completion.
        outstanding: usize,
        /// The timeout that elapsed.
        timeout: Duration,
    },

    /// The final counter did not match the number of writer operations.
    #[error("correctness failure in {case}: counter is {actual}, expected {expected}")]
    CorrectnessFailure {
        /// The case whose writers lost or duplicated updates.
        case: TestCase,
        /// Counter value observed after all workers finished.
        actual: u64,
        /// Total writer operations performed.
        expected: u64,
    },

    /// A case with neither readers nor writers.
    #[error("invalid configuration {case}: at least one reader or writer thread is required")]
    InvalidConfiguration {
        /// The rejected case.
        case: TestCase,
    },

    /// A worker's start-gate wait was cut short before measured work began.
    #[error("start gate abandoned before the gate opened")]
    InterruptedWait,

    /// A worker stopped mid-loop because its case had already failed.
    #[error("worker stopped after its case was abandoned")]
    Aborted,

    /// The OS refused to spawn a worker thread.
    #[error("failed to spawn worker for {case}: {source}")]
    Spawn {
        /// The case being scheduled.
        case: TestCase,
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },

    /// A configuration value could not be parsed or is out of range.
    #[error("invalid setting {name}={value:?}: {reason}")]
    InvalidSetting {
        /// Setting (environment variable) name.
        name: &'static str,
        /// Raw value supplied.
        value: String,
        /// What is wrong with it.
        reason: &'static str,
    },
}

impl BenchError {
    /// The case this error belongs to, if it is a case-level failure.
    #[must_use]
    pub const fn case(&self) -> Option<&TestCase> {
        match self {
            Self::LivenessFailure { case, .. }
            | Self::CorrectnessFailure { case, .. }
            | Self::InvalidConfiguration { case }
            | Self::Spawn { case, .. } => Some(case),
            Self::InterruptedWait | Self::Aborted | Self::InvalidSetting { .. } => None,
        }
    }
}
