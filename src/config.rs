//! Benchmark tunables.
//!
//! These are startup constants, not per-case knobs: one [`BenchConfig`] drives
//! a whole sweep. Defaults come from [`BenchConfig::default`]; the bootstrap
//! binaries call [`BenchConfig::from_env`] so a run can be rescaled without a
//! rebuild.
//!
//! | Variable | Field | Default |
//! |----------|-------|---------|
//! | `LOCKBENCH_LOOP_BUDGET` | `loop_budget` | 10,000,000 |
//! | `LOCKBENCH_FAIRNESS_DIVISOR` | `fairness_scaling_factor` | 100 |
//! | `LOCKBENCH_CASE_TIMEOUT_SECS` | `case_timeout` | 120 s |
//! | `LOCKBENCH_COOLDOWN_MS` | `cooldown_pause` | 100 ms |
//! | `LOCKBENCH_MAP_WINDOW` | `map_window` | 65,536 |

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::error::BenchError;

/// Total operations per role per case, before fairness scaling.
pub const DEFAULT_LOOP_BUDGET: u64 = 10_000_000;

/// Divisor applied to the loop budget for the two fair strategies.
pub const DEFAULT_FAIRNESS_SCALING_FACTOR: u64 = 100;

/// Upper bound on how long one case may run.
pub const DEFAULT_CASE_TIMEOUT: Duration = Duration::from_secs(120);

/// Pause taken by the default cooldown before each case.
pub const DEFAULT_COOLDOWN_PAUSE: Duration = Duration::from_millis(100);

/// Number of most recent map entries kept in [`SharedState`](crate::SharedState).
pub const DEFAULT_MAP_WINDOW: u64 = 1 << 16;

/// Configuration for one benchmark sweep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BenchConfig {
    /// Operations per role per case, split across that role's threads.
    pub loop_budget: u64,

    /// Fair strategies run `loop_budget / fairness_scaling_factor` operations.
    /// Must be at least 1.
    pub fairness_scaling_factor: u64,

    /// A case whose workers have not all finished by then is a liveness failure.
    pub case_timeout: Duration,

    /// Pause between cases.
    pub cooldown_pause: Duration,

    /// Map entries retained by the shared state. Must be at least 1.
    pub map_window: u64,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            loop_budget: DEFAULT_LOOP_BUDGET,
            fairness_scaling_factor: DEFAULT_FAIRNESS_SCALING_FACTOR,
            case_timeout: DEFAULT_CASE_TIMEOUT,
            cooldown_pause: DEFAULT_COOLDOWN_PAUSE,
            map_window: DEFAULT_MAP_WINDOW,
        }
    }
}

impl BenchConfig {
    /// Build a config from the defaults overridden by `LOCKBENCH_*` variables.
    ///
    /// # Errors
    /// [`BenchError::InvalidSetting`] if a variable does not parse or the
    /// resulting config fails [`validate`](Self::validate).
    pub fn from_env() -> Result<Self, BenchError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Like [`from_env`](Self::from_env) but reading from an arbitrary source.
    ///
    /// # Errors
    /// Same as [`from_env`](Self::from_env).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, BenchError>
    where
        F: Fn(&'static str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(budget) = parse_var(&lookup, "LOCKBENCH_LOOP_BUDGET")? {
            config.loop_budget = budget;
        }
        if let Some(divisor) = parse_var(&lookup, "LOCKBENCH_FAIRNESS_DIVISOR")? {
            config.fairness_scaling_factor = divisor;
        }
        if let Some(secs) = parse_var(&lookup, "LOCKBENCH_CASE_TIMEOUT_SECS")? {
            config.case_timeout = Duration::from_secs(secs);
        }
        if let Some(ms) = parse_var(&lookup, "LOCKBENCH_COOLDOWN_MS")? {
            config.cooldown_pause = Duration::from_millis(ms);
        }
        if let Some(window) = parse_var(&lookup, "LOCKBENCH_MAP_WINDOW")? {
            config.map_window = window;
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject values the runner cannot work with.
    ///
    /// # Errors
    /// [`BenchError::InvalidSetting`] naming the first offending field.
    pub fn validate(&self) -> Result<(), BenchError> {
        if self.fairness_scaling_factor == 0 {
            return Err(invalid("LOCKBENCH_FAIRNESS_DIVISOR", "0", "must be at least 1"));
        }
        if self.map_window == 0 {
            return Err(invalid("LOCKBENCH_MAP_WINDOW", "0", "must be at least 1"));
        }
        if self.case_timeout.is_zero() {
            return Err(invalid("LOCKBENCH_CASE_TIMEOUT_SECS", "0", "must be non-zero"));
        }
        Ok(())
    }
}

fn invalid(name: &'static str, value: &str, reason: &'static str) -> BenchError {
    BenchError::InvalidSetting {
        name,
        value: value.to_string(),
        reason,
    }
}

fn parse_var<F, T>(lookup: &F, name: &'static str) -> Result<Option<T>, BenchError>
where
    F: Fn(&'static str) -> Option<String>,
    T: FromStr,
{
    let Some(raw) = lookup(name) else {
        return Ok(None);
    };

    raw.trim()
        .replace('_', "")
        .parse()
        .map(Some)
        .map_err(|_| invalid(name, &raw, "not a non-negative integer"))
}
