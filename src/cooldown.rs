//! Between-case cooldown hook.
//!
//! Running cases back to back lets one case's leftovers (allocator state,
//! cache contents, threads still being torn down) bleed into the next case's
//! timing. The sweep calls a [`Cooldown`] before every case. It has no bearing
//! on correctness.

use std::thread;
use std::time::Duration;

/// Hook invoked before each case.
pub trait Cooldown {
    /// Settle the process before the next measurement.
    fn cool_down(&self);
}

/// Sleep for a fixed pause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PauseCooldown {
    pause: Duration,
}

impl PauseCooldown {
    /// Pause for `pause` before each case.
    #[must_use]
    pub const fn new(pause: Duration) -> Self {
        Self { pause }
    }
}

impl Cooldown for PauseCooldown {
    fn cool_down(&self) {
        if !self.pause.is_zero() {
            thread::sleep(self.pause);
        }
    }
}

/// Do nothing. For tests and quick sweeps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoCooldown;

impl Cooldown for NoCooldown {
    fn cool_down(&self) {}
}

impl<F: Fn()> Cooldown for F {
    fn cool_down(&self) {
        self();
    }
}
