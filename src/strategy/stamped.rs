//! Stamped lock with optimistic reads.
//!
//! [`StampedLock`] pairs an unfair `parking_lot::RwLock<()>` with a version
//! stamp. The stamp is even while no writer holds the lock; taking the write
//! lock makes it odd and releasing it makes it even again, so every completed
//! write advances the stamp by two.
//!
//! # Concurrency Model
//! 1. Readers: [`try_optimistic_read`](StampedLock::try_optimistic_read), read
//!    the payload (atomic loads only), then [`validate`](StampedLock::validate).
//!    On `None` or a failed validation, take [`read_lock`](StampedLock::read_lock)
//!    and read again.
//! 2. Writers: [`write_lock`](StampedLock::write_lock), modify, drop the guard.
//!
//! This is the seqlock protocol: the writer's odd store is followed by a
//! release fence so payload stores cannot be observed before it, and the
//! reader's acquire fence keeps payload loads from drifting past the second
//! stamp load.

use std::sync::atomic::{AtomicU64, Ordering, fence};

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Low bit of the stamp: set while a writer holds the lock.
const WRITE_BIT: u64 = 1;

/// An unfair reader-writer lock with optimistic, validated reads.
#[derive(Debug, Default)]
pub struct StampedLock {
    stamp: AtomicU64,
    lock: RwLock<()>,
}

/// Exclusive access. Advances the stamp to the next even value on drop.
#[derive(Debug)]
#[must_use = "the lock is released as soon as the guard drops"]
pub struct StampedWriteGuard<'a> {
    stamp: &'a AtomicU64,
    locked_stamp: u64,
    _guard: RwLockWriteGuard<'a, ()>,
}

/// Blocking shared access used when an optimistic read cannot be trusted.
#[derive(Debug)]
#[must_use = "the lock is released as soon as the guard drops"]
pub struct StampedReadGuard<'a> {
    _guard: RwLockReadGuard<'a, ()>,
}

impl Drop for StampedWriteGuard<'_> {
    fn drop(&mut self) {
        // Runs before `_guard` drops, so the stamp is even again before any
        // reader can take the shared lock.
        self.stamp
            .store(self.locked_stamp + WRITE_BIT, Ordering::Release);
    }
}

impl StampedWriteGuard<'_> {
    /// The odd stamp this writer installed.
    #[inline]
    #[must_use]
    pub const fn locked_stamp(&self) -> u64 {
        self.locked_stamp
    }
}

impl StampedLock {
    /// Create an unlocked lock with stamp zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current stamp.
    #[inline]
    #[must_use]
    pub fn stamp(&self) -> u64 {
        self.stamp.load(Ordering::Acquire)
    }

    /// Whether a writer currently holds the lock.
    #[inline]
    #[must_use]
    pub fn is_write_locked(&self) -> bool {
        self.stamp() & WRITE_BIT != 0
    }

    /// Start an optimistic read. Never blocks.
    ///
    /// # Returns
    /// `Some(stamp)` to validate after reading, or `None` if a writer holds the
    /// lock (an optimistic read would certainly fail).
    #[inline]
    #[must_use]
    pub fn try_optimistic_read(&self) -> Option<u64> {
        let stamp: u64 = self.stamp.load(Ordering::Acquire);
        (stamp & WRITE_BIT == 0).then_some(stamp)
    }

    /// Whether no write started since `stamp` was handed out.
    ///
    /// Payload loads performed before this call are ordered before the stamp
    /// re-check.
    #[inline]
    #[must_use]
    pub fn validate(&self, stamp: u64) -> bool {
        fence(Ordering::Acquire);
        self.stamp.load(Ordering::Relaxed) == stamp
    }

    /// Blocking shared access. Excludes writers, admits other readers.
    pub fn read_lock(&self) -> StampedReadGuard<'_> {
        StampedReadGuard {
            _guard: self.lock.read(),
        }
    }

    /// Exclusive access. Marks the stamp odd until the guard drops.
    pub fn write_lock(&self) -> StampedWriteGuard<'_> {
        let guard = self.lock.write();

        // INVARIANT: exclusive lock held, no concurrent stamp writers.
        let locked_stamp: u64 = self.stamp.load(Ordering::Relaxed) + WRITE_BIT;
        self.stamp.store(locked_stamp, Ordering::Relaxed);
        fence(Ordering::Release);

        StampedWriteGuard {
            stamp: &self.stamp,
            locked_stamp,
            _guard: guard,
        }
    }
}
