//! The resource under contention.
//!
//! [`SharedState`] deliberately carries no lock of its own: the strategy under
//! test is the only thing standing between writers and readers. The counter and
//! the `published` key are atomics so the optimistic read path can load them
//! without a lock and without a data race; the map is plain memory and may only
//! be touched while the guarding strategy grants access.
//!
//! # Write protocol
//! 1. `counter += 1`
//! 2. insert `counter -> "v{counter}"`, evicting the entry that fell out of the window
//! 3. `published = counter`
//!
//! A reader that sees `counter != published` has observed a half-applied write.

use std::cell::UnsafeCell;
use std::collections::HashMap;
use std::fmt::Write as _;
use std::hint::black_box;
use std::sync::atomic::{AtomicU64, Ordering};

use smartstring::alias::String as InlineString;

/// What a reader observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Snapshot {
    /// Counter value.
    pub counter: u64,
    /// Key of the most recent map insert.
    pub published: u64,
}

impl Snapshot {
    /// A snapshot is consistent when it reflects a completed write (or none).
    #[inline]
    #[must_use]
    pub const fn is_consistent(&self) -> bool {
        self.counter == self.published
    }
}

/// Counter plus keyed map, mutated only under the strategy's write access.
#[derive(Debug)]
pub struct SharedState {
    counter: AtomicU64,
    published: AtomicU64,
    entries: UnsafeCell<HashMap<u64, InlineString>>,
    window: u64,
}

// SAFETY: `counter` and `published` are atomics. `entries` is only reachable
// through the unsafe methods below, whose contracts require the caller to hold
// write access (for mutation) or at least read access (for lookup) from the
// lock strategy guarding this state.
unsafe impl Sync for SharedState {}

impl SharedState {
    /// Create an empty state retaining at most `window` map entries.
    ///
    /// A `window` of zero is treated as one.
    #[must_use]
    pub fn new(window: u64) -> Self {
        let window = window.max(1);
        let capacity = usize::try_from(window).unwrap_or(usize::MAX).min(1 << 16);

        Self {
            counter: AtomicU64::new(0),
            published: AtomicU64::new(0),
            entries: UnsafeCell::new(HashMap::with_capacity(capacity)),
            window,
        }
    }

    /// Current counter value.
    #[inline]
    #[must_use]
    pub fn counter(&self) -> u64 {
        self.counter.load(Ordering::Relaxed)
    }

    /// Load counter and published key without any lock.
    ///
    /// Safe to call at any time; the result is only meaningful after the
    /// caller validates it (optimistic read) or holds read access.
    #[inline]
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            counter: self.counter.load(Ordering::Relaxed),
            published: self.published.load(Ordering::Relaxed),
        }
    }

    /// Apply one write: bump the counter, insert the derived entry, publish.
    ///
    /// Returns the new counter value.
    ///
    /// # Safety
    /// The caller must hold exclusive write access from the lock strategy that
    /// guards this state for the whole call.
    pub unsafe fn apply_write(&self) -> u64 {
        let next: u64 = self.counter.load(Ordering::Relaxed) + 1;
        self.counter.store(next, Ordering::Relaxed);

        // SAFETY: exclusive access per the caller's contract.
        let entries: &mut HashMap<u64, InlineString> = unsafe { &mut *self.entries.get() };
        entries.insert(next, derive_value(next));
        if next > self.window {
            entries.remove(&(next - self.window));
        }

        self.published.store(next, Ordering::Relaxed);
        next
    }

    /// Read the snapshot and look up its entry.
    ///
    /// The lookup result is discarded through [`black_box`]: it models the cost
    /// of real read work rather than producing a value anyone consumes.
    ///
    /// # Safety
    /// The caller must hold read (or write) access from the lock strategy that
    /// guards this state for the whole call.
    pub unsafe fn read_locked(&self) -> Snapshot {
        let snapshot: Snapshot = self.snapshot();

        // SAFETY: no writer can run while the caller holds access.
        let entries: &HashMap<u64, InlineString> = unsafe { &*self.entries.get() };
        black_box(entries.get(&snapshot.published).map(InlineString::len));

        snapshot
    }

    /// Number of retained map entries.
    ///
    /// # Safety
    /// Same contract as [`read_locked`](Self::read_locked).
    #[must_use]
    pub unsafe fn entry_count(&self) -> usize {
        // SAFETY: caller holds access.
        unsafe { (*self.entries.get()).len() }
    }

    /// Look up the value stored under `key`.
    ///
    /// # Safety
    /// Same contract as [`read_locked`](Self::read_locked).
    #[must_use]
    pub unsafe fn entry(&self, key: u64) -> Option<InlineString> {
        // SAFETY: caller holds access.
        unsafe { (*self.entries.get()).get(&key).cloned() }
    }
}

impl Default for SharedState {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_MAP_WINDOW)
    }
}

/// Value stored for `key`. Short enough to stay inline.
fn derive_value(key: u64) -> InlineString {
    let mut value = InlineString::new();
    // Writing into a SmartString cannot fail.
    let _ = write!(value, "v{key}");
    value
}
