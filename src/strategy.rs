//! Lock strategies under test.
//!
//! [`LockStrategy`] is a tagged variant owning its primitive. A fresh value is
//! built per case by [`LockStrategy::new`], so nothing about one case's lock
//! (queue, stamp, poisoned state) can leak into the next.
//!
//! # Contract
//! - [`begin_read`](LockStrategy::begin_read) / [`end_read`](LockStrategy::end_read)
//!   bracket a shared-access section. Exclusive kinds make this fully exclusive.
//! - [`begin_write`](LockStrategy::begin_write) / [`end_write`](LockStrategy::end_write)
//!   bracket an exclusive section; everything done inside appears atomic to readers.
//! - [`try_optimistic_read`](LockStrategy::try_optimistic_read) /
//!   [`validate`](LockStrategy::validate) implement the non-blocking read for
//!   [`StrategyKind::OptimisticStamped`]; every other kind returns `None`.
//!
//! Access values are RAII guards: dropping one ends the section, the `end_*`
//! methods just make the bracket explicit at the call site.
//!
//! | Kind | Read | Write | Order |
//! |------|------|-------|-------|
//! | `ExclusiveMutex` | exclusive | exclusive | unspecified |
//! | `ReentrantUnfair` | exclusive | reentrant exclusive | unspecified |
//! | `ReentrantFair` | exclusive | reentrant exclusive | FIFO |
//! | `ReadWriteUnfair` | shared | exclusive | unspecified |
//! | `ReadWriteFair` | shared | exclusive | FIFO |
//! | `OptimisticStamped` | optimistic, shared fallback | exclusive | unfair |

pub mod fair_mutex;
pub mod fair_rwlock;
pub(crate) mod fifo;
pub mod stamped;




use std::fmt as StdFmt;
use std::str::FromStr;

use parking_lot::{
    Mutex, MutexGuard, ReentrantMutex, ReentrantMutexGuard, RwLock, RwLockReadGuard,
    RwLockWriteGuard,
};

pub use fair_mutex::{FairReentrantGuard, FairReentrantMutex};
pub use fair_rwlock::{FairReadGuard, FairRwLock, FairWriteGuard};
pub use stamped::{StampedLock, StampedReadGuard, StampedWriteGuard};

// ============================================================================
//  StrategyKind
// ============================================================================

/// Which synchronization discipline a case measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StrategyKind {
    /// Plain mutex; reads and writes are equally exclusive.
    ExclusiveMutex,
    /// Reentrant mutex, unspecified hand-off order.
    ReentrantUnfair,
    /// Reentrant mutex, strict FIFO.
    ReentrantFair,
    /// Reader-writer lock, starvation permitted.
    ReadWriteUnfair,
    /// Reader-writer lock, strict FIFO across readers and writers.
    ReadWriteFair,
    /// Optimistic stamped reads with shared-lock fallback.
    OptimisticStamped,
}

impl StrategyKind {
    /// Every kind, in sweep order.
    pub const ALL: [Self; 6] = [
        Self::ExclusiveMutex,
        Self::ReentrantUnfair,
        Self::ReentrantFair,
        Self::ReadWriteUnfair,
        Self::ReadWriteFair,
        Self::OptimisticStamped,
    ];

    /// Fair kinds run a scaled-down loop budget.
    #[inline]
    #[must_use]
    pub const fn is_fair(self) -> bool {
        matches!(self, Self::ReentrantFair | Self::ReadWriteFair)
    }

    /// Whether readers may share access with each other.
    #[inline]
    #[must_use]
    pub const fn allows_shared_reads(self) -> bool {
        matches!(
            self,
            Self::ReadWriteUnfair | Self::ReadWriteFair | Self::OptimisticStamped
        )
    }

    /// Whether readers try a lock-free validated read first.
    #[inline]
    #[must_use]
    pub const fn is_optimistic(self) -> bool {
        matches!(self, Self::OptimisticStamped)
    }

    /// Short, stable identifier (used for parsing and thread names).
    #[must_use]
    pub const fn slug(self) -> &'static str {
        match self {
            Self::ExclusiveMutex => "mutex",
            Self::ReentrantUnfair => "reentrant",
            Self::ReentrantFair => "reentrant-fair",
            Self::ReadWriteUnfair => "rwlock",
            Self::ReadWriteFair => "rwlock-fair",
            Self::OptimisticStamped => "stamped",
        }
    }
}

impl StdFmt::Display for StrategyKind {
    fn fmt(&self, f: &mut StdFmt::Formatter<'_>) -> StdFmt::Result {
        StdFmt::Debug::fmt(self, f)
    }
}

/// Unrecognized strategy name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown strategy {0:?} (expected one of: mutex, reentrant, reentrant-fair, rwlock, rwlock-fair, stamped)")]
pub struct UnknownStrategy(pub String);

impl FromStr for StrategyKind {
    type Err = UnknownStrategy;

    /// Accepts the [`slug`](Self::slug) or the variant name, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|kind| {
                kind.slug().eq_ignore_ascii_case(wanted)
                    || kind.to_string().eq_ignore_ascii_case(wanted)
            })
            .ok_or_else(|| UnknownStrategy(wanted.to_string()))
    }
}

// ============================================================================
//  Access guards
// ============================================================================

/// An open read section. Ends on drop.
#[derive(Debug)]
#[must_use = "the read section ends as soon as the access drops"]
pub enum ReadAccess<'a> {
    /// Held the mutex.
    Mutex(MutexGuard<'a, ()>),
    /// Held the unfair reentrant mutex.
    Reentrant(ReentrantMutexGuard<'a, ()>),
    /// Held the FIFO reentrant mutex.
    FairReentrant(FairReentrantGuard<'a>),
    /// Shared hold of the unfair reader-writer lock.
    Shared(RwLockReadGuard<'a, ()>),
    /// Shared hold of the FIFO reader-writer lock.
    FairShared(FairReadGuard<'a>),
    /// Shared hold of the stamped lock (optimistic fallback).
    Stamped(StampedReadGuard<'a>),
}

/// An open write section. Ends on drop.
#[derive(Debug)]
#[must_use = "the write section ends as soon as the access drops"]
pub enum WriteAccess<'a> {
    /// Held the mutex.
    Mutex(MutexGuard<'a, ()>),
    /// Held the unfair reentrant mutex.
    Reentrant(ReentrantMutexGuard<'a, ()>),
    /// Held the FIFO reentrant mutex.
    FairReentrant(FairReentrantGuard<'a>),
    /// Exclusive hold of the unfair reader-writer lock.
    Exclusive(RwLockWriteGuard<'a, ()>),
    /// Exclusive hold of the FIFO reader-writer lock.
    FairExclusive(FairWriteGuard<'a>),
    /// Exclusive hold of the stamped lock; bumps the stamp on drop.
    Stamped(StampedWriteGuard<'a>),
}

// ============================================================================
//  LockStrategy
// ============================================================================

/// One synchronization discipline, owning its primitive.
#[derive(Debug)]
pub enum LockStrategy {
    /// See [`StrategyKind::ExclusiveMutex`].
    ExclusiveMutex(Mutex<()>),
    /// See [`StrategyKind::ReentrantUnfair`].
    ReentrantUnfair(ReentrantMutex<()>),
    /// See [`StrategyKind::ReentrantFair`].
    ReentrantFair(FairReentrantMutex),
    /// See [`StrategyKind::ReadWriteUnfair`].
    ReadWriteUnfair(RwLock<()>),
    /// See [`StrategyKind::ReadWriteFair`].
    ReadWriteFair(FairRwLock),
    /// See [`StrategyKind::OptimisticStamped`].
    OptimisticStamped(StampedLock),
}

impl LockStrategy {
    /// Build a fresh, unlocked strategy of the given kind.
    #[must_use]
    pub fn new(kind: StrategyKind) -> Self {
        match kind {
            StrategyKind::ExclusiveMutex => Self::ExclusiveMutex(Mutex::new(())),
            StrategyKind::ReentrantUnfair => Self::ReentrantUnfair(ReentrantMutex::new(())),
            StrategyKind::ReentrantFair => Self::ReentrantFair(FairReentrantMutex::new()),
            StrategyKind::ReadWriteUnfair => Self::ReadWriteUnfair(RwLock::new(())),
            StrategyKind::ReadWriteFair => Self::ReadWriteFair(FairRwLock::new()),
            StrategyKind::OptimisticStamped => Self::OptimisticStamped(StampedLock::new()),
        }
    }

    /// The kind this strategy was built from.
    #[must_use]
    pub const fn kind(&self) -> StrategyKind {
        match self {
            Self::ExclusiveMutex(_) => StrategyKind::ExclusiveMutex,
            Self::ReentrantUnfair(_) => StrategyKind::ReentrantUnfair,
            Self::ReentrantFair(_) => StrategyKind::ReentrantFair,
            Self::ReadWriteUnfair(_) => StrategyKind::ReadWriteUnfair,
            Self::ReadWriteFair(_) => StrategyKind::ReadWriteFair,
            Self::OptimisticStamped(_) => StrategyKind::OptimisticStamped,
        }
    }

    /// Open a read section, blocking until access is granted.
    ///
    /// For the stamped kind this is the fallback shared read.
    #[inline]
    pub fn begin_read(&self) -> ReadAccess<'_> {
        match self {
            Self::ExclusiveMutex(lock) => ReadAccess::Mutex(lock.lock()),
            Self::ReentrantUnfair(lock) => ReadAccess::Reentrant(lock.lock()),
            Self::ReentrantFair(lock) => ReadAccess::FairReentrant(lock.lock()),
            Self::ReadWriteUnfair(lock) => ReadAccess::Shared(lock.read()),
            Self::ReadWriteFair(lock) => ReadAccess::FairShared(lock.read()),
            Self::OptimisticStamped(lock) => ReadAccess::Stamped(lock.read_lock()),
        }
    }

    /// Close a read section.
    #[inline]
    pub fn end_read(&self, access: ReadAccess<'_>) {
        drop(access);
    }

    /// Open a write section, blocking until exclusive access is granted.
    #[inline]
    pub fn begin_write(&self) -> WriteAccess<'_> {
        match self {
            Self::ExclusiveMutex(lock) => WriteAccess::Mutex(lock.lock()),
            Self::ReentrantUnfair(lock) => WriteAccess::Reentrant(lock.lock()),
            Self::ReentrantFair(lock) => WriteAccess::FairReentrant(lock.lock()),
            Self::ReadWriteUnfair(lock) => WriteAccess::Exclusive(lock.write()),
            Self::ReadWriteFair(lock) => WriteAccess::FairExclusive(lock.write()),
            Self::OptimisticStamped(lock) => WriteAccess::Stamped(lock.write_lock()),
        }
    }

    /// Close a write section.
    #[inline]
    pub fn end_write(&self, access: WriteAccess<'_>) {
        drop(access);
    }

    /// Start a lock-free read.
    ///
    /// # Returns
    /// A stamp to [`validate`](Self::validate) after reading, or `None` when
    /// the strategy has no optimistic mode or a writer currently holds it.
    #[inline]
    #[must_use]
    pub fn try_optimistic_read(&self) -> Option<u64> {
        match self {
            Self::OptimisticStamped(lock) => lock.try_optimistic_read(),
            _ => None,
        }
    }

    /// Whether an optimistic read started at `stamp` saw no concurrent write.
    ///
    /// Always `false` for strategies without an optimistic mode.
    #[inline]
    #[must_use]
    pub fn validate(&self, stamp: u64) -> bool {
        match self {
            Self::OptimisticStamped(lock) => lock.validate(stamp),
            _ => false,
        }
    }

    /// Threads queued for the lock, for the FIFO kinds only.
    #[must_use]
    pub fn queue_length(&self) -> Option<usize> {
        match self {
            Self::ReentrantFair(lock) => Some(lock.queue_length()),
            Self::ReadWriteFair(lock) => Some(lock.queue_length()),
            _ => None,
        }
    }
}

impl From<StrategyKind> for LockStrategy {
    fn from(kind: StrategyKind) -> Self {
        Self::new(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factory_round_trips_kind() {
        for kind in StrategyKind::ALL {
            assert_eq!(LockStrategy::new(kind).kind(), kind);
        }
    }

    #[test]
    fn test_fair_kinds() {
        let fair: Vec<_> = StrategyKind::ALL
            .into_iter()
            .filter(|kind| kind.is_fair())
            .collect();
        assert_eq!(
            fair,
            vec![StrategyKind::ReentrantFair, StrategyKind::ReadWriteFair]
        );
    }

    #[test]
    fn test_parse_slug_and_name() {
        assert_eq!(
            "rwlock-fair".parse::<StrategyKind>(),
            Ok(StrategyKind::ReadWriteFair)
        );
        assert_eq!(
            "OptimisticStamped".parse::<StrategyKind>(),
            Ok(StrategyKind::OptimisticStamped)
        );
        assert_eq!(
            " MUTEX ".parse::<StrategyKind>(),
            Ok(StrategyKind::ExclusiveMutex)
        );
        assert!("spinlock".parse::<StrategyKind>().is_err());
    }

    #[test]
    fn test_only_stamped_reads_optimistically() {
        for kind in StrategyKind::ALL {
            let strategy = LockStrategy::new(kind);
            let stamp = strategy.try_optimistic_read();
            assert_eq!(stamp.is_some(), kind.is_optimistic(), "{kind}");
            if let Some(stamp) = stamp {
                assert!(strategy.validate(stamp));
            }
        }
    }

    #[test]
    fn test_write_invalidates_optimistic_stamp() {
        let strategy = LockStrategy::new(StrategyKind::OptimisticStamped);
        let stamp = strategy.try_optimistic_read().unwrap();

        let access = strategy.begin_write();
        assert_eq!(strategy.try_optimistic_read(), None);
        strategy.end_write(access);

        assert!(!strategy.validate(stamp));
    }

    #[test]
    fn test_sections_release_for_every_kind() {
        for kind in StrategyKind::ALL {
            let strategy = LockStrategy::new(kind);
            for _ in 0..3 {
                let access = strategy.begin_write();
                strategy.end_write(access);
                let access = strategy.begin_read();
                strategy.end_read(access);
            }
        }
    }

    #[test]
    fn test_shared_kinds_admit_two_readers() {
        for kind in StrategyKind::ALL
            .into_iter()
            .filter(|kind| kind.allows_shared_reads())
        {
            let strategy = LockStrategy::new(kind);
            let first = strategy.begin_read();
            let second = strategy.begin_read();
            strategy.end_read(second);
            strategy.end_read(first);
        }
    }

    #[test]
    fn test_reentrant_kinds_nest_writes() {
        for kind in [StrategyKind::ReentrantUnfair, StrategyKind::ReentrantFair] {
            let strategy = LockStrategy::new(kind);
            let outer = strategy.begin_write();
            let inner = strategy.begin_write();
            strategy.end_write(inner);
            strategy.end_write(outer);
        }
    }
}
