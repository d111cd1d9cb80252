//! Test cases and the sweep that generates them.

use std::fmt as StdFmt;
use std::time::Duration;

use crate::strategy::StrategyKind;

/// `(writer_threads, reader_threads)` pairs swept for every strategy.
///
/// Single-role scaling first, then balanced contention up to 2000 + 2000
/// threads, then skewed mixes.
pub const DEFAULT_THREAD_PAIRS: [(usize, usize); 20] = [
    (1, 0),
    (10, 0),
    (100, 0),
    (0, 1),
    (0, 10),
    (0, 100),
    (1, 1),
    (10, 10),
    (20, 20),
    (50, 50),
    (100, 100),
    (200, 200),
    (500, 500),
    (1000, 1000),
    (1500, 1500),
    (2000, 2000),
    (10, 1),
    (100, 10),
    (1, 10),
    (1, 100),
];

// ============================================================================
//  TestCase
// ============================================================================

/// One benchmark configuration.
///
/// Everything but the duration is fixed at construction; the duration is
/// recorded once, and only when the case succeeds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCase {
    strategy: StrategyKind,
    writer_threads: usize,
    reader_threads: usize,
    loop_budget: u64,
    duration: Option<Duration>,
}

impl TestCase {
    /// A case that has not run yet.
    #[must_use]
    pub const fn new(
        strategy: StrategyKind,
        writer_threads: usize,
        reader_threads: usize,
        loop_budget: u64,
    ) -> Self {
        Self {
            strategy,
            writer_threads,
            reader_threads,
            loop_budget,
            duration: None,
        }
    }

    /// Strategy under test.
    #[inline]
    #[must_use]
    pub const fn strategy(&self) -> StrategyKind {
        self.strategy
    }

    /// Writer thread count.
    #[inline]
    #[must_use]
    pub const fn writer_threads(&self) -> usize {
        self.writer_threads
    }

    /// Reader thread count.
    #[inline]
    #[must_use]
    pub const fn reader_threads(&self) -> usize {
        self.reader_threads
    }

    /// Configured loop budget, before fairness scaling.
    #[inline]
    #[must_use]
    pub const fn loop_budget(&self) -> u64 {
        self.loop_budget
    }

    /// Measured wall time, if the case has completed successfully.
    #[inline]
    #[must_use]
    pub const fn duration(&self) -> Option<Duration> {
        self.duration
    }

    /// Measured wall time in whole milliseconds.
    #[must_use]
    pub fn duration_ms(&self) -> Option<u64> {
        self.duration
            .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
    }

    /// Total worker threads.
    #[must_use]
    pub const fn total_threads(&self) -> usize {
        self.writer_threads + self.reader_threads
    }

    /// Record the measured duration. Only the first call takes effect.
    pub(crate) fn record_duration(&mut self, elapsed: Duration) {
        debug_assert!(self.duration.is_none(), "duration recorded twice for {self}");
        if self.duration.is_none() {
            self.duration = Some(elapsed);
        }
    }
}

impl StdFmt::Display for TestCase {
    fn fmt(&self, f: &mut StdFmt::Formatter<'_>) -> StdFmt::Result {
        write!(
            f,
            "{}(writers={}, readers={})",
            self.strategy, self.writer_threads, self.reader_threads
        )
    }
}

// ============================================================================
//  TestMatrix
// ============================================================================

/// The cartesian sweep of strategies x thread pairs, grouped by strategy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestMatrix {
    strategies: Vec<StrategyKind>,
    pairs: Vec<(usize, usize)>,
    loop_budget: u64,
}

impl TestMatrix {
    /// Every strategy against [`DEFAULT_THREAD_PAIRS`].
    #[must_use]
    pub fn full(loop_budget: u64) -> Self {
        Self::new(
            StrategyKind::ALL.to_vec(),
            DEFAULT_THREAD_PAIRS.to_vec(),
            loop_budget,
        )
    }

    /// A custom sweep. Order of both lists is preserved.
    #[must_use]
    pub const fn new(
        strategies: Vec<StrategyKind>,
        pairs: Vec<(usize, usize)>,
        loop_budget: u64,
    ) -> Self {
        Self {
            strategies,
            pairs,
            loop_budget,
        }
    }

    /// Strategies in sweep order.
    #[must_use]
    pub fn strategies(&self) -> &[StrategyKind] {
        &self.strategies
    }

    /// Thread pairs in sweep order.
    #[must_use]
    pub fn pairs(&self) -> &[(usize, usize)] {
        &self.pairs
    }

    /// Cases per strategy; the natural row width of a report.
    #[must_use]
    pub fn group_width(&self) -> usize {
        self.pairs.len()
    }

    /// Number of cases the sweep produces.
    #[must_use]
    pub fn len(&self) -> usize {
        self.strategies.len() * self.pairs.len()
    }

    /// Whether the sweep produces no cases.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fresh cases, strategy-major.
    pub fn cases(&self) -> impl Iterator<Item = TestCase> + '_ {
        self.strategies.iter().flat_map(move |&strategy| {
            self.pairs.iter().map(move |&(writers, readers)| {
                TestCase::new(strategy, writers, readers, self.loop_budget)
            })
        })
    }
}
