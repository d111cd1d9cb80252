//! Ordered results of a sweep.
//!
//! [`Report`] is the result collector: one entry per case, in the order the
//! cases ran. Successful entries carry the case with its duration recorded;
//! failed entries keep the case as it was (duration unset) next to the error.

use std::time::Duration;

use crate::error::BenchError;
use crate::matrix::TestCase;
use crate::runner::CaseOutcome;

/// One case's result.
#[derive(Debug)]
pub struct ReportEntry {
    /// The case. Has a duration iff `result` is `Ok`.
    pub case: TestCase,
    /// Outcome details or the failure that ended the case.
    pub result: Result<CaseOutcome, BenchError>,
}

impl ReportEntry {
    /// Whether the case completed and passed its checks.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Results of a sweep, in execution order.
#[derive(Debug, Default)]
pub struct Report {
    entries: Vec<ReportEntry>,
    group_width: usize,
}

impl Report {
    /// An empty report whose rows hold `group_width` durations.
    #[must_use]
    pub const fn new(group_width: usize) -> Self {
        Self {
            entries: Vec::new(),
            group_width,
        }
    }

    /// Append one case's result.
    pub fn record(&mut self, case: TestCase, result: Result<CaseOutcome, BenchError>) {
        self.entries.push(ReportEntry { case, result });
    }

    /// All entries in execution order.
    #[must_use]
    pub fn entries(&self) -> &[ReportEntry] {
        &self.entries
    }

    /// Number of recorded cases.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Durations in execution order; `None` for failed cases.
    #[must_use]
    pub fn durations(&self) -> Vec<Option<Duration>> {
        self.entries.iter().map(|entry| entry.case.duration()).collect()
    }

    /// `(case, duration in ms)` pairs in execution order.
    pub fn timings(&self) -> impl Iterator<Item = (&TestCase, Option<u64>)> {
        self.entries
            .iter()
            .map(|entry| (&entry.case, entry.case.duration_ms()))
    }

    /// Millisecond durations split into rows of `group_width`.
    ///
    /// With the default matrix a row is one strategy's sweep, ready for
    /// tabular export. The last row may be short.
    #[must_use]
    pub fn duration_groups(&self) -> Vec<Vec<Option<u64>>> {
        let width = self.group_width.max(1);
        self.entries
            .chunks(width)
            .map(|row| row.iter().map(|entry| entry.case.duration_ms()).collect())
            .collect()
    }

    /// Successful outcomes in execution order.
    pub fn outcomes(&self) -> impl Iterator<Item = &CaseOutcome> {
        self.entries
            .iter()
            .filter_map(|entry| entry.result.as_ref().ok())
    }

    /// Failures in execution order.
    pub fn failures(&self) -> impl Iterator<Item = &BenchError> {
        self.entries
            .iter()
            .filter_map(|entry| entry.result.as_ref().err())
    }

    /// Whether every case succeeded.
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.entries.iter().all(ReportEntry::is_success)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::WorkloadPlan;
    use crate::strategy::StrategyKind;
    use crate::worker::ReadStats;

    fn passed(writers: usize, ms: u64) -> (TestCase, Result<CaseOutcome, BenchError>) {
        let mut case = TestCase::new(StrategyKind::ExclusiveMutex, writers, 0, 100);
        case.record_duration(Duration::from_millis(ms));
        let outcome = CaseOutcome {
            case: case.clone(),
            plan: WorkloadPlan::for_case(&case, 1),
            final_counter: 100,
            reads: ReadStats::default(),
        };
        (case, Ok(outcome))
    }

    fn failed(writers: usize) -> (TestCase, Result<CaseOutcome, BenchError>) {
        let case = TestCase::new(StrategyKind::ReadWriteFair, writers, 0, 100);
        let err = BenchError::LivenessFailure {
            case: case.clone(),
            outstanding: 1,
            timeout: Duration::from_secs(1),
        };
        (case, Err(err))
    }

    #[test]
    fn test_order_and_groups() {
        let mut report = Report::new(2);
        for (case, result) in [passed(1, 10), failed(2), passed(3, 30)] {
            report.record(case, result);
        }

        assert_eq!(report.len(), 3);
        assert_eq!(
            report.duration_groups(),
            vec![vec![Some(10), None], vec![Some(30)]]
        );
        assert_eq!(report.outcomes().count(), 2);
        assert_eq!(report.failures().count(), 1);
        assert!(!report.all_passed());

        let writers: Vec<_> = report
            .timings()
            .map(|(case, _)| case.writer_threads())
            .collect();
        assert_eq!(writers, vec![1, 2, 3]);
    }

    #[test]
    fn test_empty_report() {
        let report = Report::new(0);
        assert!(report.is_empty());
        assert!(report.all_passed());
        assert!(report.duration_groups().is_empty());
    }
}
