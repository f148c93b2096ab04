//! Scoreboard: checks every observed transaction against the reference model.

use crate::analysis::Subscriber;
use crate::phase::Buildable;
use crate::reference::ReferenceModel;
use crate::timeline::{Stage, Timeline};
use crate::transaction::Transaction;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tbench_env::{ComponentPath, HarnessError};
use tracing::{error, info};

/// Mismatches kept verbatim in the report; later ones are only counted.
pub const MAX_RECORDED_MISMATCHES: usize = 64;

/// Outcome of one comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Pass,
    Fail {
        expected: u64,
        actual: Option<u64>,
    },
}

impl Verdict {
    pub fn is_pass(&self) -> bool {
        matches!(self, Verdict::Pass)
    }
}

/// A failed comparison.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mismatch {
    pub id: u64,
    pub a: u64,
    pub b: u64,
    pub expected: u64,
    pub actual: Option<u64>,
}

/// End-of-run totals.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreboardReport {
    /// Transactions compared
    pub checked: u64,

    /// Comparisons that matched
    pub passed: u64,

    /// Comparisons that did not match
    pub failed: u64,

    /// First [`MAX_RECORDED_MISMATCHES`] failures
    pub mismatches: Vec<Mismatch>,
}

/// Dependencies injected by the environment.
pub struct ScoreboardDeps {
    pub model: Arc<dyn ReferenceModel>,
    pub timeline: Arc<Timeline>,
}

/// Compares observed results with reference predictions.
///
/// Purely reactive: it is driven by the monitor's publish call and never
/// blocks. Counters live behind a mutex so the environment can read them
/// while the monitor task holds its own `Arc`.
pub struct Scoreboard {
    path: ComponentPath,
    model: Arc<dyn ReferenceModel>,
    timeline: Arc<Timeline>,
    report: Mutex<ScoreboardReport>,
}

impl Buildable for Scoreboard {
    type Deps = ScoreboardDeps;

    fn build(path: ComponentPath, deps: Self::Deps) -> Result<Self, HarnessError> {
        Ok(Self {
            path,
            model: deps.model,
            timeline: deps.timeline,
            report: Mutex::new(ScoreboardReport::default()),
        })
    }
}

impl Scoreboard {
    fn report_mut(&self) -> MutexGuard<'_, ScoreboardReport> {
        self.report.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Checks one observed transaction and records the verdict.
    pub fn check(&self, txn: &Transaction) -> Verdict {
        let expected = self.model.predict(txn.a, txn.b);
        let verdict = match txn.y {
            Some(actual) if actual == expected => Verdict::Pass,
            actual => Verdict::Fail { expected, actual },
        };

        self.timeline.record(Stage::Verdict, txn.id);

        let mut report = self.report_mut();
        report.checked += 1;
        match verdict {
            Verdict::Pass => {
                report.passed += 1;
                info!(
                    component = %self.path,
                    id = txn.id,
                    a = txn.a,
                    b = txn.b,
                    expected,
                    actual = expected,
                    "PASS"
                );
            }
            Verdict::Fail { expected, actual } => {
                report.failed += 1;
                if report.mismatches.len() < MAX_RECORDED_MISMATCHES {
                    report.mismatches.push(Mismatch {
                        id: txn.id,
                        a: txn.a,
                        b: txn.b,
                        expected,
                        actual,
                    });
                }
                error!(
                    component = %self.path,
                    id = txn.id,
                    a = txn.a,
                    b = txn.b,
                    expected,
                    actual = ?actual,
                    "FAIL"
                );
            }
        }

        verdict
    }

    /// Returns a snapshot of the totals.
    pub fn report(&self) -> ScoreboardReport {
        self.report_mut().clone()
    }

    /// Returns the number of failed comparisons so far.
    pub fn failures(&self) -> u64 {
        self.report_mut().failed
    }

    /// Returns the reference model's name.
    pub fn model_name(&self) -> &str {
        self.model.name()
    }
}

impl Subscriber for Scoreboard {
    fn write(&self, txn: &Transaction) {
        self.check(txn);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::AdderModel;
    use crate::transaction::Width;

    fn scoreboard(model: Arc<dyn ReferenceModel>) -> Scoreboard {
        Scoreboard::build(
            ComponentPath::root("test").child("scoreboard"),
            ScoreboardDeps {
                model,
                timeline: Arc::new(Timeline::default()),
            },
        )
        .unwrap()
    }

    fn adder() -> Arc<dyn ReferenceModel> {
        Arc::new(AdderModel::new(Width::new(4).unwrap()))
    }

    #[test]
    fn test_pass_verdict() {
        let sb = scoreboard(adder());
        assert_eq!(sb.check(&Transaction::observed(0, 5, 3, 8)), Verdict::Pass);
        assert_eq!(sb.check(&Transaction::observed(1, 15, 15, 30)), Verdict::Pass);

        let report = sb.report();
        assert_eq!((report.checked, report.passed, report.failed), (2, 2, 0));
    }

    #[test]
    fn test_fail_verdict_is_counted() {
        let sb = scoreboard(adder());
        let verdict = sb.check(&Transaction::observed(0, 5, 3, 0));

        assert_eq!(
            verdict,
            Verdict::Fail {
                expected: 8,
                actual: Some(0)
            }
        );
        assert_eq!(sb.failures(), 1);
        assert_eq!(
            sb.report().mismatches,
            vec![Mismatch {
                id: 0,
                a: 5,
                b: 3,
                expected: 8,
                actual: Some(0)
            }]
        );
    }

    #[test]
    fn test_missing_result_is_a_mismatch() {
        let sb = scoreboard(adder());
        let verdict = sb.check(&Transaction::stimulus(0, 1, 1));
        assert!(!verdict.is_pass());
        assert_eq!(sb.failures(), 1);
    }

    #[test]
    fn test_recorded_mismatches_are_bounded() {
        let sb = scoreboard(adder());
        for id in 0..(MAX_RECORDED_MISMATCHES as u64 + 10) {
            sb.check(&Transaction::observed(id, 1, 1, 0));
        }

        let report = sb.report();
        assert_eq!(report.failed, MAX_RECORDED_MISMATCHES as u64 + 10);
        assert_eq!(report.mismatches.len(), MAX_RECORDED_MISMATCHES);
    }

    #[test]
    fn test_pluggable_model() {
        let sb = scoreboard(Arc::new(|a: u64, b: u64| a * b));
        assert!(sb.check(&Transaction::observed(0, 3, 4, 12)).is_pass());
        assert_eq!(sb.model_name(), "custom");
    }

    #[test]
    fn test_subscriber_write_checks() {
        let sb = scoreboard(adder());
        sb.write(&Transaction::observed(0, 2, 2, 4));
        assert_eq!(sb.report().passed, 1);
    }
}
