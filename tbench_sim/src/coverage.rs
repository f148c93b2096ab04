//! Functional coverage over observed operands.

use crate::analysis::Subscriber;
use crate::transaction::{Transaction, Width};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Distinct (a, b) pairs tracked; covers every pair up to 8-bit operands.
pub const MAX_TRACKED_PAIRS: usize = 1 << 16;

/// Operand value class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Bin {
    Zero,
    Max,
    Other,
}

/// Coverage summary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CoverageReport {
    /// Transactions observed
    pub samples: u64,

    /// Hits per bin for `a`: [zero, max, other]
    pub a_bins: [u64; 3],

    /// Hits per bin for `b`: [zero, max, other]
    pub b_bins: [u64; 3],

    /// Results with the carry-out bit set
    pub carry_out: u64,

    /// Distinct (a, b) pairs seen
    pub distinct_pairs: u64,

    /// `distinct_pairs` over the full operand space (0.0 - 1.0)
    pub pair_coverage: f64,

    /// Pair tracking hit its limit; `distinct_pairs` is a lower bound
    #[serde(default)]
    pub pairs_saturated: bool,
}

#[derive(Default)]
struct CoverageState {
    report: CoverageReport,
    pairs: HashSet<(u64, u64)>,
}

/// Subscriber collecting operand and carry coverage.
pub struct CoverageCollector {
    width: Width,
    pair_limit: usize,
    state: Mutex<CoverageState>,
}

impl CoverageCollector {
    pub fn new(width: Width) -> Self {
        Self {
            width,
            pair_limit: MAX_TRACKED_PAIRS,
            state: Mutex::new(CoverageState::default()),
        }
    }

    /// Sets how many distinct pairs are tracked.
    pub fn with_pair_limit(mut self, limit: usize) -> Self {
        self.pair_limit = limit;
        self
    }

    fn state(&self) -> MutexGuard<'_, CoverageState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn bin(&self, value: u64) -> Bin {
        if value == 0 {
            Bin::Zero
        } else if value == self.width.max_operand() {
            Bin::Max
        } else {
            Bin::Other
        }
    }

    fn bin_index(bin: Bin) -> usize {
        match bin {
            Bin::Zero => 0,
            Bin::Max => 1,
            Bin::Other => 2,
        }
    }

    /// Records one transaction.
    pub fn sample(&self, txn: &Transaction) {
        let a_bin = Self::bin_index(self.bin(txn.a));
        let b_bin = Self::bin_index(self.bin(txn.b));
        let carry = txn.y.is_some_and(|y| y > self.width.max_operand());

        let mut state = self.state();
        state.report.samples += 1;
        state.report.a_bins[a_bin] += 1;
        state.report.b_bins[b_bin] += 1;
        if carry {
            state.report.carry_out += 1;
        }
        if state.pairs.len() < self.pair_limit {
            state.pairs.insert((txn.a, txn.b));
        } else if !state.pairs.contains(&(txn.a, txn.b)) {
            state.report.pairs_saturated = true;
        }
    }

    /// Returns the coverage summary.
    pub fn report(&self) -> CoverageReport {
        let state = self.state();
        let mut report = state.report.clone();
        report.distinct_pairs = state.pairs.len() as u64;

        let space = 2f64.powi(2 * self.width.bits() as i32);
        report.pair_coverage = report.distinct_pairs as f64 / space;
        report
    }
}

impl Subscriber for CoverageCollector {
    fn write(&self, txn: &Transaction) {
        self.sample(txn);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bins_and_carry() {
        let cov = CoverageCollector::new(Width::new(4).unwrap());
        cov.sample(&Transaction::observed(0, 0, 15, 15));
        cov.sample(&Transaction::observed(1, 15, 15, 30));
        cov.sample(&Transaction::observed(2, 5, 3, 8));

        let report = cov.report();
        assert_eq!(report.samples, 3);
        assert_eq!(report.a_bins, [1, 1, 1]);
        assert_eq!(report.b_bins, [0, 2, 1]);
        assert_eq!(report.carry_out, 1);
    }

    #[test]
    fn test_pair_coverage() {
        let cov = CoverageCollector::new(Width::new(1).unwrap());
        for (a, b) in [(0, 0), (0, 1), (1, 0), (1, 1), (1, 1)] {
            cov.sample(&Transaction::observed(0, a, b, a + b));
        }

        let report = cov.report();
        assert_eq!(report.distinct_pairs, 4);
        assert!((report.pair_coverage - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_report() {
        let cov = CoverageCollector::new(Width::default());
        assert_eq!(cov.report(), CoverageReport::default());
    }

    #[test]
    fn test_pair_tracking_is_bounded() {
        let cov = CoverageCollector::new(Width::new(4).unwrap()).with_pair_limit(2);
        cov.sample(&Transaction::observed(0, 1, 1, 2));
        cov.sample(&Transaction::observed(1, 2, 2, 4));
        cov.sample(&Transaction::observed(2, 1, 1, 2));
        assert!(!cov.report().pairs_saturated);

        cov.sample(&Transaction::observed(3, 3, 3, 6));
        let report = cov.report();
        assert_eq!(report.samples, 4);
        assert_eq!(report.distinct_pairs, 2);
        assert!(report.pairs_saturated);
    }
}
