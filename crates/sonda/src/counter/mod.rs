//! Counter algebra and the aggregated coverage tree
//!
//! Counters are immutable `(missed, covered)` pairs; addition is pointwise
//! and never in place. Coverage nodes form the report tree (bundle →
//! package → class/source file → method) and are built strictly bottom-up.

mod node;

pub use node::{CoverageNode, ElementType, LineCounter, SourceLines};

use serde::{Deserialize, Serialize};

/// Coverage status of a counter, derived and never stored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CoverageStatus {
    /// No instructions at all
    Empty,
    /// Items exist but none were executed
    NotCovered,
    /// Some items executed, some missed
    PartlyCovered,
    /// All items executed
    FullyCovered,
}

/// Immutable pair of missed and covered item counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Counter {
    /// Number of items not executed
    pub missed: u64,
    /// Number of items executed at least once
    pub covered: u64,
}

impl Counter {
    /// The empty counter
    pub const ZERO: Self = Self {
        missed: 0,
        covered: 0,
    };

    /// Create a counter with the given missed and covered counts
    #[inline]
    #[must_use]
    pub const fn new(missed: u64, covered: u64) -> Self {
        Self { missed, covered }
    }

    /// Counter for a single item, missed or covered
    #[inline]
    #[must_use]
    pub const fn single(covered: bool) -> Self {
        if covered {
            Self::new(0, 1)
        } else {
            Self::new(1, 0)
        }
    }

    /// Total number of items
    #[inline]
    #[must_use]
    pub const fn total(self) -> u64 {
        self.missed + self.covered
    }

    /// Pointwise addition, returning a new counter
    #[inline]
    #[must_use]
    pub const fn increment(self, other: Self) -> Self {
        Self {
            missed: self.missed + other.missed,
            covered: self.covered + other.covered,
        }
    }

    /// Ratio of covered items to total, NaN when the counter is empty
    #[must_use]
    pub fn covered_ratio(self) -> f64 {
        self.covered as f64 / self.total() as f64
    }

    /// Ratio of missed items to total, NaN when the counter is empty
    #[must_use]
    pub fn missed_ratio(self) -> f64 {
        self.missed as f64 / self.total() as f64
    }

    /// Derive the coverage status of this counter
    #[must_use]
    pub const fn status(self) -> CoverageStatus {
        match (self.missed, self.covered) {
            (0, 0) => CoverageStatus::Empty,
            (_, 0) => CoverageStatus::NotCovered,
            (0, _) => CoverageStatus::FullyCovered,
            _ => CoverageStatus::PartlyCovered,
        }
    }
}

impl std::ops::Add for Counter {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        self.increment(rhs)
    }
}

impl std::iter::Sum for Counter {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Counter::increment)
    }
}
