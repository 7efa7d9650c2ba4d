//! Interval types for overlap testing
//!
//! `Span` covers real-valued entity extents (bounding intervals along one
//! axis), `GridRange` covers half-open discrete cell ranges used by cluster
//! placement validation.

use serde::{Deserialize, Serialize};

/// Closed real-valued interval `[lo, hi]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Span {
    lo: f64,
    hi: f64,
}

impl Span {
    /// Interval centered on `center` with total width `dim`
    #[inline]
    pub fn centered(center: f64, dim: f64) -> Self {
        Self {
            lo: center - dim / 2.0,
            hi: center + dim / 2.0,
        }
    }

    pub fn new(lo: f64, hi: f64) -> Self {
        debug_assert!(lo <= hi, "degenerate span [{lo}, {hi}]");
        Self { lo, hi }
    }

    #[inline]
    pub fn lo(&self) -> f64 {
        self.lo
    }

    #[inline]
    pub fn hi(&self) -> f64 {
        self.hi
    }

    #[inline]
    pub fn contains(&self, v: f64) -> bool {
        v >= self.lo && v <= self.hi
    }

    /// Closed-interval overlap test
    #[inline]
    pub fn overlaps_with(&self, other: &Span) -> bool {
        self.lo <= other.hi && other.lo <= self.hi
    }
}

/// Half-open discrete cell range `[lo, hi)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridRange {
    lo: usize,
    hi: usize,
}

impl GridRange {
    pub fn new(lo: usize, hi: usize) -> Self {
        debug_assert!(lo <= hi, "degenerate range [{lo}, {hi})");
        Self { lo, hi }
    }

    #[inline]
    pub fn lo(&self) -> usize {
        self.lo
    }

    #[inline]
    pub fn hi(&self) -> usize {
        self.hi
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.hi - self.lo
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.hi == self.lo
    }

    #[inline]
    pub fn contains(&self, v: usize) -> bool {
        v >= self.lo && v < self.hi
    }

    /// Half-open overlap test between two cell ranges
    #[inline]
    pub fn overlaps_with(&self, other: &GridRange) -> bool {
        self.lo < other.hi && other.lo < self.hi
    }
}
