//! [`DisjointIntervalSet`] and [`TemporalConstraintSet`] (spec §4.5).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Sorted, disjoint, merged `[min,max]` integer intervals.
///
/// `add` keeps the set canonical (no two intervals overlap or touch)
/// in a single O(n) pass, so the set is insensitive to insertion
/// order — adding the same intervals in any order yields the same
/// final set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DisjointIntervalSet {
    intervals: Vec<(i64, i64)>,
}

impl DisjointIntervalSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(min: i64, max: i64) -> Self {
        let mut set = Self::new();
        set.add(min, max);
        set
    }

    /// Merge `[min,max]` into the set, coalescing with any interval it
    /// overlaps or touches.
    pub fn add(&mut self, min: i64, max: i64) {
        let mut merged = (min, max);
        let mut result = Vec::with_capacity(self.intervals.len() + 1);
        let mut inserted = false;
        for &(lo, hi) in &self.intervals {
            if hi < merged.0.saturating_sub(1) {
                result.push((lo, hi));
            } else if lo > merged.1.saturating_add(1) {
                if !inserted {
                    result.push(merged);
                    inserted = true;
                }
                result.push((lo, hi));
            } else {
                merged = (merged.0.min(lo), merged.1.max(hi));
            }
        }
        if !inserted {
            result.push(merged);
        }
        self.intervals = result;
    }

    pub fn contains(&self, value: i64) -> bool {
        self.intervals
            .binary_search_by(|&(lo, hi)| {
                if value < lo {
                    std::cmp::Ordering::Greater
                } else if value > hi {
                    std::cmp::Ordering::Less
                } else {
                    std::cmp::Ordering::Equal
                }
            })
            .is_ok()
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    pub fn intervals(&self) -> &[(i64, i64)] {
        &self.intervals
    }

    /// Largest upper bound across every interval, used to compute a
    /// deadline when no single interval is singled out.
    pub fn max_bound(&self) -> Option<i64> {
        self.intervals.iter().map(|(_, hi)| *hi).max()
    }
}

/// `[min_count, max_count]` bounds on how many times a generator may
/// fire, keyed by whether the constraint itself is declared recurrent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TemporalConstraintSet {
    pub intervals: DisjointIntervalSet,
    pub occurrence_constraints: HashMap<bool, (u32, u32)>,
}

impl TemporalConstraintSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_interval(min: i64, max: i64) -> Self {
        TemporalConstraintSet {
            intervals: DisjointIntervalSet::single(min, max),
            occurrence_constraints: HashMap::new(),
        }
    }

    pub fn add_occurrence(&mut self, recurrent: bool, min_count: u32, max_count: u32) {
        self.occurrence_constraints.insert(recurrent, (min_count, max_count));
    }

    /// Merge `other` into `self` in place: union the interval sets,
    /// keep the tighter of any overlapping occurrence bound.
    pub fn merge(&mut self, other: &TemporalConstraintSet) {
        for &(lo, hi) in other.intervals.intervals() {
            self.intervals.add(lo, hi);
        }
        for (&recurrent, &(min, max)) in &other.occurrence_constraints {
            self.occurrence_constraints
                .entry(recurrent)
                .and_modify(|(existing_min, existing_max)| {
                    *existing_min = (*existing_min).max(min);
                    *existing_max = (*existing_max).min(max);
                })
                .or_insert((min, max));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_merges_overlapping_and_touching_intervals() {
        let mut set = DisjointIntervalSet::new();
        set.add(1, 3);
        set.add(4, 6);
        assert_eq!(set.intervals(), &[(1, 6)]);
        set.add(10, 12);
        assert_eq!(set.intervals(), &[(1, 6), (10, 12)]);
        set.add(7, 9);
        assert_eq!(set.intervals(), &[(1, 12)]);
    }

    #[test]
    fn add_is_commutative_and_associative() {
        let mut a = DisjointIntervalSet::new();
        for (min, max) in [(1, 3), (10, 12), (5, 6)] {
            a.add(min, max);
        }
        let mut b = DisjointIntervalSet::new();
        for (min, max) in [(10, 12), (5, 6), (1, 3)] {
            b.add(min, max);
        }
        assert_eq!(a, b);
    }

    #[test]
    fn contains_respects_bounds() {
        let set = DisjointIntervalSet::single(1, 3);
        assert!(set.contains(1));
        assert!(set.contains(3));
        assert!(!set.contains(0));
        assert!(!set.contains(4));
    }
}
