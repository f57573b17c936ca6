use super::offset::Offset;
use serde::{Deserialize, Serialize};

/// A byte range `[start, start + len)` within an object, used wherever
/// reaching-definitions needs to reason about "this store touched these
/// bytes" (design §4.3). An interval whose `start` is [`Offset::UNKNOWN`]
/// covers the whole object — [`Interval::overlaps`] treats it as
/// overlapping everything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interval {
    pub start: Offset,
    pub len: u64,
}

impl Interval {
    pub fn new(start: Offset, len: u64) -> Self {
        Self { start, len }
    }

    /// The whole-object interval: unknown start, unbounded length.
    pub fn unknown() -> Self {
        Self { start: Offset::UNKNOWN, len: u64::MAX }
    }

    pub fn is_unknown(&self) -> bool {
        self.start.is_unknown()
    }

    fn end(&self) -> Option<u64> {
        self.start.value().map(|s| s.saturating_add(self.len))
    }

    /// Whether two intervals share at least one byte: unknown intervals
    /// overlap everything, and two concrete intervals overlap iff neither
    /// ends before the other starts.
    pub fn overlaps(&self, other: &Interval) -> bool {
        if self.is_unknown() || other.is_unknown() {
            return true;
        }
        let (a_start, a_end) = (self.start.value().unwrap(), self.end().unwrap());
        let (b_start, b_end) = (other.start.value().unwrap(), other.end().unwrap());
        a_start < b_end && b_start < a_end
    }

    pub fn is_disjoint(&self, other: &Interval) -> bool {
        !self.overlaps(other)
    }

    /// Normalizes an interval with an unknown start or length to
    /// [`Interval::unknown`] ("all of the object"); a no-op on an interval
    /// whose start and length are both already concrete. Idempotent:
    /// concretizing twice is the same as concretizing once.
    pub fn concretize(&self) -> Interval {
        if self.start.is_unknown() || self.len == u64::MAX {
            Interval::unknown()
        } else {
            *self
        }
    }

    /// Whether `self` is fully contained within `other`.
    pub fn is_subset_of(&self, other: &Interval) -> bool {
        if other.is_unknown() {
            return true;
        }
        if self.is_unknown() {
            return false;
        }
        let (a_start, a_end) = (self.start.value().unwrap(), self.end().unwrap());
        let (b_start, b_end) = (other.start.value().unwrap(), other.end().unwrap());
        a_start >= b_start && a_end <= b_end
    }
}

/// A set of intervals within one object, kept disjunctive (not merged into
/// a single span) so that merging never loses precision about which
/// bytes each individual definition actually wrote.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntervalSet {
    intervals: Vec<Interval>,
}

impl IntervalSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, interval: Interval) {
        if interval.is_unknown() {
            self.intervals.clear();
            self.intervals.push(interval);
            return;
        }
        if self.is_unknown() {
            return;
        }
        self.intervals.push(interval);
    }

    pub fn is_unknown(&self) -> bool {
        self.intervals.len() == 1 && self.intervals[0].is_unknown()
    }

    pub fn overlaps(&self, other: &Interval) -> bool {
        self.intervals.iter().any(|i| i.overlaps(other))
    }

    pub fn intervals(&self) -> &[Interval] {
        &self.intervals
    }

    /// Collapse to [`Interval::unknown`] once the set grows past `bound`,
    /// trading precision for a fixed memory footprint — the same
    /// crop-to-unknown policy `RdOptions::max_set_size` governs for
    /// reaching-definitions sets.
    pub fn concretize(&mut self, bound: usize) {
        if self.intervals.len() > bound {
            self.intervals.clear();
            self.intervals.push(Interval::unknown());
        }
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn concrete_interval() -> impl Strategy<Value = Interval> {
        (0u64..1000, 1u64..64).prop_map(|(start, len)| Interval::new(Offset::new(start), len))
    }

    proptest! {
        #[test]
        fn overlap_is_symmetric(a in concrete_interval(), b in concrete_interval()) {
            prop_assert_eq!(a.overlaps(&b), b.overlaps(&a));
        }

        #[test]
        fn subset_implies_overlap(a in concrete_interval(), b in concrete_interval()) {
            if a.is_subset_of(&b) {
                prop_assert!(a.overlaps(&b));
            }
        }

        #[test]
        fn every_interval_overlaps_itself(a in concrete_interval()) {
            prop_assert!(a.overlaps(&a));
        }
    }
}
