//! `DefSite`: the byte-region key reaching-definitions indexes on — a
//! target object plus an offset/length pair, ordered
//! target-then-offset-then-length so a `BTreeMap<DefSite, _>` groups all
//! sites of one object together.

use crate::features::offset::Offset;
use crate::shared::ir::NodeId;
use rustc_hash::FxHashSet;
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DefSite {
    pub target: NodeId,
    pub offset: Offset,
    pub len: Offset,
}

impl DefSite {
    pub fn new(target: NodeId, offset: Offset, len: Offset) -> Self {
        Self { target, offset, len }
    }

    pub fn whole_object(target: NodeId) -> Self {
        Self { target, offset: Offset::UNKNOWN, len: Offset::UNKNOWN }
    }

    /// Whether `self` and `other` name overlapping byte ranges of the same
    /// object — unknown offset/length is conservatively "covers everything".
    pub fn overlaps(&self, other: &DefSite) -> bool {
        if self.target != other.target {
            return false;
        }
        match (self.offset.value(), self.len.value(), other.offset.value(), other.len.value()) {
            (Some(a), Some(al), Some(b), Some(bl)) => {
                let a_end = a.saturating_add(al);
                let b_end = b.saturating_add(bl);
                a < b_end && b < a_end
            }
            _ => true,
        }
    }
}

impl Ord for DefSite {
    fn cmp(&self, other: &Self) -> Ordering {
        self.target
            .cmp(&other.target)
            .then_with(|| self.offset.cmp(&other.offset))
            .then_with(|| self.len.cmp(&other.len))
    }
}

impl PartialOrd for DefSite {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A set of nodes that may reach a read, plus the `UNKNOWN_MEMORY` flag:
/// once the set goes unknown it absorbs every further insertion instead
/// of growing unbounded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReachingSet {
    nodes: FxHashSet<NodeId>,
    unknown: bool,
}

impl ReachingSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn unknown() -> Self {
        Self { nodes: FxHashSet::default(), unknown: true }
    }

    /// Returns `true` if the set changed.
    pub fn insert(&mut self, node: NodeId) -> bool {
        if self.unknown {
            return false;
        }
        self.nodes.insert(node)
    }

    pub fn make_unknown(&mut self) -> bool {
        if self.unknown {
            return false;
        }
        self.nodes.clear();
        self.unknown = true;
        true
    }

    pub fn is_unknown(&self) -> bool {
        self.unknown
    }

    pub fn union_with(&mut self, other: &ReachingSet) -> bool {
        if self.unknown {
            return false;
        }
        if other.unknown {
            return self.make_unknown();
        }
        let before = self.nodes.len();
        self.nodes.extend(other.nodes.iter().copied());
        self.nodes.len() != before
    }

    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && !self.unknown
    }
}

impl FromIterator<NodeId> for ReachingSet {
    fn from_iter<T: IntoIterator<Item = NodeId>>(iter: T) -> Self {
        Self { nodes: iter.into_iter().collect(), unknown: false }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlapping_ranges_of_different_objects_never_overlap() {
        let a = DefSite::new(1, Offset::new(0), Offset::new(4));
        let b = DefSite::new(2, Offset::new(0), Offset::new(4));
        assert!(!a.overlaps(&b));
    }

    #[test]
    fn unknown_offset_overlaps_everything_in_same_object() {
        let a = DefSite::whole_object(1);
        let b = DefSite::new(1, Offset::new(100), Offset::new(4));
        assert!(a.overlaps(&b));
    }

    #[test]
    fn reaching_set_absorbs_on_unknown() {
        let mut set = ReachingSet::new();
        set.insert(1);
        set.make_unknown();
        assert!(!set.insert(2));
        assert!(set.is_unknown());
    }

    #[test]
    fn union_with_unknown_makes_self_unknown() {
        let mut a = ReachingSet::from_iter([1, 2]);
        let b = ReachingSet::unknown();
        assert!(a.union_with(&b));
        assert!(a.is_unknown());
    }
}
