//! `RdMap`: a `DefSite -> ReachingSet` map, the per-program-point state
//! both the dense and sparse algorithms carry and join at control-flow
//! merges.

use super::def_site::{DefSite, ReachingSet};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RdMap {
    defs: BTreeMap<DefSite, ReachingSet>,
}

impl RdMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }

    pub fn entry(&self, site: &DefSite) -> Option<&ReachingSet> {
        self.defs.get(site)
    }

    /// Weak update: the writer joins the existing reaching set at every
    /// overlapping site instead of replacing it.
    pub fn add(&mut self, site: DefSite, writer: crate::shared::ir::NodeId) -> bool {
        let mut changed = false;
        for (existing, set) in self.defs.iter_mut() {
            if existing.overlaps(&site) {
                changed |= set.insert(writer);
            }
        }
        changed |= self.defs.entry(site).or_default().insert(writer);
        changed
    }

    /// Strong update: every overlapping site's reaching set is replaced by
    /// `{writer}` alone — a definite overwrite clobbers prior writers.
    pub fn update(&mut self, site: DefSite, writer: crate::shared::ir::NodeId) -> bool {
        let mut changed = false;
        let overlapping: Vec<DefSite> = self.defs.keys().filter(|k| k.overlaps(&site)).copied().collect();
        for key in overlapping {
            let replacement = ReachingSet::from_iter([writer]);
            if self.defs.get(&key) != Some(&replacement) {
                self.defs.insert(key, replacement);
                changed = true;
            }
        }
        if !self.defs.contains_key(&site) {
            self.defs.insert(site, ReachingSet::from_iter([writer]));
            changed = true;
        }
        changed
    }

    /// Gather every writer whose site overlaps `site` into `out`.
    pub fn get(&self, site: &DefSite, out: &mut ReachingSet) {
        for (existing, set) in self.defs.iter() {
            if existing.overlaps(site) {
                if set.is_unknown() {
                    out.make_unknown();
                    return;
                }
                for n in set.nodes() {
                    out.insert(n);
                }
            }
        }
    }

    /// Join `other` into `self`, per site, unioning reaching sets.
    /// `strong_update_unknown`: when `UNKNOWN_MEMORY` itself is one of the
    /// writers being merged in, this toggles whether the merge strong-updates
    /// (replaces) or weak-updates (accumulates) — the design's explicitly
    /// unsound-but-useful option.
    pub fn merge(&mut self, other: &RdMap, unknown_memory: crate::shared::ir::NodeId, strong_update_unknown: bool) -> bool {
        let mut changed = false;
        for (site, set) in other.defs.iter() {
            let entry = self.defs.entry(*site).or_default();
            if strong_update_unknown && set.nodes().any(|n| n == unknown_memory) {
                let replacement = ReachingSet::from_iter([unknown_memory]);
                if *entry != replacement {
                    *entry = replacement;
                    changed = true;
                }
            } else {
                changed |= entry.union_with(set);
            }
        }
        changed
    }

    pub fn iter(&self) -> impl Iterator<Item = (&DefSite, &ReachingSet)> {
        self.defs.iter()
    }
}
