//! The `AssignmentFinder` pre-pass (design §4.3 "Unknown memory
//! handling"): enumerate every `ALLOC` node once, then turn each node
//! that reads or writes the `UNKNOWN_MEMORY` pseudo-object into a weak
//! reader/writer of
//! every allocated object. Runs once, before either solver, since both the
//! dense and sparse algorithms need the expanded site lists.
//!
//! Trades precision for soundness: without this pass, a write through an
//! unresolved pointer would only ever reach reads through other unresolved
//! pointers, silently hiding an aliasing possibility through real objects.

use super::rw_graph::{RwGraph, UNKNOWN_MEMORY};
use crate::features::reaching_defs::domain::DefSite;

pub struct AssignmentFinder;

impl AssignmentFinder {
    /// Expand every `UNKNOWN_MEMORY` def/use in `graph` into one weak
    /// site per known allocation, in place.
    pub fn run(graph: &mut RwGraph) {
        let alloc_sites = graph.alloc_sites.clone();
        for node in graph.nodes.values_mut() {
            if node.defs.iter().any(|s| s.target == UNKNOWN_MEMORY) {
                for &alloc in &alloc_sites {
                    let site = DefSite::whole_object(alloc);
                    if !node.defs.contains(&site) {
                        node.defs.push(site);
                    }
                }
            }
            if node.uses.iter().any(|s| s.target == UNKNOWN_MEMORY) {
                for &alloc in &alloc_sites {
                    let site = DefSite::whole_object(alloc);
                    if !node.uses.contains(&site) {
                        node.uses.push(site);
                    }
                }
            }
        }
    }
}
