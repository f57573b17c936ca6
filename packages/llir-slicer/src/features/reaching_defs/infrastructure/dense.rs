//! The dense iterative reaching-definitions algorithm (design §4.3
//! "Dense (reference)"): every node carries a full `RdMap`, predecessors'
//! out-maps join at each block entry, and the transfer function applies a
//! node's `overwrites` as strong updates and `defs` as weak ones.

use crate::features::reaching_defs::domain::{DefSite, RdMap, ReachingSet};
use crate::features::reaching_defs::infrastructure::rw_graph::{RwGraph, UNKNOWN_MEMORY};
use crate::shared::config::RdOptions;
use crate::shared::ir::NodeId;
use rustc_hash::FxHashMap;

pub struct DenseRdSolver<'a> {
    graph: &'a RwGraph,
    options: &'a RdOptions,
    in_maps: FxHashMap<NodeId, RdMap>,
    out_maps: FxHashMap<NodeId, RdMap>,
}

impl<'a> DenseRdSolver<'a> {
    pub fn new(graph: &'a RwGraph, options: &'a RdOptions) -> Self {
        Self { graph, options, in_maps: FxHashMap::default(), out_maps: FxHashMap::default() }
    }

    fn join(&self, predecessors: &[NodeId]) -> RdMap {
        let mut merged = RdMap::new();
        for pred in predecessors {
            if let Some(out) = self.out_maps.get(pred) {
                merged.merge(out, UNKNOWN_MEMORY, self.options.strong_update_unknown);
            }
        }
        merged
    }

    fn crop(&self, map: &mut RdMap) {
        let bound = self.options.max_set_size;
        let oversized: Vec<DefSite> =
            map.iter().filter(|(_, set)| set.len() > bound).map(|(site, _)| *site).collect();
        for site in oversized {
            map.update(site, UNKNOWN_MEMORY);
        }
    }

    /// Run to fixpoint (or `budget` iterations) and return the per-node
    /// `in` maps, the iteration count, and whether it converged. Unlike
    /// PTA's iteration cap, exceeding the budget here is reported but the
    /// partial maps are still returned — the design treats a non-converged
    /// run as "incomplete analysis", not failure.
    pub fn solve(&mut self, budget: usize) -> (FxHashMap<NodeId, RdMap>, usize, bool) {
        let order: Vec<NodeId> = self.graph.order.clone();
        let mut iterations = 0;
        let mut converged = false;

        while iterations < budget {
            iterations += 1;
            let mut changed = false;
            for &id in &order {
                let node = match self.graph.node(id) {
                    Some(n) => n,
                    None => continue,
                };
                let in_map = self.join(&node.predecessors);
                let mut out_map = in_map.clone();

                for &site in &node.overwrites {
                    out_map.update(site, id);
                }
                for &site in &node.defs {
                    out_map.add(site, id);
                }
                self.crop(&mut out_map);

                let prev_out = self.out_maps.get(&id);
                if prev_out != Some(&out_map) {
                    changed = true;
                }
                self.in_maps.insert(id, in_map);
                self.out_maps.insert(id, out_map);
            }
            if !changed {
                converged = true;
                break;
            }
        }

        (self.in_maps.clone(), iterations, converged)
    }

    /// Collect the reaching definitions for every use site recorded at
    /// `node`, from its already-computed `in` map.
    pub fn reaching_definitions(&self, node: NodeId) -> ReachingSet {
        let mut out = ReachingSet::new();
        let Some(in_map) = self.in_maps.get(&node) else { return out };
        let Some(rw) = self.graph.node(node) else { return out };
        for site in &rw.uses {
            in_map.get(site, &mut out);
        }
        out
    }
}
