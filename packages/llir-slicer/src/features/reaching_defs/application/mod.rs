//! The reaching-definitions analyzer's public contract: `build`, `run`,
//! `reaching_definitions`, `mod_ref` — dispatching to the dense or sparse
//! solver per [`RdOptions::sparse`], mirroring
//! [`crate::features::points_to::PointsToAnalyzer`]'s shape.

use crate::features::points_to::PointsToSet;
use crate::features::reaching_defs::domain::{RdMap, ReachingSet};
use crate::features::reaching_defs::infrastructure::{
    AssignmentFinder, DenseRdSolver, ModRefSummary, PhiNode, RwGraph, SparseRdResult, SparseRdSolver,
};
use crate::features::validation::domain::AnalysisStats;
use crate::shared::config::RdOptions;
use crate::shared::ir::{NodeId, Program};
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, info};

/// Iteration budget for the dense solver's fixpoint. Unlike PTA, reaching
/// definitions has no user-facing `max_iterations` knob — per-object
/// crop-to-unknown (`max_set_size`) bounds growth instead, so a generous
/// fixed budget is enough.
const DENSE_ITERATION_BUDGET: usize = 10_000;

pub struct RdAnalyzer {
    options: RdOptions,
    graph: Option<RwGraph>,
    dense_in_maps: FxHashMap<NodeId, RdMap>,
    sparse_by_function: FxHashMap<NodeId, SparseRdResult>,
    mod_ref_by_function: FxHashMap<NodeId, ModRefSummary>,
}

impl RdAnalyzer {
    pub fn new(options: RdOptions) -> Self {
        Self {
            options,
            graph: None,
            dense_in_maps: FxHashMap::default(),
            sparse_by_function: FxHashMap::default(),
            mod_ref_by_function: FxHashMap::default(),
        }
    }

    /// Build the read/write graph from the program and the already-run
    /// points-to results, then expand `UNKNOWN_MEMORY` accesses via
    /// [`AssignmentFinder`].
    pub fn build(&mut self, program: &Program, pta: &FxHashMap<NodeId, PointsToSet>) {
        let mut graph = RwGraph::build(program, pta, &self.options);
        AssignmentFinder::run(&mut graph);
        debug!(nodes = graph.order.len(), alloc_sites = graph.alloc_sites.len(), "built read/write graph");
        self.graph = Some(graph);
    }

    /// Run the dense or sparse solver per [`RdOptions::sparse`], recording
    /// one `rd_iteration` per solver round into `stats` — a dense fixpoint
    /// round for the dense path, one build pass per function for the
    /// sparse path (design §6 "analysis statistics").
    pub fn run(&mut self, program: &Program, stats: &mut AnalysisStats) {
        let graph = self.graph.as_ref().expect("build must be called before run");

        if self.options.sparse {
            for function in program.functions.values() {
                let solver = SparseRdSolver::new(graph);
                let result = solver.build(function);
                info!(function = %function.name, phis = result.phis.len(), "sparse reaching-definitions built");
                self.sparse_by_function.insert(function.id, result);
                stats.record_rd_iteration();
            }
        } else {
            let mut solver = DenseRdSolver::new(graph, &self.options);
            let (in_maps, iterations, converged) = solver.solve(DENSE_ITERATION_BUDGET);
            info!(iterations, converged, "dense reaching-definitions fixpoint");
            self.dense_in_maps = in_maps;
            for _ in 0..iterations {
                stats.record_rd_iteration();
            }
        }

        for function in program.functions.values() {
            self.mod_ref_by_function.insert(function.id, ModRefSummary::compute(function, graph));
        }
    }

    /// The set of nodes that may have last written the memory `node`
    /// reads from, resolved through any memory-SSA phis in the sparse
    /// case.
    pub fn reaching_definitions(&self, node: NodeId) -> ReachingSet {
        if self.options.sparse {
            self.sparse_reaching_definitions(node)
        } else {
            self.dense_reaching_definitions(node)
        }
    }

    fn dense_reaching_definitions(&self, node: NodeId) -> ReachingSet {
        let mut out = ReachingSet::new();
        let Some(graph) = &self.graph else { return out };
        let Some(rw) = graph.node(node) else { return out };
        let Some(in_map) = self.dense_in_maps.get(&node) else { return out };
        for site in &rw.uses {
            in_map.get(site, &mut out);
        }
        out
    }

    fn sparse_reaching_definitions(&self, node: NodeId) -> ReachingSet {
        let mut out = ReachingSet::new();
        let Some(graph) = &self.graph else { return out };
        let Some(rw) = graph.node(node) else { return out };
        let Some(result) = self.sparse_by_function.get(&rw.function) else { return out };

        let phis_by_id: FxHashMap<NodeId, &PhiNode> = result.phis.iter().map(|p| (p.id, p)).collect();
        let Some(defs) = result.reverse_srg_edges.get(&node) else { return out };

        let mut resolved = FxHashSet::default();
        let mut seen = FxHashSet::default();
        for &def in defs {
            expand_phi(def, &phis_by_id, &mut resolved, &mut seen);
        }
        for id in resolved {
            out.insert(id);
        }
        out
    }

    pub fn mod_ref(&self, function: NodeId) -> Option<&ModRefSummary> {
        self.mod_ref_by_function.get(&function)
    }

    pub fn graph(&self) -> Option<&RwGraph> {
        self.graph.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::ir::{Function, Instruction, NodeKind, Operand, Program};

    fn straight_line_program() -> Program {
        let mut program = Program::new();
        let mut f = Function::new(1, "f", 10);
        let mut a = Instruction::new(10, NodeKind::Alloc);
        a.successors.push(11);
        let mut s = Instruction::new(11, NodeKind::Store).with_operands(vec![Operand::Node(10), Operand::Node(10)]);
        s.predecessors.push(10);
        s.successors.push(12);
        let mut r = Instruction::new(12, NodeKind::Return).with_operands(vec![Operand::Node(10)]);
        r.predecessors.push(11);
        f.add_instruction(a);
        f.add_instruction(s);
        f.add_instruction(r);
        program.functions.insert(1, f);
        program
    }

    #[test]
    fn dense_run_records_one_iteration_per_fixpoint_round() {
        let program = straight_line_program();
        let pta: FxHashMap<NodeId, PointsToSet> = FxHashMap::default();
        let mut rd = RdAnalyzer::new(RdOptions { sparse: false, ..RdOptions::default() });
        rd.build(&program, &pta);
        let mut stats = AnalysisStats::new();
        rd.run(&program, &mut stats);
        assert!(stats.rd_iterations > 0);
    }

    #[test]
    fn sparse_run_records_one_iteration_per_function() {
        let program = straight_line_program();
        let pta: FxHashMap<NodeId, PointsToSet> = FxHashMap::default();
        let mut rd = RdAnalyzer::new(RdOptions { sparse: true, ..RdOptions::default() });
        rd.build(&program, &pta);
        let mut stats = AnalysisStats::new();
        rd.run(&program, &mut stats);
        assert_eq!(stats.rd_iterations, program.functions.len());
    }
}

fn expand_phi(
    node: NodeId,
    phis_by_id: &FxHashMap<NodeId, &PhiNode>,
    out: &mut FxHashSet<NodeId>,
    seen: &mut FxHashSet<NodeId>,
) {
    if !seen.insert(node) {
        return;
    }
    match phis_by_id.get(&node) {
        Some(phi) => {
            for &operand in &phi.operands {
                expand_phi(operand, phis_by_id, out, seen);
            }
        }
        None => {
            out.insert(node);
        }
    }
}
