//! Structural validation of an already-built dependence graph (design §7
//! "Graph invariant violated"): every edge endpoint must name a node the
//! builder actually registered, and a synthetic parameter/summary node must
//! carry at least one edge — an orphan means the builder's bookkeeping
//! (formal_in/formal_out/call_actuals maps) is out of sync with the edges
//! it emitted.

use crate::features::dependence::SystemDependenceGraph;
use crate::shared::error::DiagnosticSink;

pub struct SdgValidator;

impl SdgValidator {
    pub fn validate(&self, sdg: &SystemDependenceGraph, sink: &mut DiagnosticSink) -> bool {
        for node in sdg.nodes() {
            let touches_anything = !sdg.edges_from(node).is_empty() || !sdg.edges_into(node).is_empty();
            if !touches_anything {
                sink.warning(format!("node {node} has no incoming or outgoing dependence edge"));
            }
            for &(to, _) in sdg.edges_from(node) {
                if sdg.node_kind(to).is_none() {
                    sink.error(format!("edge from {node} targets unregistered node {to}"));
                }
            }
            for &(from, _) in sdg.edges_into(node) {
                if sdg.node_kind(from).is_none() {
                    sink.error(format!("edge into {node} originates from unregistered node {from}"));
                }
            }
        }
        sink.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::points_to::PointsToSet;
    use crate::features::reaching_defs::RdAnalyzer;
    use crate::features::validation::domain::AnalysisStats;
    use crate::shared::config::RdOptions;
    use crate::shared::ir::{Function, Instruction, NodeKind, Operand, Program};
    use rustc_hash::FxHashMap;

    #[test]
    fn well_formed_sdg_passes() {
        let mut program = Program::new();
        let mut f = Function::new(1, "f", 10);
        let mut a = Instruction::new(10, NodeKind::Alloc);
        a.successors.push(11);
        let mut r = Instruction::new(11, NodeKind::Return).with_operands(vec![Operand::Node(10)]);
        r.predecessors.push(10);
        f.add_instruction(a);
        f.add_instruction(r);
        program.functions.insert(1, f);

        let pta: FxHashMap<u32, PointsToSet> = FxHashMap::default();
        let mut rd = RdAnalyzer::new(RdOptions { sparse: false, ..RdOptions::default() });
        rd.build(&program, &pta);
        rd.run(&program, &mut AnalysisStats::new());
        let sdg = SystemDependenceGraph::build(&program, &rd, &pta);

        let mut sink = DiagnosticSink::new();
        assert!(SdgValidator.validate(&sdg, &mut sink));
    }
}
