//! Two-phase backward reachability (design §4.6 "Algorithm"): phase 1
//! walks backward excluding parameter-out/return edges (never descend
//! into a callee through its return); phase 2 re-walks backward from
//! phase 1's result excluding call/parameter-in edges (never ascend into
//! a caller). A node is in the slice if either phase reaches it.

use crate::features::dependence::SystemDependenceGraph;
use crate::features::graph::Walker;
use crate::features::slicing::domain::SliceMarks;
use crate::shared::ir::NodeId;

pub struct TwoPhaseSlicer;

impl TwoPhaseSlicer {
    pub fn slice(sdg: &SystemDependenceGraph, criterion: &[NodeId], slice_id: u32, marks: &mut SliceMarks) {
        let phase_one = Walker::new(|n| {
            sdg.edges_into(n).iter().filter(|(_, k)| !k.excluded_in_phase_one()).map(|(n, _)| *n).collect()
        })
        .reachable_from_many(criterion.iter().copied());

        let phase_two = Walker::new(|n| {
            sdg.edges_into(n).iter().filter(|(_, k)| !k.excluded_in_phase_two()).map(|(n, _)| *n).collect()
        })
        .reachable_from_many(phase_one.iter().copied());

        for node in phase_one.into_iter().chain(phase_two) {
            marks.mark(node, slice_id);
        }
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

    fn chain_program() -> Program {
        let mut program = Program::new();
        let mut f = Function::new(1, "f", 10);
        let mut a = Instruction::new(10, NodeKind::Alloc);
        a.successors.push(11);
        let mut s = Instruction::new(11, NodeKind::Store).with_operands(vec![Operand::Node(10), Operand::Node(10)]);
        s.predecessors.push(10);
        s.successors.push(12);
        let mut l = Instruction::new(12, NodeKind::Load).with_operands(vec![Operand::Node(10)]);
        l.predecessors.push(11);
        f.add_instruction(a);
        f.add_instruction(s);
        f.add_instruction(l);
        program.functions.insert(1, f);
        program
    }

    #[test]
    fn criterion_pulls_in_its_feeding_store() {
        let program = chain_program();
        let pta: FxHashMap<u32, PointsToSet> = FxHashMap::default();
        let mut rd = RdAnalyzer::new(RdOptions { sparse: false, ..RdOptions::default() });
        rd.build(&program, &pta);
        rd.run(&program, &mut AnalysisStats::new());
        let sdg = SystemDependenceGraph::build(&program, &rd, &pta);

        let mut marks = SliceMarks::new();
        TwoPhaseSlicer::slice(&sdg, &[12], 1, &mut marks);
        assert!(marks.is_marked(12));
        assert!(marks.is_marked(11));
    }
}
