//! Runs every structural validator over a built analysis and accumulates
//! the counters in [`AnalysisStats`] (design §2 row "Validation &
//! statistics"): the program-graph validator before any analysis runs,
//! the dependence-graph validator once the SDG exists.

use crate::features::dependence::SystemDependenceGraph;
use crate::features::graph::BlockBuilder;
use crate::features::points_to::StructuralValidator;
use crate::features::validation::domain::AnalysisStats;
use crate::features::validation::infrastructure::SdgValidator;
use crate::shared::error::DiagnosticSink;
use crate::shared::ir::Program;

#[derive(Debug, Default)]
pub struct ValidationRunner {
    stats: AnalysisStats,
}

impl ValidationRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn validate_program(&self, program: &Program, sink: &mut DiagnosticSink) -> bool {
        StructuralValidator.validate(program, sink)
    }

    pub fn validate_sdg(&self, sdg: &SystemDependenceGraph, sink: &mut DiagnosticSink) -> bool {
        SdgValidator.validate(sdg, sink)
    }

    /// Tallies every function's basic blocks into `processed_blocks` —
    /// the driver's one call into `BlockBuilder` outside its own tests.
    pub fn record_blocks(&mut self, program: &Program) {
        for function in program.functions.values() {
            for _ in BlockBuilder::build(function) {
                self.stats.record_block();
            }
        }
    }

    pub fn stats(&self) -> &AnalysisStats {
        &self.stats
    }

    pub fn stats_mut(&mut self) -> &mut AnalysisStats {
        &mut self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::ir::{Function, Instruction, NodeKind};

    #[test]
    fn record_blocks_counts_every_function_block() {
        let mut program = Program::new();
        let mut f = Function::new(1, "f", 10);
        let mut a = Instruction::new(10, NodeKind::Alloc);
        a.successors.extend([11, 12]);
        let mut b = Instruction::new(11, NodeKind::Store);
        b.predecessors.push(10);
        let mut c = Instruction::new(12, NodeKind::Load);
        c.predecessors.push(10);
        f.add_instruction(a);
        f.add_instruction(b);
        f.add_instruction(c);
        program.functions.insert(1, f);

        let mut runner = ValidationRunner::new();
        runner.record_blocks(&program);
        assert_eq!(runner.stats().processed_blocks, 3);
    }
}
