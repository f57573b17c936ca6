//! The points-to analyzer's public contract: `build`, `run`, `pointsTo`.

use crate::features::points_to::domain::PointsToSet;
use crate::features::points_to::infrastructure::{
    AndersenSolver, FlowSensitiveSolver, PointerGraph, StructuralValidator,
};
use crate::features::validation::domain::AnalysisStats;
use crate::shared::config::{AnalysisType, PtaOptions};
use crate::shared::error::Diagnostic;
use crate::shared::ir::{NodeId, Program};
use rustc_hash::FxHashMap;
use tracing::{debug, info, warn};

#[derive(Debug, thiserror::Error)]
pub enum PointsToBuildError {
    #[error("entry function '{0}' not found in program")]
    MissingEntry(String),
    #[error("structural validation failed: {0} error(s)")]
    Invalid(usize),
}

/// Whether the fixpoint converged or the iteration budget cut it off —
/// the latter isn't an error, just a reason to treat unprocessed nodes
/// conservatively (design §4.2 `maxIterations`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completeness {
    Complete,
    IncompleteIterationBudgetExceeded,
}

pub struct PointsToAnalyzer {
    options: PtaOptions,
    graph: Option<PointerGraph>,
    results: FxHashMap<NodeId, PointsToSet>,
    completeness: Completeness,
    diagnostics: Vec<Diagnostic>,
}

impl PointsToAnalyzer {
    pub fn new(options: PtaOptions) -> Self {
        Self {
            options,
            graph: None,
            results: FxHashMap::default(),
            completeness: Completeness::Complete,
            diagnostics: Vec::new(),
        }
    }

    /// Materialize the pointer-relevant subgraph — one subgraph per
    /// function plus globals — mirroring the CFG but restricted to the
    /// node kinds `NodeKind::is_pta_relevant` names.
    pub fn build(&mut self, program: &Program) -> Result<(), PointsToBuildError> {
        if program.function_by_name(&self.options.entry_function).is_none() {
            return Err(PointsToBuildError::MissingEntry(self.options.entry_function.clone()));
        }

        let mut sink = crate::shared::error::DiagnosticSink::new();
        let validator = StructuralValidator;
        validator.validate(program, &mut sink);
        let errors = sink.diagnostics().iter().filter(|d| d.is_error()).count();
        self.diagnostics = sink.into_diagnostics();
        if errors > 0 {
            return Err(PointsToBuildError::Invalid(errors));
        }

        debug!(functions = program.functions.len(), "building pointer subgraph");
        self.graph = Some(PointerGraph::build(program, &self.options));
        Ok(())
    }

    /// Run the fixpoint to convergence or until `max_iterations` is
    /// exhausted, recording each round and the final set sizes into
    /// `stats` (design §6 "analysis statistics").
    pub fn run(&mut self, stats: &mut AnalysisStats) {
        let graph = self.graph.as_ref().expect("build must be called before run");
        let (results, iterations, converged) = match self.options.analysis_type {
            AnalysisType::FlowInsensitive => {
                let mut solver = AndersenSolver::new(graph, &self.options);
                solver.solve()
            }
            AnalysisType::FlowSensitive | AnalysisType::FlowSensitiveWithInvalidation => {
                let invalidate = matches!(self.options.analysis_type, AnalysisType::FlowSensitiveWithInvalidation)
                    || self.options.invalidate_nodes;
                let mut solver = FlowSensitiveSolver::new(graph, &self.options, invalidate);
                solver.solve()
            }
        };
        for _ in 0..iterations {
            stats.record_pta_iteration();
        }
        for set in results.values() {
            stats.record_points_to_set(set.len());
        }
        self.results = results;
        if converged {
            info!(iterations, "points-to fixpoint converged");
            self.completeness = Completeness::Complete;
        } else {
            warn!(iterations, "points-to fixpoint hit the iteration budget");
            self.completeness = Completeness::IncompleteIterationBudgetExceeded;
        }
    }

    /// Never returns an empty set flagged "missing" — a never-analyzed
    /// value reports `{UNKNOWN_MEMORY}`, matching the design's contract.
    pub fn points_to(&self, value: NodeId) -> PointsToSet {
        self.results.get(&value).cloned().unwrap_or_else(PointsToSet::unknown)
    }

    pub fn has_points_to(&self, value: NodeId) -> bool {
        self.results.contains_key(&value)
    }

    /// The raw per-node results map, consulted by downstream stages
    /// (reaching-definitions' `RwGraph::build`) that need every node's set
    /// at once rather than one lookup at a time.
    pub fn results(&self) -> &FxHashMap<NodeId, PointsToSet> {
        &self.results
    }

    pub fn completeness(&self) -> Completeness {
        self.completeness
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn graph(&self) -> Option<&PointerGraph> {
        self.graph.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::ir::{Function, Instruction, NodeKind, Operand};

    fn alloc_and_return_program() -> Program {
        let mut program = Program::new();
        let mut f = Function::new(1, "main", 10);
        let mut alloc = Instruction::new(10, NodeKind::Alloc);
        alloc.successors.push(11);
        let mut ret = Instruction::new(11, NodeKind::Return).with_operands(vec![Operand::Node(10)]);
        ret.predecessors.push(10);
        f.add_instruction(alloc);
        f.add_instruction(ret);
        program.functions.insert(1, f);
        program
    }

    #[test]
    fn run_records_iterations_and_set_sizes_into_stats() {
        let program = alloc_and_return_program();
        let mut analyzer = PointsToAnalyzer::new(PtaOptions::default());
        analyzer.build(&program).expect("structurally valid program");
        let mut stats = AnalysisStats::new();
        analyzer.run(&mut stats);

        assert!(stats.pta_iterations > 0);
        assert!(stats.max_points_to_set_size >= 1);
    }
}
