//! The dependence analyzer's public contract: `build` the SDG from an
//! already-run reaching-definitions analysis.

use crate::features::dependence::infrastructure::SystemDependenceGraph;
use crate::features::points_to::PointsToSet;
use crate::features::reaching_defs::RdAnalyzer;
use crate::shared::ir::{NodeId, Program};
use rustc_hash::FxHashMap;
use tracing::info;

pub struct DependenceAnalyzer {
    sdg: Option<SystemDependenceGraph>,
}

impl DependenceAnalyzer {
    pub fn new() -> Self {
        Self { sdg: None }
    }

    pub fn build(&mut self, program: &Program, rd: &RdAnalyzer, pta: &FxHashMap<NodeId, PointsToSet>) {
        let sdg = SystemDependenceGraph::build(program, rd, pta);
        info!(functions = program.functions.len(), "system dependence graph built");
        self.sdg = Some(sdg);
    }

    pub fn graph(&self) -> Option<&SystemDependenceGraph> {
        self.sdg.as_ref()
    }

    /// Takes ownership of the built graph, for a caller (the slicer) that
    /// goes on to mutate it in place (e.g. folding in interference edges)
    /// rather than just querying it.
    pub fn into_graph(self) -> Option<SystemDependenceGraph> {
        self.sdg
    }
}

impl Default for DependenceAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}
