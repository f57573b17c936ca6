//! The concurrency feature's entry point: build thread regions and
//! critical sections from `FORK`/`LOCK` sites, then fold the resulting
//! interference edges into an already-built dependence graph. Runs only
//! when `PtaOptions::threads` is set (design §4.7); otherwise the caller
//! never constructs this analyzer.

use crate::features::concurrency::domain::{CriticalSection, InterferenceEdge, ThreadRegion};
use crate::features::concurrency::infrastructure::{InterferenceBuilder, RegionBuilder};
use crate::features::dependence::SystemDependenceGraph;
use crate::features::points_to::PointsToSet;
use crate::features::reaching_defs::RwGraph;
use crate::shared::ir::{NodeId, Program};
use rustc_hash::FxHashMap;
use tracing::info;

#[derive(Debug, Clone, Default)]
pub struct ConcurrencyAnalyzer {
    regions: Vec<ThreadRegion>,
    critical_sections: Vec<CriticalSection>,
    interference: Vec<InterferenceEdge>,
}

impl ConcurrencyAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn build(&mut self, program: &Program, rw: &RwGraph, pta: &FxHashMap<NodeId, PointsToSet>) {
        self.regions = RegionBuilder::build_regions(program, pta);
        self.critical_sections = RegionBuilder::build_critical_sections(program);
        self.interference = InterferenceBuilder::build(rw, &self.regions);
        info!(
            regions = self.regions.len(),
            critical_sections = self.critical_sections.len(),
            interference_edges = self.interference.len(),
            "thread regions modeled"
        );
    }

    /// Folds every discovered interference edge into `sdg` so the slicer's
    /// backward walk can follow them like any other dependence edge.
    pub fn annotate(&self, sdg: &mut SystemDependenceGraph) {
        for edge in &self.interference {
            sdg.add_interference_edge(edge.write, edge.read);
        }
    }

    pub fn regions(&self) -> &[ThreadRegion] {
        &self.regions
    }

    pub fn critical_sections(&self) -> &[CriticalSection] {
        &self.critical_sections
    }

    pub fn interference(&self) -> &[InterferenceEdge] {
        &self.interference
    }
}
