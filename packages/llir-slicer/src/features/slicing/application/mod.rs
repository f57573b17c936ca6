//! The slicer's public contract: `slice(program, rd, criterion) ->
//! residual_program`, orchestrating cutoff, dependence-graph construction,
//! and the two-phase mark before handing the residual back to the caller.

use crate::features::concurrency::ConcurrencyAnalyzer;
use crate::features::dependence::DependenceAnalyzer;
use crate::features::points_to::PointsToSet;
use crate::features::reaching_defs::RdAnalyzer;
use crate::features::slicing::domain::SliceMarks;
use crate::features::slicing::infrastructure::{CutoffDiverging, ResidualEmitter, TwoPhaseSlicer};
use crate::shared::config::SlicerOptions;
use crate::shared::ir::{NodeId, Program};
use rustc_hash::FxHashMap;
use tracing::{info, warn};

pub struct SlicerAnalyzer {
    options: SlicerOptions,
}

impl SlicerAnalyzer {
    pub fn new(options: SlicerOptions) -> Self {
        Self { options }
    }

    /// Slices `program` on `criterion`, returning a fresh residual program.
    /// `rd` must already have been run over `program` (the design's
    /// teardown order runs the other way: slicer sits above SDG, which
    /// sits above reaching-definitions).
    pub fn slice(
        &self,
        program: &Program,
        rd: &RdAnalyzer,
        pta: &FxHashMap<NodeId, PointsToSet>,
        criterion: &[NodeId],
    ) -> Program {
        self.slice_inner(program, rd, pta, criterion, None)
    }

    /// As [`Self::slice`], but folds `concurrency`'s interference edges into
    /// the dependence graph first, so writes and reads the thread-region
    /// pass found concurrently reachable can pull each other into the
    /// slice (design §4.7).
    pub fn slice_with_concurrency(
        &self,
        program: &Program,
        rd: &RdAnalyzer,
        pta: &FxHashMap<NodeId, PointsToSet>,
        criterion: &[NodeId],
        concurrency: &ConcurrencyAnalyzer,
    ) -> Program {
        self.slice_inner(program, rd, pta, criterion, Some(concurrency))
    }

    fn slice_inner(
        &self,
        program: &Program,
        rd: &RdAnalyzer,
        pta: &FxHashMap<NodeId, PointsToSet>,
        criterion: &[NodeId],
        concurrency: Option<&ConcurrencyAnalyzer>,
    ) -> Program {
        if criterion.is_empty() {
            warn!("slicing criterion is empty, returning the empty program");
            return Program::new();
        }

        let mut residual = program.clone();
        if self.options.cutoff_diverging {
            CutoffDiverging::apply(&mut residual, criterion);
        }

        let mut dependence = DependenceAnalyzer::new();
        dependence.build(&residual, rd, pta);
        let mut sdg = dependence.into_graph().expect("build just populated it");
        if let Some(concurrency) = concurrency {
            concurrency.annotate(&mut sdg);
        }

        let mut marks = SliceMarks::new();
        TwoPhaseSlicer::slice(&sdg, criterion, 1, &mut marks);

        let kept = marks.marked_nodes().count();
        info!(criterion = criterion.len(), kept, "slice computed");

        ResidualEmitter::emit(&mut residual, &marks);
        residual
    }
}
