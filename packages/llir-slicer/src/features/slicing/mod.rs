//! The slicer: two-phase backward reachability over the dependence graph,
//! plus the cutoff-diverging preprocessing pass and residual-program
//! emission (design §4.6).

pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::SlicerAnalyzer;
pub use domain::SliceMarks;
pub use infrastructure::{CutoffDiverging, ResidualEmitter, TwoPhaseSlicer};
