mod assignment_finder;
mod dense;
mod mod_ref;
mod rw_graph;
mod sparse;

pub use assignment_finder::AssignmentFinder;
pub use dense::DenseRdSolver;
pub use mod_ref::ModRefSummary;
pub use rw_graph::{RwGraph, RwNode, UNKNOWN_MEMORY};
pub use sparse::{PhiNode, SparseRdResult, SparseRdSolver};
