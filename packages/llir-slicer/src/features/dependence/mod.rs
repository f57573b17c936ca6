//! The (system) dependence graph: per-function control/data dependence
//! plus interprocedural parameter-passing and summary edges, the
//! structure the slicer's two-phase reachability walks.

pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::DependenceAnalyzer;
pub use domain::{EdgeKind, SdgNode};
pub use infrastructure::SystemDependenceGraph;
