//! Reaching-definitions / memory-SSA: for every memory read, which writes
//! may have produced the value it sees, tracked per `(object, offset,
//! len)` site and resolved through the points-to analysis' aliasing.

pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::RdAnalyzer;
pub use domain::{DefSite, RdMap, ReachingSet};
pub use infrastructure::{ModRefSummary, RwGraph, UNKNOWN_MEMORY};
