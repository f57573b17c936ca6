//! Thread-region modeling (design §4.7): fork/join regions, lock/unlock
//! critical sections, and the interference edges they contribute to the
//! dependence graph. Optional — gated by `PtaOptions::threads`.

pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::ConcurrencyAnalyzer;
pub use domain::{CriticalSection, InterferenceEdge, ThreadRegion};
