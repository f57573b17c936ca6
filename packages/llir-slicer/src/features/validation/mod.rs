//! Structural validators plus the statistics counters the driver reports
//! (design §6 "Outputs", §7 "Graph invariant violated").

pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::ValidationRunner;
pub use domain::AnalysisStats;
pub use infrastructure::SdgValidator;
