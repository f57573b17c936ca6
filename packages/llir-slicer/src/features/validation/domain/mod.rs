mod stats;

pub use stats::AnalysisStats;
