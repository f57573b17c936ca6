mod interference;
mod regions;

pub use interference::InterferenceBuilder;
pub use regions::RegionBuilder;
