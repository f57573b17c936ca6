mod interference;
mod region;

pub use interference::InterferenceEdge;
pub use region::{CriticalSection, ThreadRegion};
