mod cutoff;
mod residual;
mod two_phase;

pub use cutoff::CutoffDiverging;
pub use residual::ResidualEmitter;
pub use two_phase::TwoPhaseSlicer;
