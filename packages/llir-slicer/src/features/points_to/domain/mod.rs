mod pointer;
mod points_to_set;

pub use pointer::{Pointer, PointerTarget};
pub use points_to_set::PointsToSet;
