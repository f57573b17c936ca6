//! Points-to analysis: for every pointer-typed value, a conservative
//! over-approximation of the `(object, offset)` pairs it may designate.

pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::{PointsToAnalyzer, PointsToBuildError};
pub use domain::{Pointer, PointerTarget, PointsToSet};
pub use infrastructure::StructuralValidator;
