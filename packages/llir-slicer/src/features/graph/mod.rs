//! Generic graph substrate shared by dominance, points-to, and slicing:
//! direction-parameterized traversal over the adapter's successor/
//! predecessor lists, and the basic-block grouping used for display and
//! bulk deletion.

pub mod domain;
pub mod infrastructure;

pub use domain::Direction;
pub use infrastructure::{walk_function, BlockBuilder, Walker};
