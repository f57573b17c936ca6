mod blocks;
mod walker;

pub use blocks::BlockBuilder;
pub use walker::{walk_function, Walker};
