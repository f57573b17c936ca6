mod sdg;

pub use sdg::SystemDependenceGraph;
