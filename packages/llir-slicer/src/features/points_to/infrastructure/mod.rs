mod andersen;
mod flow_sensitive;
mod pointer_graph;
mod validator;

pub use andersen::AndersenSolver;
pub use flow_sensitive::FlowSensitiveSolver;
pub use pointer_graph::{PGNode, PointerGraph};
pub use validator::StructuralValidator;
