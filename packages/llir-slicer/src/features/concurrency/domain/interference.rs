use crate::shared::ir::NodeId;

/// An edge the dependence graph doesn't otherwise have: a write in one
/// concurrently-reachable region and a may-alias read in another, per
/// design §4.7's "the dependence graph adds interference edges".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InterferenceEdge {
    pub write: NodeId,
    pub read: NodeId,
}
