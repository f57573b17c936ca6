//! Thread regions and critical sections (design §4.7): a region is the set
//! of nodes reachable from a `FORK`ed function's entry; a critical section
//! is every node on a CFG path between a `LOCK` and its matching `UNLOCK`s.

use crate::shared::ir::NodeId;
use rustc_hash::FxHashSet;

#[derive(Debug, Clone)]
pub struct ThreadRegion {
    pub fork: NodeId,
    pub function: NodeId,
    pub nodes: FxHashSet<NodeId>,
    /// The `JOIN` whose handle argument may-aliases this fork's handle, if
    /// one was found. `None` means no join correlates with this fork, so
    /// every reachable node past the fork stays concurrent with it.
    pub join: Option<NodeId>,
}

impl ThreadRegion {
    pub fn contains(&self, node: NodeId) -> bool {
        self.nodes.contains(&node)
    }
}

#[derive(Debug, Clone)]
pub struct CriticalSection {
    pub lock: NodeId,
    pub unlocks: Vec<NodeId>,
    pub nodes: FxHashSet<NodeId>,
}

impl CriticalSection {
    pub fn contains(&self, node: NodeId) -> bool {
        self.nodes.contains(&node)
    }
}
