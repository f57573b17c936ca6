//! Per-node slice membership (design §4.6): a node's `slice_id` set is
//! nonzero-many, since "multiple criteria may be sliced into distinct
//! ids" and a node can sit in more than one criterion's slice at once.

use crate::shared::ir::NodeId;
use rustc_hash::{FxHashMap, FxHashSet};

#[derive(Debug, Clone, Default)]
pub struct SliceMarks {
    ids_by_node: FxHashMap<NodeId, FxHashSet<u32>>,
}

impl SliceMarks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark(&mut self, node: NodeId, slice_id: u32) {
        debug_assert_ne!(slice_id, 0, "slice_id 0 means \"not in any slice\"");
        self.ids_by_node.entry(node).or_default().insert(slice_id);
    }

    pub fn is_marked(&self, node: NodeId) -> bool {
        self.ids_by_node.contains_key(&node)
    }

    pub fn ids_for(&self, node: NodeId) -> Vec<u32> {
        self.ids_by_node.get(&node).map(|set| set.iter().copied().collect()).unwrap_or_default()
    }

    pub fn marked_nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.ids_by_node.keys().copied()
    }
}
