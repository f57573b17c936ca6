//! Iterative dominance/post-dominance, after Cooper, Harvey & Kennedy,
//! "A Simple, Fast Dominance Algorithm" (2001) — reverse-postorder
//! iteration with a "first processed predecessor, then intersect"
//! immediate-dominator update, the iterative fixpoint design §4.4 asks
//! for ("each block's immediate dominator is the closest common
//! dominator of its predecessors").

use crate::shared::ir::{Function, NodeId};
use rustc_hash::FxHashMap;

/// Sentinel standing in for a function's exit when it has more than one
/// `RETURN` node — a synthetic root for post-dominance that isn't a real
/// node ID (real IDs come from the host's allocator and never reach
/// `u32::MAX` in practice).
pub const VIRTUAL_EXIT: NodeId = u32::MAX;

#[derive(Debug, Clone, Default)]
pub struct DominatorTree {
    /// Immediate dominator of each node. The root maps to itself.
    pub idom: FxHashMap<NodeId, NodeId>,
    root: NodeId,
}

impl DominatorTree {
    /// Build the (forward) dominator tree rooted at `function.entry`.
    pub fn dominators(function: &Function) -> DominatorTree {
        Self::build(function.entry, &|id| {
            function.instruction(id).map(|i| i.predecessors.clone()).unwrap_or_default()
        }, &|id| function.instruction(id).map(|i| i.successors.clone()).unwrap_or_default())
    }

    /// Build the post-dominator tree: dominance on the reverse CFG,
    /// rooted at the function's unique exit (or [`VIRTUAL_EXIT`] if there
    /// are several `RETURN` nodes, with reverse edges synthesized to each
    /// of them).
    pub fn post_dominators(function: &Function) -> DominatorTree {
        let returns = function.return_nodes();
        let root = match returns.as_slice() {
            [single] => *single,
            _ => VIRTUAL_EXIT,
        };
        let preds = move |id: NodeId| -> Vec<NodeId> {
            if id == VIRTUAL_EXIT {
                Vec::new()
            } else {
                function.instruction(id).map(|i| i.successors.clone()).unwrap_or_default()
            }
        };
        let succs = move |id: NodeId| -> Vec<NodeId> {
            if id == VIRTUAL_EXIT {
                returns.clone()
            } else {
                function.instruction(id).map(|i| i.predecessors.clone()).unwrap_or_default()
            }
        };
        Self::build(root, &preds, &succs)
    }

    fn build(
        root: NodeId,
        predecessors_of: &dyn Fn(NodeId) -> Vec<NodeId>,
        successors_of: &dyn Fn(NodeId) -> Vec<NodeId>,
    ) -> DominatorTree {
        let order = reverse_postorder(root, successors_of);
        let rpo_index: FxHashMap<NodeId, usize> = order.iter().enumerate().map(|(i, &n)| (n, i)).collect();

        let mut idom: FxHashMap<NodeId, NodeId> = FxHashMap::default();
        idom.insert(root, root);

        let mut changed = true;
        while changed {
            changed = false;
            for &node in order.iter().filter(|&&n| n != root) {
                let preds = predecessors_of(node);
                let mut new_idom = None;
                for pred in preds {
                    if idom.contains_key(&pred) {
                        new_idom = Some(match new_idom {
                            None => pred,
                            Some(current) => intersect(current, pred, &idom, &rpo_index),
                        });
                    }
                }
                if let Some(new_idom) = new_idom {
                    if idom.get(&node) != Some(&new_idom) {
                        idom.insert(node, new_idom);
                        changed = true;
                    }
                }
            }
        }

        DominatorTree { idom, root }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn immediate_dominator(&self, node: NodeId) -> Option<NodeId> {
        if node == self.root {
            return None;
        }
        self.idom.get(&node).copied()
    }

    /// Whether `a` dominates `b` (every `a` dominates itself).
    pub fn dominates(&self, a: NodeId, b: NodeId) -> bool {
        if a == b {
            return true;
        }
        let mut cur = b;
        while let Some(&idom) = self.idom.get(&cur) {
            if idom == cur {
                return false;
            }
            if idom == a {
                return true;
            }
            cur = idom;
        }
        false
    }
}

fn intersect(
    mut a: NodeId,
    mut b: NodeId,
    idom: &FxHashMap<NodeId, NodeId>,
    rpo_index: &FxHashMap<NodeId, usize>,
) -> NodeId {
    while a != b {
        while rpo_index.get(&a) > rpo_index.get(&b) {
            a = idom[&a];
        }
        while rpo_index.get(&b) > rpo_index.get(&a) {
            b = idom[&b];
        }
    }
    a
}

fn reverse_postorder(root: NodeId, successors_of: &dyn Fn(NodeId) -> Vec<NodeId>) -> Vec<NodeId> {
    let mut visited = rustc_hash::FxHashSet::default();
    let mut postorder = Vec::new();
    let mut stack = vec![(root, false)];
    while let Some((node, expanded)) = stack.pop() {
        if expanded {
            postorder.push(node);
            continue;
        }
        if !visited.insert(node) {
            continue;
        }
        stack.push((node, true));
        for succ in successors_of(node) {
            if !visited.contains(&succ) {
                stack.push((succ, false));
            }
        }
    }
    postorder.reverse();
    postorder
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::ir::{Instruction, NodeKind};

    fn diamond() -> Function {
        let mut f = Function::new(1, "f", 10);
        let mut entry = Instruction::new(10, NodeKind::Alloc);
        entry.successors.extend([11, 12]);
        let mut left = Instruction::new(11, NodeKind::Store);
        left.predecessors.push(10);
        left.successors.push(13);
        let mut right = Instruction::new(12, NodeKind::Store);
        right.predecessors.push(10);
        right.successors.push(13);
        let mut join = Instruction::new(13, NodeKind::Phi);
        join.predecessors.extend([11, 12]);
        join.successors.push(14);
        let mut ret = Instruction::new(14, NodeKind::Return);
        ret.predecessors.push(13);
        f.add_instruction(entry);
        f.add_instruction(left);
        f.add_instruction(right);
        f.add_instruction(join);
        f.add_instruction(ret);
        f
    }

    #[test]
    fn diamond_join_is_dominated_only_by_entry() {
        let f = diamond();
        let dom = DominatorTree::dominators(&f);
        assert_eq!(dom.idom[&13], 10);
        assert!(dom.dominates(10, 13));
        assert!(!dom.dominates(11, 13));
    }

    #[test]
    fn single_return_is_post_dom_root() {
        let f = diamond();
        let pdom = DominatorTree::post_dominators(&f);
        assert_eq!(pdom.root(), 14);
        assert!(pdom.dominates(14, 10));
        assert!(pdom.dominates(13, 11));
    }

    #[test]
    fn multiple_returns_use_virtual_exit() {
        let mut f = Function::new(1, "f", 10);
        let mut entry = Instruction::new(10, NodeKind::Alloc);
        entry.successors.extend([11, 12]);
        let mut ret1 = Instruction::new(11, NodeKind::Return);
        ret1.predecessors.push(10);
        let mut ret2 = Instruction::new(12, NodeKind::Return);
        ret2.predecessors.push(10);
        f.add_instruction(entry);
        f.add_instruction(ret1);
        f.add_instruction(ret2);

        let pdom = DominatorTree::post_dominators(&f);
        assert_eq!(pdom.root(), VIRTUAL_EXIT);
        assert!(pdom.dominates(VIRTUAL_EXIT, 10));
    }
}
