//! Forward dominance frontiers, via the same bottom-up-over-the-dominator-
//! tree construction as [`super::frontiers::PostDominanceFrontiers`], but
//! walking the CFG forward instead of backward — the shape reaching-defs'
//! sparse/memory-SSA builder (design §4.3) needs for phi placement:
//! `DF(B) = {Y ∈ succ(B) | IDom(Y) ≠ B} ∪ {Y ∈ DF(C) | C a child of B in the
//! dominator tree, IDom(Y) ≠ B, Y ≠ B}`.

use super::dominator_tree::DominatorTree;
use crate::shared::ir::{Function, NodeId};
use rustc_hash::FxHashMap;
use std::collections::VecDeque;

#[derive(Debug, Clone, Default)]
pub struct DominanceFrontiers {
    frontiers: FxHashMap<NodeId, Vec<NodeId>>,
}

impl DominanceFrontiers {
    pub fn frontier(&self, node: NodeId) -> &[NodeId] {
        self.frontiers.get(&node).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn compute(function: &Function, dom: &DominatorTree) -> DominanceFrontiers {
        let children = children_of(dom);
        let order = bfs_from_root(dom.root(), &children);

        let mut result = DominanceFrontiers::default();

        for &bb in order.iter().rev() {
            let mut frontier: Vec<NodeId> = Vec::new();

            let successors = function.instruction(bb).map(|i| i.successors.clone()).unwrap_or_default();
            for succ in successors {
                let dominated_by_bb = dom.immediate_dominator(succ) == Some(bb);
                if !dominated_by_bb && !frontier.contains(&succ) {
                    frontier.push(succ);
                }
            }

            for &child in children.get(&bb).into_iter().flatten() {
                let df_of_child = result.frontiers.get(&child).cloned().unwrap_or_default();
                for y in df_of_child {
                    if dom.immediate_dominator(y) != Some(bb) && y != bb && !frontier.contains(&y) {
                        frontier.push(y);
                    }
                }
            }

            result.frontiers.insert(bb, frontier);
        }

        result
    }
}

fn children_of(dom: &DominatorTree) -> FxHashMap<NodeId, Vec<NodeId>> {
    let mut children: FxHashMap<NodeId, Vec<NodeId>> = FxHashMap::default();
    for (&node, &parent) in &dom.idom {
        if node != parent {
            children.entry(parent).or_default().push(node);
        }
    }
    children
}

fn bfs_from_root(root: NodeId, children: &FxHashMap<NodeId, Vec<NodeId>>) -> Vec<NodeId> {
    let mut order = Vec::new();
    let mut queue = VecDeque::from([root]);
    let mut seen = rustc_hash::FxHashSet::default();
    seen.insert(root);
    while let Some(node) = queue.pop_front() {
        order.push(node);
        if let Some(kids) = children.get(&node) {
            for &kid in kids {
                if seen.insert(kid) {
                    queue.push_back(kid);
                }
            }
        }
    }
    order
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::ir::{Instruction, NodeKind};

    fn branch_then_join() -> Function {
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
        f.add_instruction(entry);
        f.add_instruction(left);
        f.add_instruction(right);
        f.add_instruction(join);
        f
    }

    #[test]
    fn join_block_is_the_frontier_of_both_arms() {
        let f = branch_then_join();
        let dom = DominatorTree::dominators(&f);
        let df = DominanceFrontiers::compute(&f, &dom);
        assert_eq!(df.frontier(11), &[13]);
        assert_eq!(df.frontier(12), &[13]);
        assert!(df.frontier(10).is_empty());
    }
}
