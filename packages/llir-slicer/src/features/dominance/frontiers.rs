//! Post-dominance frontiers, computed bottom-up over the post-dominator
//! tree: process post-dom-tree nodes in BFS order from the root, then walk that
//! list back-to-front so every node's post-dominators have already had
//! their own frontiers computed (`DFlocal` plus the "frontier of a
//! post-dominator, if it isn't this node" recursive step).

use super::dominator_tree::DominatorTree;
use crate::shared::ir::{Function, NodeId};
use rustc_hash::FxHashMap;
use std::collections::VecDeque;

#[derive(Debug, Clone, Default)]
pub struct PostDominanceFrontiers {
    frontiers: FxHashMap<NodeId, Vec<NodeId>>,
    /// Reverse of the frontier relation: `control_dependents[b]` lists
    /// nodes control-dependent on `b`, populated only when `compute` is
    /// called with `add_cd = true`.
    control_dependents: FxHashMap<NodeId, Vec<NodeId>>,
}

impl PostDominanceFrontiers {
    pub fn frontier(&self, node: NodeId) -> &[NodeId] {
        self.frontiers.get(&node).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn control_dependents_of(&self, node: NodeId) -> &[NodeId] {
        self.control_dependents.get(&node).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn compute(function: &Function, pdom: &DominatorTree, add_cd: bool) -> PostDominanceFrontiers {
        let children = children_of(pdom);
        let order = bfs_from_root(pdom.root(), &children);

        let mut result = PostDominanceFrontiers::default();

        for &bb in order.iter().rev() {
            let mut frontier: Vec<NodeId> = Vec::new();

            for pred in pdom_predecessors(function, bb) {
                if let Some(ipdom) = pdom.immediate_dominator(pred) {
                    if ipdom != bb && !frontier.contains(&pred) {
                        frontier.push(pred);
                        if add_cd {
                            result.control_dependents.entry(pred).or_default().push(bb);
                        }
                    }
                } else if pred != pdom.root() {
                    frontier.push(pred);
                    if add_cd {
                        result.control_dependents.entry(pred).or_default().push(bb);
                    }
                }
            }

            for pdominated in post_dominated_by(pdom, bb, &order) {
                let df_of_pdominated = result.frontiers.get(&pdominated).cloned().unwrap_or_default();
                for df in df_of_pdominated {
                    let ipdom = pdom.immediate_dominator(df);
                    let not_own_idom = ipdom != Some(bb);
                    if not_own_idom && df != bb && !frontier.contains(&df) {
                        frontier.push(df);
                        if add_cd {
                            result.control_dependents.entry(df).or_default().push(bb);
                        }
                    }
                }
            }

            result.frontiers.insert(bb, frontier);
        }

        result
    }
}

fn children_of(pdom: &DominatorTree) -> FxHashMap<NodeId, Vec<NodeId>> {
    let mut children: FxHashMap<NodeId, Vec<NodeId>> = FxHashMap::default();
    for (&node, &parent) in &pdom.idom {
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

/// `bb`'s predecessors in the *forward* CFG — these are the edges
/// `DFlocal` is computed from when walking the post-dominator tree.
fn pdom_predecessors(function: &Function, bb: NodeId) -> Vec<NodeId> {
    if bb == super::dominator_tree::VIRTUAL_EXIT {
        function.return_nodes()
    } else {
        function.instruction(bb).map(|i| i.predecessors.clone()).unwrap_or_default()
    }
}

/// Every node in `order` that `bb` post-dominates (i.e. every descendant
/// of `bb` in the post-dom tree, found via the precomputed BFS order —
/// cheaper than re-walking `dominates` for each pair).
fn post_dominated_by(pdom: &DominatorTree, bb: NodeId, order: &[NodeId]) -> Vec<NodeId> {
    order.iter().copied().filter(|&n| n != bb && pdom.dominates(bb, n)).collect()
}
