use crate::features::graph::domain::Direction;
use crate::shared::ir::{Function, NodeId};
use rustc_hash::FxHashSet;
use std::collections::VecDeque;

/// A breadth-first walker parameterized over a neighbor function, reused
/// by every traversal in the crate instead of each stage hand-rolling its
/// own BFS: the PDF construction walks CFG successors, the slicer walks
/// dependence-graph predecessors with edge-kind exclusions applied inside
/// the neighbor closure itself.
pub struct Walker<'a, F>
where
    F: Fn(NodeId) -> Vec<NodeId> + 'a,
{
    neighbors: F,
    _marker: std::marker::PhantomData<&'a ()>,
}

impl<'a, F> Walker<'a, F>
where
    F: Fn(NodeId) -> Vec<NodeId> + 'a,
{
    pub fn new(neighbors: F) -> Self {
        Self { neighbors, _marker: std::marker::PhantomData }
    }

    /// Every node reachable from `start` (inclusive), following `neighbors`.
    pub fn reachable_from(&self, start: NodeId) -> FxHashSet<NodeId> {
        self.reachable_from_many(std::iter::once(start))
    }

    /// Every node reachable from any of `starts` (inclusive).
    pub fn reachable_from_many(&self, starts: impl IntoIterator<Item = NodeId>) -> FxHashSet<NodeId> {
        let mut visited = FxHashSet::default();
        let mut queue = VecDeque::new();
        for start in starts {
            if visited.insert(start) {
                queue.push_back(start);
            }
        }
        while let Some(node) = queue.pop_front() {
            for next in (self.neighbors)(node) {
                if visited.insert(next) {
                    queue.push_back(next);
                }
            }
        }
        visited
    }

    /// BFS visitation order from `start`, for callers that need a
    /// deterministic processing order rather than just set membership
    /// (e.g. the dense reaching-definitions iteration worklist seed).
    pub fn order_from(&self, start: NodeId) -> Vec<NodeId> {
        let mut visited = FxHashSet::default();
        let mut queue = VecDeque::from([start]);
        let mut order = Vec::new();
        visited.insert(start);
        while let Some(node) = queue.pop_front() {
            order.push(node);
            for next in (self.neighbors)(node) {
                if visited.insert(next) {
                    queue.push_back(next);
                }
            }
        }
        order
    }
}

/// A walker over a function's raw CFG, `Forward` following successors and
/// `Backward` following predecessors — the plain instruction-graph case
/// every direction-agnostic reachability query over a `Function` needs,
/// instead of each call site hand-rolling its own successors/predecessors
/// closure.
pub fn walk_function(function: &Function, direction: Direction) -> Walker<'_, impl Fn(NodeId) -> Vec<NodeId> + '_> {
    Walker::new(move |n| {
        function
            .instruction(n)
            .map(|i| match direction {
                Direction::Forward => i.successors.clone(),
                Direction::Backward => i.predecessors.clone(),
            })
            .unwrap_or_default()
    })
}
