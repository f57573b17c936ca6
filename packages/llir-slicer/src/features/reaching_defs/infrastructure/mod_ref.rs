//! Per-function Mod/Ref summaries, consumed by `RwGraph::build`'s own
//! fixpoint: once a callee's summary is known, a call site's effect becomes
//! the union of its callee(s)' `may_def`/`may_ref` instead of a blanket
//! unknown-memory read/write, without re-walking the callee's body.
//!
//! `must_def` is restricted to objects overwritten by a node that forward-
//! dominates every return of the function — i.e. writes that happen on
//! every path out, not just some. The dependence-graph builder's summary-
//! edge tabulation checks both sets against an argument's points-to set to
//! decide whether that argument feeds the call's aggregate output.

use crate::features::dominance::DominatorTree;
use crate::features::reaching_defs::infrastructure::rw_graph::RwGraph;
use crate::shared::ir::{Function, NodeId};
use rustc_hash::FxHashSet;

#[derive(Debug, Clone, Default)]
pub struct ModRefSummary {
    pub may_def: FxHashSet<NodeId>,
    pub may_ref: FxHashSet<NodeId>,
    pub must_def: FxHashSet<NodeId>,
}

impl ModRefSummary {
    pub fn compute(function: &Function, graph: &RwGraph) -> ModRefSummary {
        let mut may_def = FxHashSet::default();
        let mut may_ref = FxHashSet::default();

        for &id in &function.order {
            if let Some(rw) = graph.node(id) {
                may_def.extend(rw.defs.iter().chain(rw.overwrites.iter()).map(|s| s.target));
                may_ref.extend(rw.uses.iter().map(|s| s.target));
            }
        }

        let returns = function.return_nodes();
        let dom = DominatorTree::dominators(function);
        let mut must_def = FxHashSet::default();
        if !returns.is_empty() {
            for &id in &function.order {
                let Some(rw) = graph.node(id) else { continue };
                for site in &rw.overwrites {
                    if returns.iter().all(|&ret| dom.dominates(id, ret)) {
                        must_def.insert(site.target);
                    }
                }
            }
        }

        ModRefSummary { may_def, may_ref, must_def }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::offset::Offset;
    use crate::features::reaching_defs::domain::DefSite;
    use crate::features::reaching_defs::infrastructure::rw_graph::RwNode;
    use crate::shared::ir::{Instruction, NodeKind};
    use rustc_hash::FxHashMap;

    #[test]
    fn write_on_every_path_is_a_must_def() {
        let mut f = Function::new(1, "f", 10);
        let mut entry = Instruction::new(10, NodeKind::Store);
        entry.successors.push(11);
        let mut ret = Instruction::new(11, NodeKind::Return);
        ret.predecessors.push(10);
        f.add_instruction(entry);
        f.add_instruction(ret);

        let mut nodes = FxHashMap::default();
        nodes.insert(
            10,
            RwNode {
                kind: NodeKind::Store,
                function: 1,
                successors: vec![11],
                predecessors: vec![],
                defs: vec![],
                overwrites: vec![DefSite::new(20, Offset::new(0), Offset::new(4))],
                uses: vec![],
            },
        );
        nodes.insert(
            11,
            RwNode {
                kind: NodeKind::Return,
                function: 1,
                successors: vec![],
                predecessors: vec![10],
                defs: vec![],
                overwrites: vec![],
                uses: vec![],
            },
        );
        let graph = RwGraph { nodes, order: vec![10, 11], alloc_sites: vec![20] };

        let summary = ModRefSummary::compute(&f, &graph);
        assert!(summary.must_def.contains(&20));
        assert!(summary.may_def.contains(&20));
    }
}
