//! Interference edges (design §4.7): a write in one concurrently-reachable
//! region that may alias a read in another. Regions here are every fork's
//! spawned-function body, plus — per fork — the window of the forker's own
//! code that runs concurrently with it: everything forward-reachable from
//! the `FORK` up to (not past) a correlated `JOIN`, or unboundedly if no
//! join was matched (design §4.7 "the join succeeds the fork's exit").

use crate::features::concurrency::domain::{InterferenceEdge, ThreadRegion};
use crate::features::graph::Walker;
use crate::features::reaching_defs::RwGraph;
use crate::shared::ir::NodeId;
use rustc_hash::FxHashSet;

pub struct InterferenceBuilder;

impl InterferenceBuilder {
    pub fn build(rw: &RwGraph, regions: &[ThreadRegion]) -> Vec<InterferenceEdge> {
        let forked: FxHashSet<NodeId> = regions.iter().flat_map(|r| r.nodes.iter().copied()).collect();

        let mut groups: Vec<FxHashSet<NodeId>> = Vec::new();
        for region in regions {
            groups.push(region.nodes.clone());
            let window: FxHashSet<NodeId> = Walker::new(|n: NodeId| {
                if Some(n) == region.join {
                    Vec::new()
                } else {
                    rw.node(n).map(|node| node.successors.clone()).unwrap_or_default()
                }
            })
            .reachable_from(region.fork)
            .into_iter()
            .filter(|id| !forked.contains(id))
            .collect();
            groups.push(window);
        }

        let mut edges = Vec::new();
        for (i, writers) in groups.iter().enumerate() {
            for (j, readers) in groups.iter().enumerate() {
                if i == j {
                    continue;
                }
                for &w in writers {
                    let Some(writer) = rw.node(w) else { continue };
                    let writes = writer.overwrites.iter().chain(writer.defs.iter());
                    for &r in readers {
                        let Some(reader) = rw.node(r) else { continue };
                        for write_site in writes.clone() {
                            if reader.uses.iter().any(|read_site| write_site.overlaps(read_site)) {
                                edges.push(InterferenceEdge { write: w, read: r });
                                break;
                            }
                        }
                    }
                }
            }
        }
        edges.sort_by_key(|e| (e.write, e.read));
        edges.dedup();
        edges
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::config::RdOptions;
    use crate::shared::ir::{Function, Instruction, NodeKind, Operand, Program};
    use crate::features::points_to::PointsToSet;
    use rustc_hash::FxHashMap;

    #[test]
    fn concurrent_writes_to_the_same_object_interfere() {
        let mut program = Program::new();
        let mut worker = Function::new(2, "worker", 20);
        let mut store = Instruction::new(20, NodeKind::Store).with_operands(vec![Operand::Node(1), Operand::Node(1)]);
        store.successors.push(21);
        let mut ret = Instruction::new(21, NodeKind::Return);
        ret.predecessors.push(20);
        worker.add_instruction(store);
        worker.add_instruction(ret);
        program.add_function(worker);

        let mut main = Function::new(1, "main", 10);
        let mut alloc = Instruction::new(1, NodeKind::Alloc);
        alloc.successors.push(10);
        let mut fork = Instruction::new(10, NodeKind::Fork).with_operands(vec![Operand::Symbol("worker".into())]);
        fork.predecessors.push(1);
        fork.successors.push(11);
        let mut load = Instruction::new(11, NodeKind::Load).with_operands(vec![Operand::Node(1)]);
        load.predecessors.push(10);
        main.add_instruction(alloc);
        main.add_instruction(fork);
        main.add_instruction(load);
        program.add_function(main);

        let mut pta: FxHashMap<NodeId, PointsToSet> = FxHashMap::default();
        let mut pts = PointsToSet::new();
        pts.insert(crate::features::points_to::Pointer::to_object(1, crate::features::offset::Offset::new(0)));
        pta.insert(1, pts.clone());
        pta.insert(11, pts);

        let rw = RwGraph::build(&program, &pta, &RdOptions::default());
        let regions = super::regions::RegionBuilder::build_regions(&program, &pta);
        let edges = InterferenceBuilder::build(&rw, &regions);
        assert!(edges.iter().any(|e| e.write == 20 && e.read == 11));
    }

    #[test]
    fn join_ends_the_concurrent_window_with_the_forker() {
        let mut program = Program::new();
        let mut worker = Function::new(2, "worker", 20);
        let mut store = Instruction::new(20, NodeKind::Store).with_operands(vec![Operand::Node(1), Operand::Node(1)]);
        store.successors.push(21);
        let mut ret = Instruction::new(21, NodeKind::Return);
        ret.predecessors.push(20);
        worker.add_instruction(store);
        worker.add_instruction(ret);
        program.add_function(worker);

        let mut main = Function::new(1, "main", 10);
        let mut alloc = Instruction::new(1, NodeKind::Alloc);
        alloc.successors.push(10);
        let mut fork = Instruction::new(10, NodeKind::Fork).with_operands(vec![Operand::Symbol("worker".into())]);
        fork.predecessors.push(1);
        fork.successors.push(12);
        let mut join = Instruction::new(12, NodeKind::Join).with_operands(vec![Operand::Node(10)]);
        join.predecessors.push(10);
        join.successors.push(11);
        let mut load = Instruction::new(11, NodeKind::Load).with_operands(vec![Operand::Node(1)]);
        load.predecessors.push(12);
        main.add_instruction(alloc);
        main.add_instruction(fork);
        main.add_instruction(join);
        main.add_instruction(load);
        program.add_function(main);

        let mut pta: FxHashMap<NodeId, PointsToSet> = FxHashMap::default();
        let mut pts = PointsToSet::new();
        pts.insert(crate::features::points_to::Pointer::to_object(1, crate::features::offset::Offset::new(0)));
        pta.insert(1, pts.clone());
        pta.insert(11, pts);

        let rw = RwGraph::build(&program, &pta, &RdOptions::default());
        let regions = super::regions::RegionBuilder::build_regions(&program, &pta);
        assert_eq!(regions[0].join, Some(12));
        let edges = InterferenceBuilder::build(&rw, &regions);
        assert!(!edges.iter().any(|e| e.write == 20 && e.read == 11), "load past the join should not interfere");
    }
}
