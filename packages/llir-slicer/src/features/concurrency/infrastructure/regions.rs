//! Builds thread regions from `FORK` sites and critical sections from
//! `LOCK`/`UNLOCK` pairs (design §4.7). Both are CFG-reachability problems
//! over the same `Walker` the rest of the crate traverses with; a critical
//! section just stops expanding once it reaches an `UNLOCK`.

use crate::features::concurrency::domain::{CriticalSection, ThreadRegion};
use crate::features::graph::{walk_function, Direction, Walker};
use crate::features::points_to::{PointerTarget, PointsToSet};
use crate::shared::ir::{Instruction, NodeId, NodeKind, Operand, Program};
use rustc_hash::FxHashMap;

pub struct RegionBuilder;

/// A `JOIN`'s thread-handle argument: its first node operand.
fn join_handle(instr: &Instruction) -> Option<NodeId> {
    instr.operands.iter().find_map(|op| if let Operand::Node(n) = op { Some(*n) } else { None })
}

/// Whether `handle` may-aliases `fork`'s own node (the object identity a
/// `FORK` is seeded with in the points-to graph, same convention as any
/// other object-producing instruction). A handle referencing the fork's
/// node directly (no intervening memory) matches without needing PTA at
/// all; otherwise fall back to the points-to set.
fn join_matches_fork(handle: NodeId, fork: NodeId, pta: &FxHashMap<NodeId, PointsToSet>) -> bool {
    handle == fork
        || pta.get(&handle).map(|set| set.valid_pointers().any(|p| p.target == PointerTarget::Object(fork))).unwrap_or(false)
}

fn find_matching_join(program: &Program, fork: NodeId, pta: &FxHashMap<NodeId, PointsToSet>) -> Option<NodeId> {
    program.functions.values().flat_map(|f| f.order.iter().filter_map(|&id| f.instruction(id))).find_map(|instr| {
        if instr.kind != NodeKind::Join {
            return None;
        }
        let handle = join_handle(instr)?;
        join_matches_fork(handle, fork, pta).then_some(instr.id)
    })
}

impl RegionBuilder {
    pub fn build_regions(program: &Program, pta: &FxHashMap<NodeId, PointsToSet>) -> Vec<ThreadRegion> {
        let mut regions = Vec::new();
        for function in program.functions.values() {
            for &id in &function.order {
                let Some(instr) = function.instruction(id) else { continue };
                if instr.kind != NodeKind::Fork {
                    continue;
                }
                let Some(target) = instr.operands.iter().find_map(|op| match op {
                    Operand::Symbol(name) => program.function_by_name(name),
                    _ => None,
                }) else {
                    continue;
                };
                let nodes = walk_function(target, Direction::Forward).reachable_from(target.entry);
                let join = find_matching_join(program, id, pta);
                regions.push(ThreadRegion { fork: id, function: target.id, nodes, join });
            }
        }
        regions
    }

    pub fn build_critical_sections(program: &Program) -> Vec<CriticalSection> {
        let mut sections = Vec::new();
        for function in program.functions.values() {
            for &lock in &function.order {
                let Some(instr) = function.instruction(lock) else { continue };
                if instr.kind != NodeKind::Lock {
                    continue;
                }
                let nodes = Walker::new(|n: NodeId| {
                    let is_unlock =
                        n != lock && function.instruction(n).map(|i| i.kind == NodeKind::Unlock).unwrap_or(false);
                    if is_unlock {
                        Vec::new()
                    } else {
                        function.instruction(n).map(|i| i.successors.clone()).unwrap_or_default()
                    }
                })
                .reachable_from(lock);
                let unlocks = nodes
                    .iter()
                    .copied()
                    .filter(|&id| function.instruction(id).map(|i| i.kind == NodeKind::Unlock).unwrap_or(false))
                    .collect();
                sections.push(CriticalSection { lock, unlocks, nodes });
            }
        }
        sections
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::ir::{Function, Instruction};

    #[test]
    fn fork_region_covers_the_spawned_function() {
        let mut program = Program::new();
        let mut worker = Function::new(2, "worker", 20);
        worker.add_instruction(Instruction::new(20, NodeKind::Return));
        program.add_function(worker);

        let mut main = Function::new(1, "main", 10);
        main.add_instruction(Instruction::new(10, NodeKind::Fork).with_operands(vec![Operand::Symbol("worker".into())]));
        program.add_function(main);

        let pta: FxHashMap<NodeId, PointsToSet> = FxHashMap::default();
        let regions = RegionBuilder::build_regions(&program, &pta);
        assert_eq!(regions.len(), 1);
        assert!(regions[0].contains(20));
        assert_eq!(regions[0].join, None);
    }

    #[test]
    fn join_on_the_forks_own_handle_is_matched_directly() {
        let mut program = Program::new();
        let mut worker = Function::new(2, "worker", 20);
        worker.add_instruction(Instruction::new(20, NodeKind::Return));
        program.add_function(worker);

        let mut main = Function::new(1, "main", 10);
        let mut fork = Instruction::new(10, NodeKind::Fork).with_operands(vec![Operand::Symbol("worker".into())]);
        fork.successors.push(11);
        let mut join = Instruction::new(11, NodeKind::Join).with_operands(vec![Operand::Node(10)]);
        join.predecessors.push(10);
        main.add_instruction(fork);
        main.add_instruction(join);
        program.add_function(main);

        let pta: FxHashMap<NodeId, PointsToSet> = FxHashMap::default();
        let regions = RegionBuilder::build_regions(&program, &pta);
        assert_eq!(regions[0].join, Some(11));
    }

    #[test]
    fn join_on_an_aliased_handle_is_matched_through_points_to() {
        let mut program = Program::new();
        let mut worker = Function::new(2, "worker", 20);
        worker.add_instruction(Instruction::new(20, NodeKind::Return));
        program.add_function(worker);

        let mut main = Function::new(1, "main", 10);
        let mut fork = Instruction::new(10, NodeKind::Fork).with_operands(vec![Operand::Symbol("worker".into())]);
        fork.successors.push(12);
        let mut load = Instruction::new(12, NodeKind::Load).with_operands(vec![Operand::Node(10)]);
        load.predecessors.push(10);
        load.successors.push(11);
        let mut join = Instruction::new(11, NodeKind::Join).with_operands(vec![Operand::Node(12)]);
        join.predecessors.push(12);
        main.add_instruction(fork);
        main.add_instruction(load);
        main.add_instruction(join);
        program.add_function(main);

        let mut pta: FxHashMap<NodeId, PointsToSet> = FxHashMap::default();
        let mut handle_pts = PointsToSet::new();
        handle_pts.insert(crate::features::points_to::Pointer::to_object(10, crate::features::offset::Offset::new(0)));
        pta.insert(12, handle_pts);

        let regions = RegionBuilder::build_regions(&program, &pta);
        assert_eq!(regions[0].join, Some(11));
    }

    #[test]
    fn critical_section_stops_at_matching_unlock() {
        let mut program = Program::new();
        let mut f = Function::new(1, "f", 10);
        let mut lock = Instruction::new(10, NodeKind::Lock);
        lock.successors.push(11);
        let mut body = Instruction::new(11, NodeKind::Store);
        body.predecessors.push(10);
        body.successors.push(12);
        let mut unlock = Instruction::new(12, NodeKind::Unlock);
        unlock.predecessors.push(11);
        unlock.successors.push(13);
        let mut after = Instruction::new(13, NodeKind::Return);
        after.predecessors.push(12);
        f.add_instruction(lock);
        f.add_instruction(body);
        f.add_instruction(unlock);
        f.add_instruction(after);
        program.add_function(f);

        let sections = RegionBuilder::build_critical_sections(&program);
        assert_eq!(sections.len(), 1);
        assert!(sections[0].contains(11));
        assert!(sections[0].contains(12));
        assert!(!sections[0].contains(13));
    }
}
