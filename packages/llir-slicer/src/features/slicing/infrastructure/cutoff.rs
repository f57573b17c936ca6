//! Cutoff-diverging preprocessing (design §4.6 "Preprocessing"): before the
//! dependence graph is built, drop CFG regions the criterion cannot be
//! reached from or cannot reach, so the graph builder and the two-phase
//! walk never have to consider them. Blocks with a still-relevant
//! predecessor are replaced by a diverging terminator rather than spliced
//! out, so every retained path is still a real path in the residual.
//!
//! Function-level relevance is call-graph connectivity to the criterion's
//! own function: conservative (a function several calls removed from the
//! criterion but still connected survives), which only under-cuts, never
//! over-cuts — the algorithm stays sound at the cost of some precision,
//! same tradeoff the opaque-call handling elsewhere in the crate makes.

use crate::features::graph::{walk_function, Direction, Walker};
use crate::shared::ir::{NodeId, NodeKind, Operand, Program};
use rustc_hash::{FxHashMap, FxHashSet};

pub struct CutoffDiverging;

impl CutoffDiverging {
    pub fn apply(program: &mut Program, criterion: &[NodeId]) {
        let criterion_functions: FxHashSet<NodeId> =
            criterion.iter().filter_map(|&id| program.find_instruction(id).map(|(f, _)| f.id)).collect();
        if criterion_functions.is_empty() {
            return;
        }

        let relevant_functions = Self::relevant_functions(program, &criterion_functions);
        let criterion_by_function = Self::group_by_function(program, criterion);

        let function_ids: Vec<NodeId> = program.functions.keys().copied().collect();
        for fid in function_ids {
            if !relevant_functions.contains(&fid) {
                continue;
            }
            let local_criterion = criterion_by_function.get(&fid).cloned().unwrap_or_default();
            Self::apply_to_function(program, fid, &local_criterion);
        }
    }

    /// Every function connected to a criterion function through the call
    /// graph, in either direction — callers might only matter because they
    /// reach the criterion through this call, callees might only matter
    /// because the criterion's function calls into them on the way back.
    fn relevant_functions(program: &Program, criterion_functions: &FxHashSet<NodeId>) -> FxHashSet<NodeId> {
        let mut callers: FxHashMap<NodeId, Vec<NodeId>> = FxHashMap::default();
        let mut callees: FxHashMap<NodeId, Vec<NodeId>> = FxHashMap::default();
        for function in program.functions.values() {
            for id in &function.order {
                let Some(instr) = function.instruction(*id) else { continue };
                if instr.kind != NodeKind::Call {
                    continue;
                }
                let Some(callee) = instr.operands.iter().find_map(|op| match op {
                    Operand::Symbol(name) => program.function_by_name(name),
                    _ => None,
                }) else {
                    continue;
                };
                callers.entry(callee.id).or_default().push(function.id);
                callees.entry(function.id).or_default().push(callee.id);
            }
        }

        let walker = Walker::new(move |fid: NodeId| {
            let mut neighbors = callers.get(&fid).cloned().unwrap_or_default();
            neighbors.extend(callees.get(&fid).cloned().unwrap_or_default());
            neighbors
        });
        walker.reachable_from_many(criterion_functions.iter().copied())
    }

    fn group_by_function(program: &Program, criterion: &[NodeId]) -> FxHashMap<NodeId, Vec<NodeId>> {
        let mut by_function: FxHashMap<NodeId, Vec<NodeId>> = FxHashMap::default();
        for &id in criterion {
            if let Some((f, _)) = program.find_instruction(id) {
                by_function.entry(f.id).or_default().push(id);
            }
        }
        by_function
    }

    fn apply_to_function(program: &mut Program, fid: NodeId, local_criterion: &[NodeId]) {
        let Some(function) = program.functions.get(&fid) else { return };
        let entry = function.entry;

        let forward = walk_function(function, Direction::Forward).reachable_from(entry);

        let seeds: Vec<NodeId> = function
            .order
            .iter()
            .copied()
            .filter(|&id| {
                local_criterion.contains(&id)
                    || function.instruction(id).map(|i| i.kind == NodeKind::Call).unwrap_or(false)
            })
            .collect();
        let backward = walk_function(function, Direction::Backward).reachable_from_many(seeds);

        let relevant: FxHashSet<NodeId> = forward.intersection(&backward).copied().collect();
        let irrelevant: Vec<NodeId> = function.order.iter().copied().filter(|id| !relevant.contains(id)).collect();

        if irrelevant.is_empty() {
            return;
        }

        for &id in &irrelevant {
            if let Some(f) = program.functions.get_mut(&fid) {
                f.delete_instruction(id);
            }
        }

        // A relevant node whose only way forward led into now-deleted code
        // is left with no successor; if it isn't itself a terminator, give
        // it a diverging one so the residual CFG stays well-formed.
        let dangling: Vec<NodeId> = program
            .functions
            .get(&fid)
            .map(|f| {
                relevant
                    .iter()
                    .copied()
                    .filter(|&id| {
                        f.instruction(id)
                            .map(|i| i.successors.is_empty() && i.kind != NodeKind::Return)
                            .unwrap_or(false)
                    })
                    .collect()
            })
            .unwrap_or_default();

        for id in dangling {
            program.insert_diverging_stub(fid, id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::ir::{Function, Instruction};

    fn branching_function() -> Function {
        let mut f = Function::new(1, "f", 10);
        let mut entry = Instruction::new(10, NodeKind::Call).with_operands(vec![Operand::Symbol("getidx".into())]);
        entry.successors.extend([11, 12]);
        let mut dead = Instruction::new(11, NodeKind::Store);
        dead.predecessors.push(10);
        dead.successors.push(13);
        let mut live = Instruction::new(12, NodeKind::Store);
        live.predecessors.push(10);
        live.successors.push(13);
        let mut join = Instruction::new(13, NodeKind::Return);
        join.predecessors.extend([11, 12]);
        f.add_instruction(entry);
        f.add_instruction(dead);
        f.add_instruction(live);
        f.add_instruction(join);
        f
    }

    #[test]
    fn both_merging_arms_survive_when_both_reach_the_criterion() {
        let mut program = Program::new();
        program.add_function(branching_function());
        CutoffDiverging::apply(&mut program, &[13]);
        let f = &program.functions[&1];
        assert!(f.instruction(11).is_some());
        assert!(f.instruction(12).is_some());
    }

    #[test]
    fn unrelated_function_is_left_untouched() {
        let mut program = Program::new();
        program.add_function(branching_function());
        let mut unrelated = Function::new(2, "g", 20);
        unrelated.add_instruction(Instruction::new(20, NodeKind::Return));
        program.add_function(unrelated);
        CutoffDiverging::apply(&mut program, &[13]);
        assert!(program.functions[&2].instruction(20).is_some());
    }
}
