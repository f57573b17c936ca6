use crate::shared::config::PtaOptions;
use crate::shared::ir::{Initializer, NodeId, NodeKind, Operand, Program};
use rustc_hash::FxHashMap;

/// A node of the pointer-relevant subgraph: a copy of the instruction's
/// kind and operands, restricted to the node kinds
/// `NodeKind::is_pta_relevant` names (design §4.2 `build`).
#[derive(Debug, Clone)]
pub struct PGNode {
    pub kind: NodeKind,
    pub operands: Vec<Operand>,
    pub function: NodeId,
    /// For `CALL` nodes only: the node receiving the callee's return value.
    pub call_return: Option<NodeId>,
    /// Copied from the host instruction's `type_size`, where one exists.
    /// Used as a coarse "bit-castable" proxy when resolving an indirect
    /// call's candidate targets: two operands of the same size are assumed
    /// compatible, an unknown size is permissive (assumed compatible).
    pub type_size: Option<u64>,
    /// Raw (unfiltered) CFG successors/predecessors, carried over from the
    /// host instruction so the flow-sensitive solver can walk the CFG
    /// without re-touching the host `Program`. Non-relevant intermediate
    /// nodes are skipped transparently by the walk, not removed here.
    pub successors: Vec<NodeId>,
    pub predecessors: Vec<NodeId>,
    /// `PtaOptions::preprocess_geps` precomputed: true when this `GEP`'s
    /// constant shift operand alone already exceeds
    /// `field_sensitivity_bound`, so every solver pass can skip the
    /// per-iteration offset arithmetic and collapse straight to
    /// `Offset::UNKNOWN`. Always `false` for non-`GEP` nodes.
    pub gep_saturates: bool,
}

/// The materialized pointer-relevant subgraph, plus enough bookkeeping
/// (global initializer stores, each function's return-value node, each
/// function's formal parameter list) for the solver to wire up calls and
/// global initialization without re-touching the host `Program`.
#[derive(Debug, Clone)]
pub struct PointerGraph {
    pub nodes: FxHashMap<NodeId, PGNode>,
    pub order: Vec<NodeId>,
    /// Synthetic stores for global initialization: `(global_id, Initializer)`.
    pub global_inits: Vec<(NodeId, Initializer)>,
    /// `function name -> (entry node, params, return value node if any)`.
    pub functions: FxHashMap<String, FunctionShape>,
    pub function_ids: FxHashMap<NodeId, String>,
}

#[derive(Debug, Clone)]
pub struct FunctionShape {
    pub id: NodeId,
    pub entry: NodeId,
    pub params: Vec<NodeId>,
    pub is_variadic: bool,
    pub return_value: Option<NodeId>,
}

/// Follow raw CFG edges from `start`, skipping over nodes the pointer
/// subgraph doesn't include, until relevant nodes (or a dead end) are
/// reached.
fn relevant_frontier(
    function: &crate::shared::ir::Function,
    starts: impl IntoIterator<Item = NodeId>,
    next: impl Fn(&crate::shared::ir::Instruction) -> &[NodeId],
) -> Vec<NodeId> {
    use rustc_hash::FxHashSet;
    let mut seen = FxHashSet::default();
    let mut frontier = Vec::new();
    let mut stack: Vec<NodeId> = starts.into_iter().collect();
    while let Some(id) = stack.pop() {
        if !seen.insert(id) {
            continue;
        }
        match function.instruction(id) {
            Some(instr) if instr.kind.is_pta_relevant() => frontier.push(id),
            Some(instr) => stack.extend(next(instr).iter().copied()),
            None => {}
        }
    }
    frontier
}

/// True when a `GEP`'s constant shift operand already exceeds `bound` on
/// its own, so the resulting offset saturates to `Offset::UNKNOWN`
/// regardless of the base pointer's own offset (offset arithmetic here is
/// non-negative and saturating, so adding a base offset can only push the
/// sum further past `bound`, never back under it).
fn gep_known_to_saturate(operands: &[Operand], bound: u64) -> bool {
    operands.iter().any(|op| matches!(op, Operand::ConstOffset(v) if *v > bound))
}

impl PointerGraph {
    pub fn build(program: &Program, options: &PtaOptions) -> PointerGraph {
        let mut nodes = FxHashMap::default();
        let mut order = Vec::new();
        let mut functions = FxHashMap::default();
        let mut function_ids = FxHashMap::default();

        for function in program.functions.values() {
            function_ids.insert(function.id, function.name.clone());
            let return_value = function
                .return_nodes()
                .first()
                .and_then(|&rid| function.instruction(rid))
                .and_then(|ret| ret.operands.first())
                .and_then(|op| if let Operand::Node(n) = op { Some(*n) } else { None });

            functions.insert(
                function.name.clone(),
                FunctionShape {
                    id: function.id,
                    entry: function.entry,
                    params: function.params.clone(),
                    is_variadic: function.is_variadic,
                    return_value,
                },
            );

            // A formal parameter may have no instruction of its own in the
            // host IR (it's just a value other instructions reference); give
            // it a placeholder node so the solver has somewhere to
            // accumulate the union of bound actual arguments.
            for &param in &function.params {
                let type_size = function.instruction(param).and_then(|i| i.type_size);
                nodes.entry(param).or_insert_with(|| PGNode {
                    kind: NodeKind::Noop,
                    operands: Vec::new(),
                    function: function.id,
                    call_return: None,
                    type_size,
                    successors: Vec::new(),
                    predecessors: Vec::new(),
                    gep_saturates: false,
                });
            }

            for &id in &function.order {
                let Some(instr) = function.instruction(id) else { continue };
                if !instr.kind.is_pta_relevant() {
                    continue;
                }
                let call_return = if instr.kind == NodeKind::Call {
                    instr.successors.iter().copied().find(|&s| {
                        function.instruction(s).map(|n| n.kind == NodeKind::CallReturn).unwrap_or(false)
                    })
                } else {
                    None
                };
                let successors = relevant_frontier(function, instr.successors.iter().copied(), |i| &i.successors);
                let predecessors =
                    relevant_frontier(function, instr.predecessors.iter().copied(), |i| &i.predecessors);
                let gep_saturates = options.preprocess_geps
                    && instr.kind == NodeKind::Gep
                    && gep_known_to_saturate(&instr.operands, options.field_sensitivity_bound);
                nodes.insert(
                    id,
                    PGNode {
                        kind: instr.kind,
                        operands: instr.operands.clone(),
                        function: function.id,
                        call_return,
                        type_size: instr.type_size,
                        successors,
                        predecessors,
                        gep_saturates,
                    },
                );
                order.push(id);
            }
        }

        let mut global_inits = Vec::new();
        for global in program.globals.values() {
            nodes.insert(
                global.id,
                PGNode {
                    kind: NodeKind::Alloc,
                    operands: Vec::new(),
                    function: 0,
                    call_return: None,
                    type_size: None,
                    successors: Vec::new(),
                    predecessors: Vec::new(),
                    gep_saturates: false,
                },
            );
            order.push(global.id);
            global_inits.push((global.id, global.initializer.clone()));
        }

        PointerGraph { nodes, order, global_inits, functions, function_ids }
    }

    pub fn node(&self, id: NodeId) -> Option<&PGNode> {
        self.nodes.get(&id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::ir::{Function, Instruction, Program};

    fn gep_program(shift: u64) -> Program {
        let mut program = Program::new();
        let mut f = Function::new(1, "f", 10);
        let mut alloc = Instruction::new(10, NodeKind::Alloc);
        alloc.successors.push(11);
        let mut gep = Instruction::new(11, NodeKind::Gep)
            .with_operands(vec![Operand::Node(10), Operand::ConstOffset(shift)]);
        gep.predecessors.push(10);
        f.add_instruction(alloc);
        f.add_instruction(gep);
        program.functions.insert(1, f);
        program
    }

    #[test]
    fn gep_past_bound_is_flagged_saturating_when_preprocessing_is_on() {
        let options = PtaOptions { field_sensitivity_bound: 16, preprocess_geps: true, ..PtaOptions::default() };
        let program = gep_program(1000);
        let graph = PointerGraph::build(&program, &options);
        assert!(graph.node(11).unwrap().gep_saturates);
    }

    #[test]
    fn gep_within_bound_is_not_flagged() {
        let options = PtaOptions { field_sensitivity_bound: 16, preprocess_geps: true, ..PtaOptions::default() };
        let program = gep_program(4);
        let graph = PointerGraph::build(&program, &options);
        assert!(!graph.node(11).unwrap().gep_saturates);
    }

    #[test]
    fn gep_past_bound_is_not_flagged_when_preprocessing_is_off() {
        let options = PtaOptions { field_sensitivity_bound: 16, preprocess_geps: false, ..PtaOptions::default() };
        let program = gep_program(1000);
        let graph = PointerGraph::build(&program, &options);
        assert!(!graph.node(11).unwrap().gep_saturates);
    }
}
