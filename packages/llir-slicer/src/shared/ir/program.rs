//! The in-memory program graph: modules → functions → blocks →
//! instructions, plus globals and their initializers.

use super::layout::Layout;
use super::node::{DebugLoc, NodeId, NodeKind, Operand};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A single instruction node, owned by exactly one [`Function`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Instruction {
    pub id: NodeId,
    pub kind: NodeKind,
    pub operands: Vec<Operand>,
    pub successors: Vec<NodeId>,
    pub predecessors: Vec<NodeId>,
    pub debug_loc: Option<DebugLoc>,
    /// Type size in bytes, when statically known — used by field-sensitive
    /// GEP offset computation and struct/array layout recursion.
    pub type_size: Option<u64>,
}

impl Instruction {
    pub fn new(id: NodeId, kind: NodeKind) -> Self {
        Self {
            id,
            kind,
            operands: Vec::new(),
            successors: Vec::new(),
            predecessors: Vec::new(),
            debug_loc: None,
            type_size: None,
        }
    }

    pub fn with_operands(mut self, operands: Vec<Operand>) -> Self {
        self.operands = operands;
        self
    }
}

/// Nested initializer for a global, recursed through struct/array layout
/// during PTA global-initializer processing (design §4.2).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Initializer {
    Null,
    Undef,
    /// A pointer initializer: address-taken global/function or another
    /// global, stored at global-init time.
    Pointer(NodeId),
    Struct(Vec<(u64, Initializer)>),
    Array(Vec<Initializer>),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Global {
    pub id: NodeId,
    pub name: String,
    pub initializer: Initializer,
    pub size: u64,
    /// Struct/array layout, used to recurse through a nested `Initializer`
    /// and compute each element's byte offset. `None` for scalar globals.
    pub layout: Option<Layout>,
}

/// One function's instruction graph. Instructions are owned here; deleting
/// a function drops every instruction (and any PTA/RD/SDG augmentation
/// keyed by those IDs becomes dangling and must be dropped by the owning
/// analysis first — see the design's teardown order in §9).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Function {
    pub id: NodeId,
    pub name: String,
    pub entry: NodeId,
    pub is_variadic: bool,
    pub params: Vec<NodeId>,
    pub instructions: HashMap<NodeId, Instruction>,
    /// Insertion order, used wherever a canonical (ID-derived) iteration
    /// order matters for determinism (design §5).
    pub order: Vec<NodeId>,
}

impl Function {
    pub fn new(id: NodeId, name: impl Into<String>, entry: NodeId) -> Self {
        Self {
            id,
            name: name.into(),
            entry,
            is_variadic: false,
            params: Vec::new(),
            instructions: HashMap::new(),
            order: Vec::new(),
        }
    }

    pub fn add_instruction(&mut self, instr: Instruction) {
        self.order.push(instr.id);
        self.instructions.insert(instr.id, instr);
    }

    pub fn instruction(&self, id: NodeId) -> Option<&Instruction> {
        self.instructions.get(&id)
    }

    pub fn instruction_mut(&mut self, id: NodeId) -> Option<&mut Instruction> {
        self.instructions.get_mut(&id)
    }

    /// All `RETURN` nodes in the function (possibly several in
    /// unstructured control flow; the dominance module synthesizes a
    /// unique exit when there's more than one).
    pub fn return_nodes(&self) -> Vec<NodeId> {
        self.order
            .iter()
            .copied()
            .filter(|id| matches!(self.instructions.get(id).map(|n| n.kind), Some(NodeKind::Return)))
            .collect()
    }

    /// Remove an instruction and patch its neighbors' edge lists, leaving
    /// the CFG connected by splicing the removed node's single successor
    /// in place of it where that's unambiguous. Residual emission (design
    /// §4.6) uses this once a node is known not to be in the slice.
    pub fn delete_instruction(&mut self, id: NodeId) {
        let Some(removed) = self.instructions.remove(&id) else { return };
        self.order.retain(|&n| n != id);
        for pred in &removed.predecessors {
            if let Some(p) = self.instructions.get_mut(pred) {
                p.successors.retain(|&s| s != id);
                for succ in &removed.successors {
                    if !p.successors.contains(succ) {
                        p.successors.push(*succ);
                    }
                }
            }
        }
        for succ in &removed.successors {
            if let Some(s) = self.instructions.get_mut(succ) {
                s.predecessors.retain(|&p| p != id);
                for pred in &removed.predecessors {
                    if !s.predecessors.contains(pred) {
                        s.predecessors.push(*pred);
                    }
                }
            }
        }
    }

    /// Delete every instruction in a basic block (as computed by
    /// [`crate::features::graph::infrastructure::BlockBuilder`]) in one
    /// call, splicing each in turn so the surrounding CFG stays connected.
    pub fn delete_block(&mut self, ids: &[NodeId]) {
        for &id in ids {
            self.delete_instruction(id);
        }
    }

    /// Replace every use of `from` as a successor/predecessor with `to`.
    /// Used when the cutoff-diverging pass (design §4.6 "Preprocessing")
    /// collapses a removed block's sole relevant predecessor onto a
    /// diverging stub.
    pub fn replace_block_uses(&mut self, from: NodeId, to: NodeId) {
        for instr in self.instructions.values_mut() {
            for s in instr.successors.iter_mut() {
                if *s == from {
                    *s = to;
                }
            }
            for p in instr.predecessors.iter_mut() {
                if *p == from {
                    *p = to;
                }
            }
        }
    }
}

/// The whole-program graph: every function plus global variables, with a
/// monotonically increasing ID allocator so synthesized nodes (diverging
/// stubs, phi nodes owned by other components) never collide with
/// adapter-provided IDs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Program {
    pub functions: HashMap<NodeId, Function>,
    pub function_names: HashMap<String, NodeId>,
    pub globals: HashMap<NodeId, Global>,
    next_id: NodeId,
}

impl Program {
    pub fn new() -> Self {
        Self { next_id: 1, ..Default::default() }
    }

    /// Allocate a fresh node ID, skipping the reserved `0`.
    pub fn fresh_id(&mut self) -> NodeId {
        if self.next_id == 0 {
            self.next_id = 1;
        }
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn add_function(&mut self, function: Function) {
        self.function_names.insert(function.name.clone(), function.id);
        if function.id >= self.next_id {
            self.next_id = function.id + 1;
        }
        self.functions.insert(function.id, function);
    }

    pub fn add_global(&mut self, global: Global) {
        if global.id >= self.next_id {
            self.next_id = global.id + 1;
        }
        self.globals.insert(global.id, global);
    }

    pub fn function_by_name(&self, name: &str) -> Option<&Function> {
        self.function_names.get(name).and_then(|id| self.functions.get(id))
    }

    pub fn find_instruction(&self, id: NodeId) -> Option<(&Function, &Instruction)> {
        self.functions
            .values()
            .find_map(|f| f.instruction(id).map(|instr| (f, instr)))
    }

    /// Delete every instruction of a basic block within one function.
    pub fn delete_block(&mut self, function_id: NodeId, ids: &[NodeId]) {
        if let Some(f) = self.functions.get_mut(&function_id) {
            f.delete_block(ids);
        }
    }

    /// Delete an entire function and every instruction it owns. Any
    /// analysis augmentation keyed on those instruction IDs must already
    /// have been torn down by its owning component (design §9 teardown
    /// order: slicer → SDG → RD → PTA → program graph).
    pub fn drop_function(&mut self, id: NodeId) {
        if let Some(f) = self.functions.remove(&id) {
            self.function_names.remove(&f.name);
        }
    }

    /// Insert a diverging terminator stub (`abort`/`exit`-like) and wire
    /// it as the sole successor of `after`, replacing whatever `after`
    /// used to branch to. This is the one write the cutoff-diverging pass
    /// performs on otherwise-read-mostly adapter state (design §6).
    pub fn insert_diverging_stub(&mut self, function_id: NodeId, after: NodeId) -> Option<NodeId> {
        let stub_id = self.fresh_id();
        let func = self.functions.get_mut(&function_id)?;
        let mut stub = Instruction::new(stub_id, NodeKind::Call);
        stub.operands.push(Operand::Symbol("abort".to_string()));
        stub.predecessors.push(after);
        func.add_instruction(stub);
        if let Some(prev) = func.instruction_mut(after) {
            let old_successors = std::mem::take(&mut prev.successors);
            for succ in &old_successors {
                if let Some(s) = func.instructions.get_mut(succ) {
                    s.predecessors.retain(|&p| p != after);
                }
            }
            if let Some(prev) = func.instruction_mut(after) {
                prev.successors.push(stub_id);
            }
        }
        Some(stub_id)
    }
}
