//! Flow-sensitive points-to solver: SSA values are flow-insensitive (an
//! SSA definition's own points-to set never depends on program point,
//! by construction), but *memory contents* are tracked per program point
//! and joined at merges, per design §4.2's "per-program-point memory
//! states (object → points-to set)".
//!
//! Memory states are reference-counted so that a block with no stores
//! shares its predecessor's state instead of copying it — `Rc::make_mut`
//! forces a private copy only at the first write, the copy-on-write
//! discipline the design calls for.

use super::pointer_graph::{FunctionShape, PGNode, PointerGraph};
use crate::features::offset::Offset;
use crate::features::points_to::domain::{Pointer, PointerTarget, PointsToSet};
use crate::shared::config::PtaOptions;
use crate::shared::ir::{NodeId, NodeKind, Operand};
use rustc_hash::{FxHashMap, FxHashSet};
use std::rc::Rc;

type MemoryState = Rc<FxHashMap<NodeId, PointsToSet>>;

pub struct FlowSensitiveSolver<'a> {
    graph: &'a PointerGraph,
    options: &'a PtaOptions,
    invalidate: bool,
    node_pts: FxHashMap<NodeId, PointsToSet>,
    out_states: FxHashMap<NodeId, MemoryState>,
    invalidated: FxHashSet<NodeId>,
}

impl<'a> FlowSensitiveSolver<'a> {
    pub fn new(graph: &'a PointerGraph, options: &'a PtaOptions, invalidate: bool) -> Self {
        Self {
            graph,
            options,
            invalidate,
            node_pts: FxHashMap::default(),
            out_states: FxHashMap::default(),
            invalidated: FxHashSet::default(),
        }
    }

    fn pts(&self, id: NodeId) -> PointsToSet {
        self.node_pts.get(&id).cloned().unwrap_or_else(PointsToSet::unknown)
    }

    fn sanitize(&self, set: PointsToSet) -> PointsToSet {
        if self.invalidated.is_empty() {
            return set;
        }
        set.valid_pointers()
            .map(|p| match p.target {
                PointerTarget::Object(t) if self.invalidated.contains(&t) => Pointer::invalidated(),
                _ => *p,
            })
            .chain(set.has_null().then(Pointer::null))
            .chain(set.has_unknown().then(Pointer::unknown))
            .chain(set.has_invalidated().then(Pointer::invalidated))
            .collect()
    }

    fn node_operands(operands: &[Operand]) -> impl Iterator<Item = NodeId> + '_ {
        operands.iter().filter_map(|op| if let Operand::Node(n) = op { Some(*n) } else { None })
    }

    fn const_offset(operands: &[Operand]) -> Offset {
        operands
            .iter()
            .find_map(|op| if let Operand::ConstOffset(v) = op { Some(Offset::new(*v)) } else { None })
            .unwrap_or(Offset::UNKNOWN)
    }

    fn join(&self, predecessors: &[NodeId]) -> MemoryState {
        let mut states = predecessors.iter().filter_map(|p| self.out_states.get(p));
        let Some(first) = states.next() else { return Rc::new(FxHashMap::default()) };
        let mut merged: FxHashMap<NodeId, PointsToSet> = (**first).clone();
        for s in states {
            for (obj, pts) in s.iter() {
                merged.entry(*obj).or_default().union_with(pts);
            }
        }
        Rc::new(merged)
    }

    pub fn solve(&mut self) -> (FxHashMap<NodeId, PointsToSet>, usize, bool) {
        for (&id, node) in &self.graph.nodes {
            match node.kind {
                NodeKind::Alloc | NodeKind::DynAlloc | NodeKind::Function | NodeKind::Fork => {
                    let mut s = PointsToSet::new();
                    s.insert(Pointer::to_object(id, Offset::new(0)));
                    self.node_pts.insert(id, s);
                }
                NodeKind::NullAddr => {
                    let mut s = PointsToSet::new();
                    s.insert(Pointer::null());
                    self.node_pts.insert(id, s);
                }
                NodeKind::UnknownMem => {
                    self.node_pts.insert(id, PointsToSet::unknown());
                }
                _ => {}
            }
        }

        let order: Vec<NodeId> = self.graph.order.clone();
        let mut iterations = 0;
        let mut converged = false;
        while iterations < self.options.max_iterations {
            iterations += 1;
            let mut changed = false;
            for id in &order {
                changed |= self.visit(*id);
            }
            if !changed {
                converged = true;
                break;
            }
        }

        (self.node_pts.clone(), iterations, converged)
    }

    fn visit(&mut self, id: NodeId) -> bool {
        let node = self.graph.node(id).expect("order only lists nodes present in the graph").clone();
        let in_state = self.join(&node.predecessors);
        let mut changed = false;

        let out_state = match node.kind {
            NodeKind::Store => {
                let mut operands = Self::node_operands(&node.operands);
                let val = operands.next();
                let ptr = operands.next();
                match (val, ptr) {
                    (Some(val), Some(ptr)) => {
                        let ptr_pts = self.pts(ptr);
                        let val_pts = self.sanitize(self.pts(val));
                        let mut out = in_state.clone();
                        let targets: Vec<NodeId> = ptr_pts
                            .valid_pointers()
                            .filter_map(|p| if let PointerTarget::Object(t) = p.target { Some(t) } else { None })
                            .collect();
                        if !targets.is_empty() {
                            let map = Rc::make_mut(&mut out);
                            for t in targets {
                                map.entry(t).or_default().union_with(&val_pts);
                            }
                        }
                        out
                    }
                    _ => in_state,
                }
            }
            NodeKind::Memcpy => {
                let mut operands = Self::node_operands(&node.operands);
                let dst = operands.next();
                let src = operands.next();
                match (dst, src) {
                    (Some(dst), Some(src)) => {
                        let dst_pts = self.pts(dst);
                        let src_pts = self.pts(src);
                        let src_contents: PointsToSet = src_pts
                            .valid_pointers()
                            .filter_map(|p| if let PointerTarget::Object(t) = p.target { in_state.get(&t) } else { None })
                            .fold(PointsToSet::new(), |mut acc, s| {
                                acc.union_with(s);
                                acc
                            });
                        let mut out = in_state.clone();
                        let targets: Vec<NodeId> = dst_pts
                            .valid_pointers()
                            .filter_map(|p| if let PointerTarget::Object(t) = p.target { Some(t) } else { None })
                            .collect();
                        if !targets.is_empty() {
                            let map = Rc::make_mut(&mut out);
                            for t in targets {
                                map.entry(t).or_default().union_with(&src_contents);
                            }
                        }
                        out
                    }
                    _ => in_state,
                }
            }
            NodeKind::Load => {
                if let Some(ptr) = Self::node_operands(&node.operands).next() {
                    let ptr_pts = self.pts(ptr);
                    let mut loaded = PointsToSet::new();
                    for p in ptr_pts.valid_pointers() {
                        if let PointerTarget::Object(t) = p.target {
                            if let Some(s) = in_state.get(&t) {
                                loaded.union_with(s);
                            }
                        }
                    }
                    if loaded.empty() {
                        loaded = PointsToSet::unknown();
                    }
                    changed |= self.node_pts.entry(id).or_default().union_with(&self.sanitize(loaded));
                }
                in_state
            }
            NodeKind::Cast => {
                if let Some(src) = Self::node_operands(&node.operands).next() {
                    let incoming = self.sanitize(self.pts(src));
                    changed |= self.node_pts.entry(id).or_default().union_with(&incoming);
                }
                in_state
            }
            NodeKind::Gep => {
                if let Some(base) = Self::node_operands(&node.operands).next() {
                    let base_pts = self.pts(base);
                    let valid: Vec<Pointer> = if node.gep_saturates {
                        base_pts.valid_pointers().map(|p| Pointer::new(p.target, Offset::UNKNOWN)).collect()
                    } else {
                        let shift = Self::const_offset(&node.operands);
                        base_pts.valid_pointers().map(|p| p.shifted(shift, self.options.field_sensitivity_bound)).collect()
                    };
                    let shifted: PointsToSet = valid
                        .into_iter()
                        .chain(base_pts.has_null().then(Pointer::null))
                        .chain(base_pts.has_unknown().then(Pointer::unknown))
                        .chain(base_pts.has_invalidated().then(Pointer::invalidated))
                        .collect();
                    changed |= self.node_pts.entry(id).or_default().union_with(&self.sanitize(shifted));
                }
                in_state
            }
            NodeKind::Phi => {
                for operand in Self::node_operands(&node.operands) {
                    let incoming = self.sanitize(self.pts(operand));
                    changed |= self.node_pts.entry(id).or_default().union_with(&incoming);
                }
                in_state
            }
            NodeKind::Free | NodeKind::InvalidateObject if self.invalidate => {
                if let Some(target) = Self::node_operands(&node.operands).next() {
                    let target_pts = self.pts(target);
                    for p in target_pts.valid_pointers() {
                        if let PointerTarget::Object(t) = p.target {
                            changed |= self.invalidated.insert(t);
                        }
                    }
                }
                in_state
            }
            NodeKind::Call => self.visit_call(id, &node, in_state, &mut changed),
            _ => in_state,
        };

        let prev_out = self.out_states.get(&id);
        let replace = match prev_out {
            Some(prev) => **prev != *out_state,
            None => true,
        };
        if replace {
            self.out_states.insert(id, out_state);
            changed = true;
        }
        changed
    }

    fn visit_call(&mut self, _id: NodeId, node: &PGNode, in_state: MemoryState, changed: &mut bool) -> MemoryState {
        let callee_name = node.operands.iter().find_map(|op| {
            if let Operand::Symbol(name) = op {
                Some(name.clone())
            } else {
                None
            }
        });
        let args: Vec<NodeId> = Self::node_operands(&node.operands).collect();

        let mut resolved = Vec::new();
        let actuals: &[NodeId];
        let is_indirect;
        if let Some(name) = callee_name {
            resolved.push(name);
            actuals = &args[..];
            is_indirect = false;
        } else if let Some(&fnptr) = args.first() {
            let fnptr_pts = self.pts(fnptr);
            for p in fnptr_pts.valid_pointers() {
                if let PointerTarget::Object(t) = p.target {
                    if let Some(name) = self.graph.function_ids.get(&t) {
                        resolved.push(name.clone());
                    }
                }
            }
            actuals = &args[1..];
            is_indirect = true;
        } else {
            actuals = &args[..];
            is_indirect = false;
        }

        for name in &resolved {
            let Some(shape) = self.graph.functions.get(name).cloned() else { continue };
            if is_indirect && !self.signature_compatible(actuals, &shape) {
                if let Some(cr) = node.call_return {
                    *changed |= self.node_pts.entry(cr).or_default().union_with(&PointsToSet::unknown());
                }
                continue;
            }
            let bound = shape.params.len().min(actuals.len());
            for i in 0..bound {
                let arg_pts = self.pts(actuals[i]);
                *changed |= self.node_pts.entry(shape.params[i]).or_default().union_with(&arg_pts);
            }
            if let (Some(cr), Some(ret)) = (node.call_return, shape.return_value) {
                let ret_pts = self.pts(ret);
                *changed |= self.node_pts.entry(cr).or_default().union_with(&ret_pts);
            }
        }

        in_state
    }

    /// Mirrors the flow-insensitive solver's arity/size compatibility gate
    /// (see `andersen::AndersenSolver::signature_compatible`) for indirect
    /// call targets resolved here.
    fn signature_compatible(&self, args: &[NodeId], shape: &FunctionShape) -> bool {
        let arity_ok =
            if shape.is_variadic { args.len() >= shape.params.len() } else { args.len() == shape.params.len() };
        if !arity_ok {
            return false;
        }
        shape.params.iter().zip(args).all(|(&param, &arg)| {
            let param_size = self.graph.node(param).and_then(|n| n.type_size);
            let arg_size = self.graph.node(arg).and_then(|n| n.type_size);
            match (param_size, arg_size) {
                (Some(p), Some(a)) => p == a,
                _ => true,
            }
        })
    }
}
