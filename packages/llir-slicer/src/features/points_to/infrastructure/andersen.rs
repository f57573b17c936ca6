//! Flow-insensitive Andersen-style inclusion-based points-to solver.
//!
//! Propagates points-to facts over the whole pointer subgraph until no
//! set changes, the classic fixpoint (Andersen, "Program Analysis and
//! Specialization for C", 1994). SCC collapsing and wave propagation are
//! common accelerations on top of this core; this solver keeps the plain
//! worklist core and skips those accelerations, since this crate's graphs
//! are per-function pointer subgraphs, not whole-codebase class
//! hierarchies, so the constant factors they cut don't justify the extra
//! bookkeeping here.
//!
//! Memory contents are tracked per abstract object but **not** per byte
//! offset (field-insensitive): `object_store` holds "what may be stored
//! anywhere in this object", trading offset precision for a fixpoint that
//! doesn't need disjoint-interval bookkeeping. True field sensitivity for
//! reads lives in the reaching-definitions module, which this analysis
//! feeds.

use super::pointer_graph::PointerGraph;
use crate::features::offset::Offset;
use crate::features::points_to::domain::{Pointer, PointerTarget, PointsToSet};
use crate::shared::config::PtaOptions;
use crate::shared::ir::{NodeId, NodeKind, Operand};
use rustc_hash::{FxHashMap, FxHashSet};

pub struct AndersenSolver<'a> {
    graph: &'a PointerGraph,
    options: &'a PtaOptions,
    node_pts: FxHashMap<NodeId, PointsToSet>,
    object_store: FxHashMap<NodeId, PointsToSet>,
    unknown_object_store: PointsToSet,
    invalidated: FxHashSet<NodeId>,
}

impl<'a> AndersenSolver<'a> {
    pub fn new(graph: &'a PointerGraph, options: &'a PtaOptions) -> Self {
        Self {
            graph,
            options,
            node_pts: FxHashMap::default(),
            object_store: FxHashMap::default(),
            unknown_object_store: PointsToSet::new(),
            invalidated: FxHashSet::default(),
        }
    }

    fn pts(&self, id: NodeId) -> PointsToSet {
        self.node_pts.get(&id).cloned().unwrap_or_else(PointsToSet::unknown)
    }

    /// Rewrite any pointer in `set` that targets an already-invalidated
    /// object — invalidation is monotone, so once an object is freed it
    /// stays freed for the rest of the fixpoint.
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

    fn const_offset(operands: &[Operand]) -> Offset {
        operands
            .iter()
            .find_map(|op| if let Operand::ConstOffset(v) = op { Some(Offset::new(*v)) } else { None })
            .unwrap_or(Offset::UNKNOWN)
    }

    fn node_operands(operands: &[Operand]) -> impl Iterator<Item = NodeId> + '_ {
        operands.iter().filter_map(|op| if let Operand::Node(n) = op { Some(*n) } else { None })
    }

    fn seed_global_inits(&mut self) {
        for (global_id, init) in &self.graph.global_inits {
            self.node_pts.entry(*global_id).or_insert_with(|| {
                let mut s = PointsToSet::new();
                s.insert(Pointer::to_object(*global_id, Offset::new(0)));
                s
            });
            Self::apply_initializer(&mut self.object_store, *global_id, init);
        }
    }

    fn apply_initializer(
        object_store: &mut FxHashMap<NodeId, PointsToSet>,
        global_id: NodeId,
        init: &crate::shared::ir::Initializer,
    ) {
        use crate::shared::ir::Initializer;
        match init {
            Initializer::Null => {
                object_store.entry(global_id).or_default().insert(Pointer::null());
            }
            Initializer::Undef => {
                object_store.entry(global_id).or_default().insert(Pointer::unknown());
            }
            Initializer::Pointer(target) => {
                object_store
                    .entry(global_id)
                    .or_default()
                    .insert(Pointer::to_object(*target, Offset::new(0)));
            }
            Initializer::Struct(fields) => {
                for (_, nested) in fields {
                    Self::apply_initializer(object_store, global_id, nested);
                }
            }
            Initializer::Array(elements) => {
                for nested in elements {
                    Self::apply_initializer(object_store, global_id, nested);
                }
            }
        }
    }

    /// Run to convergence or until `max_iterations`. Returns the final
    /// per-node points-to map, the iteration count, and whether it
    /// converged before the budget ran out.
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
        self.seed_global_inits();

        let mut iterations = 0;
        let mut converged = false;
        while iterations < self.options.max_iterations {
            iterations += 1;
            let mut changed = false;
            let order: Vec<NodeId> = self.graph.order.clone();
            for id in order {
                changed |= self.step(id);
            }
            if !changed {
                converged = true;
                break;
            }
        }

        (self.node_pts.clone(), iterations, converged)
    }

    fn union_into(&mut self, id: NodeId, incoming: PointsToSet) -> bool {
        let incoming = self.sanitize(incoming);
        self.node_pts.entry(id).or_default().union_with(&incoming)
    }

    fn step(&mut self, id: NodeId) -> bool {
        let node = self.graph.node(id).expect("order only lists nodes present in the graph").clone();
        match node.kind {
            NodeKind::Alloc
            | NodeKind::DynAlloc
            | NodeKind::Function
            | NodeKind::Fork
            | NodeKind::NullAddr
            | NodeKind::UnknownMem => false,
            NodeKind::Constant | NodeKind::Noop => false,
            NodeKind::Cast => {
                let src = Self::node_operands(&node.operands).next();
                match src {
                    Some(src) => {
                        let incoming = self.pts(src);
                        self.union_into(id, incoming)
                    }
                    None => false,
                }
            }
            NodeKind::Gep => {
                let base = Self::node_operands(&node.operands).next();
                match base {
                    Some(base) => {
                        let base_pts = self.pts(base);
                        let valid: Vec<Pointer> = if node.gep_saturates {
                            base_pts.valid_pointers().map(|p| Pointer::new(p.target, Offset::UNKNOWN)).collect()
                        } else {
                            let shift = Self::const_offset(&node.operands);
                            base_pts
                                .valid_pointers()
                                .map(|p| p.shifted(shift, self.options.field_sensitivity_bound))
                                .collect()
                        };
                        let shifted: PointsToSet = valid
                            .into_iter()
                            .chain(base_pts.has_null().then(Pointer::null))
                            .chain(base_pts.has_unknown().then(Pointer::unknown))
                            .chain(base_pts.has_invalidated().then(Pointer::invalidated))
                            .collect();
                        self.union_into(id, shifted)
                    }
                    None => false,
                }
            }
            NodeKind::Phi => {
                let mut changed = false;
                for operand in Self::node_operands(&node.operands) {
                    let incoming = self.pts(operand);
                    changed |= self.union_into(id, incoming);
                }
                changed
            }
            NodeKind::Store => {
                let mut operands = Self::node_operands(&node.operands);
                let val = operands.next();
                let ptr = operands.next();
                let (Some(val), Some(ptr)) = (val, ptr) else { return false };
                let ptr_pts = self.pts(ptr);
                let val_pts = self.sanitize(self.pts(val));
                let mut changed = false;
                for p in ptr_pts.valid_pointers() {
                    if let PointerTarget::Object(t) = p.target {
                        changed |= self.object_store.entry(t).or_default().union_with(&val_pts);
                    }
                }
                if ptr_pts.has_unknown() {
                    changed |= self.unknown_object_store.union_with(&val_pts);
                }
                changed
            }
            NodeKind::Load => {
                let ptr = Self::node_operands(&node.operands).next();
                match ptr {
                    Some(ptr) => {
                        let ptr_pts = self.pts(ptr);
                        let mut loaded = PointsToSet::new();
                        for p in ptr_pts.valid_pointers() {
                            if let PointerTarget::Object(t) = p.target {
                                if let Some(s) = self.object_store.get(&t) {
                                    loaded.union_with(s);
                                }
                            }
                        }
                        if ptr_pts.has_unknown() || loaded.empty() {
                            loaded.union_with(&self.unknown_object_store.clone());
                            if loaded.empty() {
                                loaded = PointsToSet::unknown();
                            }
                        }
                        self.union_into(id, loaded)
                    }
                    None => false,
                }
            }
            NodeKind::Memcpy => {
                let mut operands = Self::node_operands(&node.operands);
                let dst = operands.next();
                let src = operands.next();
                let (Some(dst), Some(src)) = (dst, src) else { return false };
                let dst_pts = self.pts(dst);
                let src_pts = self.pts(src);
                let mut changed = false;
                let src_contents: PointsToSet = src_pts
                    .valid_pointers()
                    .filter_map(|p| if let PointerTarget::Object(t) = p.target { self.object_store.get(&t) } else { None })
                    .fold(PointsToSet::new(), |mut acc, s| {
                        acc.union_with(s);
                        acc
                    });
                for p in dst_pts.valid_pointers() {
                    if let PointerTarget::Object(t) = p.target {
                        changed |= self.object_store.entry(t).or_default().union_with(&src_contents);
                    }
                }
                changed
            }
            NodeKind::Free | NodeKind::InvalidateObject => {
                if !self.options.invalidate_nodes {
                    return false;
                }
                let target = Self::node_operands(&node.operands).next();
                let Some(target) = target else { return false };
                let target_pts = self.pts(target);
                let mut changed = false;
                for p in target_pts.valid_pointers() {
                    if let PointerTarget::Object(t) = p.target {
                        changed |= self.invalidated.insert(t);
                    }
                }
                changed
            }
            NodeKind::Call => self.step_call(id, &node),
            _ => false,
        }
    }

    fn step_call(&mut self, id: NodeId, node: &super::pointer_graph::PGNode) -> bool {
        let mut changed = false;
        let callee_name = node.operands.iter().find_map(|op| {
            if let Operand::Symbol(name) = op {
                Some(name.clone())
            } else {
                None
            }
        });
        let args: Vec<NodeId> = node
            .operands
            .iter()
            .filter_map(|op| if let Operand::Node(n) = op { Some(*n) } else { None })
            .collect();

        let mut resolved_names = Vec::new();
        if let Some(name) = callee_name {
            resolved_names.push(name);
        } else if let Some(&fnptr) = args.first() {
            // Indirect call: the first node operand is the callee pointer;
            // its own points-to set names the candidate functions.
            let fnptr_pts = self.pts(fnptr);
            for p in fnptr_pts.valid_pointers() {
                if let PointerTarget::Object(t) = p.target {
                    if let Some(name) = self.graph.function_ids.get(&t) {
                        resolved_names.push(name.clone());
                    }
                }
            }
            if fnptr_pts.has_unknown() {
                if let Some(cr) = node.call_return {
                    changed |= self.union_into(cr, PointsToSet::unknown());
                }
            }
            return self.bind_and_propagate(&args[1..], &resolved_names, node.call_return, true) || changed;
        }

        self.bind_and_propagate(&args, &resolved_names, node.call_return, false) || changed
    }

    /// Whether `args` could legally be passed to `shape`: same arity for a
    /// fixed-arity callee, at-least-as-many for a variadic one, and each
    /// fixed parameter's size compatible with the matching argument's
    /// (an unknown size on either side is permissive — a tightening that
    /// may drop real targets isn't worth the false negatives).
    fn signature_compatible(&self, args: &[NodeId], shape: &super::pointer_graph::FunctionShape) -> bool {
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

    /// Binds `args` into `callee_names`' formal parameters and joins their
    /// return values back into `call_return`. For an indirect call
    /// (`is_indirect`), a candidate whose signature doesn't match `args` is
    /// skipped and contributes `{UNKNOWN_MEMORY}` to the return instead of
    /// connecting its subgraph — a direct call has exactly one,
    /// unambiguous target, so the compatibility gate only applies here.
    fn bind_and_propagate(
        &mut self,
        args: &[NodeId],
        callee_names: &[String],
        call_return: Option<NodeId>,
        is_indirect: bool,
    ) -> bool {
        let mut changed = false;
        for name in callee_names {
            let Some(shape) = self.graph.functions.get(name).cloned() else { continue };
            if is_indirect && !self.signature_compatible(args, &shape) {
                if let Some(cr) = call_return {
                    changed |= self.union_into(cr, PointsToSet::unknown());
                }
                continue;
            }
            let bound = if shape.is_variadic { shape.params.len().min(args.len()) } else { shape.params.len() };
            for i in 0..bound.min(args.len()).min(shape.params.len()) {
                let arg_pts = self.pts(args[i]);
                changed |= self.union_into(shape.params[i], arg_pts);
            }
            if let (Some(cr), Some(ret)) = (call_return, shape.return_value) {
                let ret_pts = self.pts(ret);
                changed |= self.union_into(cr, ret_pts);
            }
        }
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::pointer_graph::{FunctionShape, PGNode};

    fn node(kind: NodeKind, operands: Vec<Operand>, call_return: Option<NodeId>, type_size: Option<u64>) -> PGNode {
        PGNode {
            kind,
            operands,
            function: 1,
            call_return,
            type_size,
            successors: Vec::new(),
            predecessors: Vec::new(),
            gep_saturates: false,
        }
    }

    /// One indirect call site whose function pointer may alias two
    /// candidates: `good` (one `4`-byte param, matching the one argument
    /// passed) and `bad` (two params, an arity mismatch against the single
    /// argument). Mirrors a `fp(&a)` call site where `fp` may hold either
    /// address.
    fn indirect_call_graph() -> PointerGraph {
        let mut nodes = FxHashMap::default();
        nodes.insert(10, node(NodeKind::Alloc, Vec::new(), None, Some(4)));
        nodes.insert(100, node(NodeKind::Function, Vec::new(), None, None));
        nodes.insert(200, node(NodeKind::Function, Vec::new(), None, None));
        nodes.insert(6, node(NodeKind::Phi, vec![Operand::Node(100), Operand::Node(200)], None, None));
        nodes.insert(
            7,
            node(NodeKind::Call, vec![Operand::Node(6), Operand::Node(10)], Some(8), None),
        );
        nodes.insert(8, node(NodeKind::Noop, Vec::new(), None, None));
        nodes.insert(102, node(NodeKind::Noop, Vec::new(), None, Some(4)));
        nodes.insert(202, node(NodeKind::Noop, Vec::new(), None, Some(4)));
        nodes.insert(203, node(NodeKind::Noop, Vec::new(), None, Some(4)));

        let mut functions = FxHashMap::default();
        functions.insert(
            "good".to_string(),
            FunctionShape { id: 100, entry: 100, params: vec![102], is_variadic: false, return_value: None },
        );
        functions.insert(
            "bad".to_string(),
            FunctionShape { id: 200, entry: 200, params: vec![202, 203], is_variadic: false, return_value: None },
        );

        let mut function_ids = FxHashMap::default();
        function_ids.insert(100, "good".to_string());
        function_ids.insert(200, "bad".to_string());

        PointerGraph {
            nodes,
            order: vec![100, 200, 6, 7],
            global_inits: Vec::new(),
            functions,
            function_ids,
        }
    }

    #[test]
    fn compatible_indirect_target_binds_its_parameter() {
        let graph = indirect_call_graph();
        let options = PtaOptions::default();
        let mut solver = AndersenSolver::new(&graph, &options);
        let (results, _, converged) = solver.solve();
        assert!(converged);
        let good_param = results.get(&102).cloned().unwrap_or_else(PointsToSet::unknown);
        assert!(good_param.valid_pointers().any(|p| p.target == PointerTarget::Object(10)));
    }

    #[test]
    fn arity_incompatible_indirect_target_is_not_bound() {
        let graph = indirect_call_graph();
        let options = PtaOptions::default();
        let mut solver = AndersenSolver::new(&graph, &options);
        let (results, _, _) = solver.solve();
        assert!(results.get(&202).is_none());
        assert!(results.get(&203).is_none());
    }

    #[test]
    fn incompatible_target_makes_return_unknown() {
        let graph = indirect_call_graph();
        let options = PtaOptions::default();
        let mut solver = AndersenSolver::new(&graph, &options);
        let (results, _, _) = solver.solve();
        let call_return = results.get(&8).cloned().unwrap_or_else(PointsToSet::unknown);
        assert!(call_return.has_unknown());
    }
}
