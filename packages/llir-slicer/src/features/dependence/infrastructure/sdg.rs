//! The system dependence graph builder (design §4.5): per-function PDGs
//! (control edges from post-dominance frontiers, data edges from
//! reaching-definitions), stitched together at call sites with synthetic
//! actual-in/actual-out/formal-in/formal-out nodes, then a tabulation pass
//! that adds `Summary` edges (actual-in straight to actual-out) wherever a
//! formal parameter provably reaches the callee's formal-out — read
//! straight off `RdAnalyzer::mod_ref`'s already-computed may-def/must-def
//! sets for pointer arguments, falling back to an intraprocedural walk
//! only for arguments the points-to pass couldn't resolve.
//!
//! Built as a `DiGraph`-of-typed-edges with `backward_slice`/
//! `forward_slice`/`chop` query helpers riding on top, generalized to the
//! seven `EdgeKind` variants an interprocedural SDG needs.

use crate::features::dependence::domain::{EdgeKind, SdgNode};
use crate::features::dominance::{DominatorTree, PostDominanceFrontiers};
use crate::features::graph::Walker;
use crate::features::points_to::{PointerTarget, PointsToSet};
use crate::features::reaching_defs::RdAnalyzer;
use crate::shared::ir::{Function, NodeId, NodeKind, Operand, Program};
use rustc_hash::FxHashMap;

#[derive(Debug, Clone, Default)]
pub struct SystemDependenceGraph {
    edges: FxHashMap<NodeId, Vec<(NodeId, EdgeKind)>>,
    reverse_edges: FxHashMap<NodeId, Vec<(NodeId, EdgeKind)>>,
    node_kinds: FxHashMap<NodeId, SdgNode>,
    formal_in: FxHashMap<(NodeId, u32), NodeId>,
    formal_out: FxHashMap<NodeId, NodeId>,
    /// Every call site's actual-in nodes, in argument order — the
    /// tabulation pass and `formal_to_actual` queries key off this.
    call_actuals: FxHashMap<NodeId, Vec<NodeId>>,
    /// The original (non-synthetic) argument node backing each actual-in,
    /// same order as `call_actuals` — lets `compute_summary_edges` look up
    /// an argument's points-to set without re-deriving it from the host
    /// instruction's operand list.
    call_args: FxHashMap<NodeId, Vec<NodeId>>,
    call_actual_out: FxHashMap<NodeId, NodeId>,
    /// Every callee a call site may reach — one entry for a direct call,
    /// possibly several for an indirect call resolved through points-to.
    call_callees: FxHashMap<NodeId, Vec<NodeId>>,
    next_synthetic_id: NodeId,
}

impl SystemDependenceGraph {
    pub fn edges_from(&self, node: NodeId) -> &[(NodeId, EdgeKind)] {
        self.edges.get(&node).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn edges_into(&self, node: NodeId) -> &[(NodeId, EdgeKind)] {
        self.reverse_edges.get(&node).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn node_kind(&self, node: NodeId) -> Option<SdgNode> {
        self.node_kinds.get(&node).copied()
    }

    /// Every node the builder registered, real and synthetic alike —
    /// consulted by the structural validator to catch a dangling edge
    /// endpoint before it reaches the slicer.
    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.node_kinds.keys().copied()
    }

    /// The formal-in node standing in for actual-in's callee-side binding,
    /// per the design's `formalToActual` mapping, queried the other way
    /// around (given a call's actual-in, find the callee's formal-in).
    pub fn formal_to_actual(&self, call: NodeId) -> &[NodeId] {
        self.call_actuals.get(&call).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Wires one interference edge (design §4.7) into an already-built
    /// graph — the concurrency feature's own job, kept out of `build` since
    /// it only runs when thread regions are modeled.
    pub fn add_interference_edge(&mut self, write: NodeId, read: NodeId) {
        self.add_edge(write, read, EdgeKind::Interference);
    }

    fn add_edge(&mut self, from: NodeId, to: NodeId, kind: EdgeKind) {
        let out = self.edges.entry(from).or_default();
        if !out.contains(&(to, kind)) {
            out.push((to, kind));
            self.reverse_edges.entry(to).or_default().push((from, kind));
        }
    }

    fn fresh_id(&mut self) -> NodeId {
        let id = self.next_synthetic_id;
        self.next_synthetic_id += 1;
        id
    }

    /// Resolves a call instruction's candidate callees and its actual
    /// arguments. A direct call (`Operand::Symbol`) always resolves to
    /// exactly one callee; an indirect call resolves through `pta`'s
    /// points-to set for the function-pointer operand (the first
    /// `Operand::Node`), each `PointerTarget::Object` naming a function by
    /// its own node ID — the same convention points-to analysis uses to
    /// seed a function value's points-to set.
    fn resolve_callees<'p>(
        operands: &[Operand],
        program: &'p Program,
        pta: &FxHashMap<NodeId, PointsToSet>,
    ) -> (Vec<&'p Function>, Vec<NodeId>) {
        if let Some(callee) = operands.iter().find_map(|op| match op {
            Operand::Symbol(name) => program.function_by_name(name),
            _ => None,
        }) {
            let args: Vec<NodeId> =
                operands.iter().filter_map(|op| if let Operand::Node(n) = op { Some(*n) } else { None }).collect();
            return (vec![callee], args);
        }

        let nodes: Vec<NodeId> =
            operands.iter().filter_map(|op| if let Operand::Node(n) = op { Some(*n) } else { None }).collect();
        let Some(&fnptr) = nodes.first() else { return (Vec::new(), Vec::new()) };
        let args = nodes[1..].to_vec();
        let callees = pta
            .get(&fnptr)
            .map(|set| {
                set.valid_pointers()
                    .filter_map(|p| match p.target {
                        PointerTarget::Object(t) => program.functions.get(&t),
                        _ => None,
                    })
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();
        (callees, args)
    }

    pub fn build(
        program: &Program,
        rd: &RdAnalyzer,
        pta: &FxHashMap<NodeId, PointsToSet>,
    ) -> SystemDependenceGraph {
        let max_real_id = program
            .functions
            .values()
            .flat_map(|f| f.order.iter().copied())
            .chain(program.globals.keys().copied())
            .max()
            .unwrap_or(0);

        let mut sdg = SystemDependenceGraph { next_synthetic_id: max_real_id.saturating_add(1), ..Default::default() };

        for function in program.functions.values() {
            for &id in &function.order {
                sdg.node_kinds.insert(id, SdgNode::Instruction(id));
            }

            let pdom = DominatorTree::post_dominators(function);
            let pdf = PostDominanceFrontiers::compute(function, &pdom, true);
            for &branch in &function.order {
                for &dependent in pdf.control_dependents_of(branch) {
                    sdg.add_edge(branch, dependent, EdgeKind::Control);
                }
            }

            for &id in &function.order {
                for def in rd.reaching_definitions(id).nodes() {
                    sdg.add_edge(def, id, EdgeKind::Data);
                }
            }

            for (index, &param) in function.params.iter().enumerate() {
                let formal_in = sdg.fresh_id();
                sdg.node_kinds.insert(formal_in, SdgNode::FormalIn { function: function.id, index: index as u32 });
                sdg.formal_in.insert((function.id, index as u32), formal_in);
                sdg.add_edge(formal_in, param, EdgeKind::Data);
                sdg.add_edge(formal_in, function.entry, EdgeKind::Control);
            }

            let formal_out = sdg.fresh_id();
            sdg.node_kinds.insert(formal_out, SdgNode::FormalOut { function: function.id });
            sdg.formal_out.insert(function.id, formal_out);
            for ret in function.return_nodes() {
                sdg.add_edge(ret, formal_out, EdgeKind::Data);
            }
        }

        for function in program.functions.values() {
            for &id in &function.order {
                let Some(instr) = function.instruction(id) else { continue };
                if instr.kind != NodeKind::Call {
                    continue;
                }
                let (callees, args) = Self::resolve_callees(&instr.operands, program, pta);
                if callees.is_empty() {
                    continue;
                }

                // One actual-in per argument, shared across every candidate
                // callee at this call site — they all receive the same
                // actual value, whichever one is invoked at run time.
                let mut actuals = Vec::new();
                for (index, &arg) in args.iter().enumerate() {
                    let actual_in = sdg.fresh_id();
                    sdg.node_kinds.insert(actual_in, SdgNode::ActualIn { call: id, index: index as u32 });
                    sdg.add_edge(arg, actual_in, EdgeKind::Data);
                    actuals.push(actual_in);
                }

                let actual_out = sdg.fresh_id();
                sdg.node_kinds.insert(actual_out, SdgNode::ActualOut { call: id });
                sdg.add_edge(actual_out, id, EdgeKind::Data);

                let mut callee_ids = Vec::with_capacity(callees.len());
                for callee in callees {
                    for (index, &actual_in) in actuals.iter().enumerate() {
                        if let Some(&formal_in) = sdg.formal_in.get(&(callee.id, index as u32)) {
                            sdg.add_edge(actual_in, formal_in, EdgeKind::ParameterIn);
                        }
                    }
                    if let Some(&callee_formal_out) = sdg.formal_out.get(&callee.id) {
                        sdg.add_edge(callee_formal_out, actual_out, EdgeKind::ParameterOut);
                    }
                    sdg.add_edge(id, callee.entry, EdgeKind::Call);
                    for ret in callee.return_nodes() {
                        sdg.add_edge(ret, id, EdgeKind::Return);
                    }
                    callee_ids.push(callee.id);
                }

                sdg.call_actuals.insert(id, actuals);
                sdg.call_args.insert(id, args);
                sdg.call_actual_out.insert(id, actual_out);
                sdg.call_callees.insert(id, callee_ids);
            }
        }

        sdg.compute_summary_edges(rd, pta);
        sdg
    }

    /// Tabulation (design §4.5 "summary edges" / spec.md:123's Mod/Ref
    /// contract: "consumed by the dependence-graph builder to create
    /// summary edges without re-traversing callee bodies"). Two ways an
    /// actual-in can reach its call's actual-out:
    ///
    /// 1. **Object-based, no graph walk at all.** `RdAnalyzer::mod_ref`
    ///    already computed, per function, every object the callee may
    ///    write (`may_def`) and is guaranteed to write on every exit path
    ///    (`must_def`, a subset of `may_def`). If the argument's points-to
    ///    set names an object in either, the callee's effect on that
    ///    pointee makes the call's aggregate output depend on this
    ///    argument — a plain set-membership check against the already-run
    ///    RD pass, never a fresh traversal of the callee's instructions.
    /// 2. **Scalar fallback.** An argument with no resolvable points-to
    ///    set (a plain integer, or a pointer PTA never resolved) still
    ///    needs the intraprocedural formal-in → formal-out reachability
    ///    check over `Control`/`Data`/previously-discovered `Summary`
    ///    edges — never crossing another `Call`/`Return`, which would mean
    ///    re-deriving the nested callee's own summary instead of reusing
    ///    it. This is cached per `(callee, parameter index)` so that every
    ///    call site sharing a callee reuses one walk instead of repeating
    ///    it per call.
    ///
    /// Both need a bounded outer fixpoint since summaries feed each other
    /// across the call graph (mutual/recursive calls): a `Summary` edge
    /// discovered this round can make a formerly-unreachable callee body
    /// reachable next round via path (2).
    fn compute_summary_edges(&mut self, rd: &RdAnalyzer, pta: &FxHashMap<NodeId, PointsToSet>) {
        const BUDGET: usize = 64;
        for _ in 0..BUDGET {
            let mut added = false;
            let mut scalar_cache: FxHashMap<(NodeId, u32), bool> = FxHashMap::default();
            let calls: Vec<NodeId> = self.call_actuals.keys().copied().collect();
            for call in calls {
                let Some(&actual_out) = self.call_actual_out.get(&call) else { continue };
                let callees = self.call_callees.get(&call).cloned().unwrap_or_default();
                let actuals = self.call_actuals.get(&call).cloned().unwrap_or_default();
                let args = self.call_args.get(&call).cloned().unwrap_or_default();

                for callee in callees {
                    let Some(&callee_formal_out) = self.formal_out.get(&callee) else { continue };
                    let mod_ref = rd.mod_ref(callee);

                    for (index, &actual_in) in actuals.iter().enumerate() {
                        let Some(&formal_in) = self.formal_in.get(&(callee, index as u32)) else { continue };

                        let via_mod_ref = mod_ref
                            .zip(args.get(index))
                            .and_then(|(summary, &arg)| pta.get(&arg).map(|pts| (summary, pts)))
                            .map(|(summary, pts)| {
                                pts.valid_pointers().any(|p| match p.target {
                                    PointerTarget::Object(obj) => {
                                        summary.may_def.contains(&obj) || summary.must_def.contains(&obj)
                                    }
                                    _ => false,
                                })
                            })
                            .unwrap_or(false);

                        let key = (callee, index as u32);
                        let reaches = via_mod_ref
                            || *scalar_cache
                                .entry(key)
                                .or_insert_with(|| self.reaches_intraprocedurally(formal_in, callee_formal_out));

                        if reaches {
                            let before = self.edges.get(&actual_in).map(Vec::len).unwrap_or(0);
                            self.add_edge(actual_in, actual_out, EdgeKind::Summary);
                            if self.edges.get(&actual_in).map(Vec::len).unwrap_or(0) != before {
                                added = true;
                            }
                        }
                    }
                }
            }
            if !added {
                break;
            }
        }
    }

    fn reaches_intraprocedurally(&self, from: NodeId, to: NodeId) -> bool {
        let walker = Walker::new(|n| {
            self.edges_from(n)
                .iter()
                .filter(|(_, kind)| matches!(kind, EdgeKind::Control | EdgeKind::Data | EdgeKind::Summary))
                .map(|(n, _)| *n)
                .collect()
        });
        walker.reachable_from(from).contains(&to)
    }

    pub fn backward_slice(&self, target: NodeId, exclude: impl Fn(EdgeKind) -> bool) -> rustc_hash::FxHashSet<NodeId> {
        let walker = Walker::new(|n| {
            self.edges_into(n).iter().filter(|(_, kind)| !exclude(*kind)).map(|(n, _)| *n).collect()
        });
        walker.reachable_from(target)
    }

    pub fn forward_slice(&self, source: NodeId, exclude: impl Fn(EdgeKind) -> bool) -> rustc_hash::FxHashSet<NodeId> {
        let walker = Walker::new(|n| {
            self.edges_from(n).iter().filter(|(_, kind)| !exclude(*kind)).map(|(n, _)| *n).collect()
        });
        walker.reachable_from(source)
    }

    /// Statements on some path from `source` to `target` — a read-only
    /// diagnostic query, not a substitute for the slicer's own two-phase
    /// algorithm (design §4.6).
    pub fn chop(&self, source: NodeId, target: NodeId, exclude: impl Fn(EdgeKind) -> bool + Copy) -> rustc_hash::FxHashSet<NodeId> {
        let backward = self.backward_slice(target, exclude);
        let forward = self.forward_slice(source, exclude);
        backward.intersection(&forward).copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::points_to::PointsToSet;
    use crate::features::validation::domain::AnalysisStats;
    use crate::shared::config::RdOptions;
    use crate::shared::ir::{Function, Instruction, Program};
    use rustc_hash::FxHashMap;

    fn straight_line_program() -> Program {
        let mut program = Program::new();
        let mut f = Function::new(1, "f", 10);
        let mut a = Instruction::new(10, NodeKind::Alloc);
        a.successors.push(11);
        let mut s = Instruction::new(11, NodeKind::Store).with_operands(vec![Operand::Node(10), Operand::Node(10)]);
        s.predecessors.push(10);
        s.successors.push(12);
        let mut l = Instruction::new(12, NodeKind::Load).with_operands(vec![Operand::Node(10)]);
        l.predecessors.push(11);
        l.successors.push(13);
        let mut ret = Instruction::new(13, NodeKind::Return).with_operands(vec![Operand::Node(12)]);
        ret.predecessors.push(12);
        f.add_instruction(a);
        f.add_instruction(s);
        f.add_instruction(l);
        f.add_instruction(ret);
        program.functions.insert(1, f);
        program
    }

    #[test]
    fn load_is_data_dependent_on_preceding_store() {
        let program = straight_line_program();
        let pta: FxHashMap<NodeId, PointsToSet> = FxHashMap::default();
        let mut rd = RdAnalyzer::new(RdOptions { sparse: false, ..RdOptions::default() });
        rd.build(&program, &pta);
        rd.run(&program, &mut AnalysisStats::new());

        let sdg = SystemDependenceGraph::build(&program, &rd, &pta);
        assert!(sdg.edges_from(11).iter().any(|&(to, kind)| to == 12 && kind == EdgeKind::Data));
    }

    /// Mirrors a `fp(&a)` call site: the call's function-pointer operand
    /// may alias the only function in the program, resolved purely through
    /// points-to (no `Operand::Symbol` anywhere on the call).
    fn indirect_call_program() -> Program {
        let mut program = Program::new();

        let mut callee = Function::new(2, "callee", 20);
        callee.params.push(21);
        let mut entry = Instruction::new(20, NodeKind::Noop);
        entry.successors.push(22);
        let mut ret = Instruction::new(22, NodeKind::Return).with_operands(vec![Operand::Node(21)]);
        ret.predecessors.push(20);
        callee.add_instruction(entry);
        callee.add_instruction(ret);
        program.functions.insert(2, callee);

        let mut caller = Function::new(1, "caller", 2);
        let mut fnval = Instruction::new(2, NodeKind::Function);
        fnval.successors.push(10);
        let mut arg = Instruction::new(10, NodeKind::Alloc);
        arg.predecessors.push(2);
        arg.successors.push(11);
        let mut call = Instruction::new(11, NodeKind::Call).with_operands(vec![Operand::Node(2), Operand::Node(10)]);
        call.predecessors.push(10);
        call.successors.push(12);
        let mut done = Instruction::new(12, NodeKind::Return);
        done.predecessors.push(11);
        caller.add_instruction(fnval);
        caller.add_instruction(arg);
        caller.add_instruction(call);
        caller.add_instruction(done);
        program.functions.insert(1, caller);

        program
    }

    #[test]
    fn indirect_call_resolved_via_points_to_gets_call_and_parameter_edges() {
        let program = indirect_call_program();
        let mut pta: FxHashMap<NodeId, PointsToSet> = FxHashMap::default();
        let mut fnptr_pts = PointsToSet::new();
        fnptr_pts.insert(crate::features::points_to::Pointer::to_object(2, crate::features::offset::Offset::new(0)));
        pta.insert(2, fnptr_pts);

        let mut rd = RdAnalyzer::new(RdOptions { sparse: false, ..RdOptions::default() });
        rd.build(&program, &pta);
        rd.run(&program, &mut AnalysisStats::new());

        let sdg = SystemDependenceGraph::build(&program, &rd, &pta);
        assert!(sdg.edges_from(11).iter().any(|&(to, kind)| to == 20 && kind == EdgeKind::Call));
        assert!(!sdg.formal_to_actual(11).is_empty());
    }

    /// `callee(p) { *p = ...; return; }` called as `callee(&a)` — the
    /// pointee `a` lands in the callee's mod_ref summary (both `may_def`
    /// and `must_def`, since the store sits on the only path to return),
    /// so the actual-in bound to `&a` should get a `Summary` edge to the
    /// call's actual-out without any graph walk into the callee's body.
    fn write_through_pointer_arg_program() -> Program {
        let mut program = Program::new();

        let mut callee = Function::new(2, "callee", 20);
        callee.params.push(21);
        let mut store = Instruction::new(20, NodeKind::Store).with_operands(vec![Operand::Node(21), Operand::Node(21)]);
        store.successors.push(22);
        let mut ret = Instruction::new(22, NodeKind::Return);
        ret.predecessors.push(20);
        callee.add_instruction(store);
        callee.add_instruction(ret);
        program.functions.insert(2, callee);

        let mut caller = Function::new(1, "caller", 10);
        let mut alloc = Instruction::new(10, NodeKind::Alloc);
        alloc.successors.push(11);
        let mut call =
            Instruction::new(11, NodeKind::Call).with_operands(vec![Operand::Symbol("callee".into()), Operand::Node(10)]);
        call.predecessors.push(10);
        call.successors.push(12);
        let mut done = Instruction::new(12, NodeKind::Return);
        done.predecessors.push(11);
        caller.add_instruction(alloc);
        caller.add_instruction(call);
        caller.add_instruction(done);
        program.functions.insert(1, caller);

        program
    }

    #[test]
    fn summary_edge_comes_from_mod_ref_not_a_callee_body_walk() {
        let program = write_through_pointer_arg_program();
        let mut pta: FxHashMap<NodeId, PointsToSet> = FxHashMap::default();
        let object = crate::features::points_to::Pointer::to_object(10, crate::features::offset::Offset::new(0));
        let mut arg_pts = PointsToSet::new();
        arg_pts.insert(object);
        pta.insert(10, arg_pts.clone());
        pta.insert(21, arg_pts);

        let mut rd = RdAnalyzer::new(RdOptions { sparse: false, ..RdOptions::default() });
        rd.build(&program, &pta);
        rd.run(&program, &mut AnalysisStats::new());

        let summary = rd.mod_ref(2).expect("callee's mod_ref summary should exist");
        assert!(summary.may_def.contains(&10));
        assert!(summary.must_def.contains(&10));

        let sdg = SystemDependenceGraph::build(&program, &rd, &pta);
        let actual_in = sdg.formal_to_actual(11)[0];
        let actual_out = sdg.call_actual_out[&11];
        assert!(sdg.edges_from(actual_in).iter().any(|&(to, kind)| to == actual_out && kind == EdgeKind::Summary));
    }
}
