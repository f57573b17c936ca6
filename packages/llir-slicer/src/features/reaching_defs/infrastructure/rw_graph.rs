//! The reaching-definitions graph: a copy of the CFG annotated with each
//! node's `defs` (weak writes), `overwrites` (strong writes), and `uses`
//! (reads), mirroring the CFG the same way `PointerGraph` mirrors it for
//! points-to (design §4.3 `build`).

use crate::features::offset::Offset;
use crate::features::points_to::{PointerTarget, PointsToSet};
use crate::features::reaching_defs::domain::DefSite;
use crate::features::reaching_defs::infrastructure::mod_ref::ModRefSummary;
use crate::shared::config::RdOptions;
use crate::shared::ir::{Function, NodeId, NodeKind, Operand, Program};
use rustc_hash::FxHashMap;

/// Pseudo-object standing in for "some memory we couldn't resolve a
/// pointer to" — a write through an unknown/invalidated pointer, or an
/// opaque call's conservative effect, targets this object instead of a
/// real allocation site. Distinct from `dominance::VIRTUAL_EXIT`'s sentinel
/// space; each component reserves its own out-of-band IDs (design §9 notes
/// these sentinels must be unique per program graph, not a module global —
/// here the "graph" is this feature's own RwGraph, not the shared Program).
pub const UNKNOWN_MEMORY: NodeId = u32::MAX - 1;

#[derive(Debug, Clone)]
pub struct RwNode {
    pub kind: NodeKind,
    pub function: NodeId,
    pub successors: Vec<NodeId>,
    pub predecessors: Vec<NodeId>,
    pub defs: Vec<DefSite>,
    pub overwrites: Vec<DefSite>,
    pub uses: Vec<DefSite>,
}

#[derive(Debug, Clone, Default)]
pub struct RwGraph {
    pub nodes: FxHashMap<NodeId, RwNode>,
    pub order: Vec<NodeId>,
    /// Every `ALLOC`/`DynAlloc`/global object in the program, consulted by
    /// the `AssignmentFinder` pre-pass when it expands an `UNKNOWN_MEMORY`
    /// read/write into a weak access of every allocated object.
    pub alloc_sites: Vec<NodeId>,
}

fn def_site_for(target: NodeId, offset: Offset, type_size: Option<u64>) -> DefSite {
    let len = type_size.map(Offset::new).unwrap_or(Offset::UNKNOWN);
    DefSite::new(target, offset, len)
}

/// Resolve a pointer operand's points-to set into the `DefSite`s a
/// read/write through it may touch, plus whether the access is precise
/// enough to be a strong update (single known target, concrete offset).
fn resolve_sites(pts: &PointsToSet, type_size: Option<u64>, field_insensitive: bool) -> (Vec<DefSite>, bool) {
    let mut sites = Vec::new();
    for p in pts.valid_pointers() {
        if let PointerTarget::Object(obj) = p.target {
            let offset = if field_insensitive { Offset::UNKNOWN } else { p.offset };
            sites.push(def_site_for(obj, offset, type_size));
        }
    }
    if pts.has_unknown() || pts.has_invalidated() {
        sites.push(DefSite::whole_object(UNKNOWN_MEMORY));
    }
    let strong = pts.is_known_singleton() && !field_insensitive && sites.len() == 1 && sites[0].offset.value().is_some();
    (sites, strong)
}

fn node_operands(operands: &[Operand]) -> impl Iterator<Item = NodeId> + '_ {
    operands.iter().filter_map(|op| if let Operand::Node(n) = op { Some(*n) } else { None })
}

/// Every function a call instruction may reach: the named function for a
/// direct call, or every points-to candidate whose pointer target is a
/// function for an indirect one (mirrors `dependence::infrastructure::sdg`'s
/// own callee resolution, so both features agree on what "resolved" means).
fn resolve_callees<'p>(operands: &[Operand], program: &'p Program, pta: &FxHashMap<NodeId, PointsToSet>) -> Vec<&'p Function> {
    if let Some(callee) = operands.iter().find_map(|op| match op {
        Operand::Symbol(name) => program.function_by_name(name),
        _ => None,
    }) {
        return vec![callee];
    }
    let Some(fnptr) = node_operands(operands).next() else { return Vec::new() };
    pta.get(&fnptr)
        .map(|set| {
            set.valid_pointers()
                .filter_map(|p| match p.target {
                    PointerTarget::Object(t) => program.functions.get(&t),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Whether every `Call` node's `defs`/`uses` agree between two builds of the
/// same program — the fixpoint stop condition for [`RwGraph::build`]'s
/// summary refinement.
fn call_sites_stable(prev: &RwGraph, next: &RwGraph) -> bool {
    prev.order.iter().all(|id| {
        let (Some(p), Some(n)) = (prev.node(*id), next.node(*id)) else { return true };
        if p.kind != NodeKind::Call {
            return true;
        }
        let mut pd = p.defs.clone();
        let mut nd = n.defs.clone();
        pd.sort();
        nd.sort();
        let mut pu = p.uses.clone();
        let mut nu = n.uses.clone();
        pu.sort();
        nu.sort();
        pd == nd && pu == nu
    })
}

impl RwGraph {
    /// Builds the read/write graph, then refines every resolvable call
    /// site's blanket `UNKNOWN_MEMORY` effect into the precise union of its
    /// callee(s)' Mod/Ref summary, re-summarizing and re-refining to a
    /// bounded fixpoint (mirrors `SystemDependenceGraph::compute_summary_edges`'s
    /// own bounded-budget tabulation pass). Each round only replaces a
    /// blanket default with a same-or-more-precise summary-derived one, so
    /// stopping early on the budget is conservative, never unsound.
    pub fn build(program: &Program, pta: &FxHashMap<NodeId, PointsToSet>, options: &RdOptions) -> RwGraph {
        const REFINEMENT_BUDGET: usize = 8;

        let mut graph = Self::build_once(program, pta, options, None);
        for _ in 0..REFINEMENT_BUDGET {
            let summaries: FxHashMap<NodeId, ModRefSummary> =
                program.functions.values().map(|f| (f.id, ModRefSummary::compute(f, &graph))).collect();
            let refined = Self::build_once(program, pta, options, Some(&summaries));
            let stable = call_sites_stable(&graph, &refined);
            graph = refined;
            if stable {
                break;
            }
        }
        graph
    }

    fn build_once(
        program: &Program,
        pta: &FxHashMap<NodeId, PointsToSet>,
        options: &RdOptions,
        summaries: Option<&FxHashMap<NodeId, ModRefSummary>>,
    ) -> RwGraph {
        let mut nodes = FxHashMap::default();
        let mut order = Vec::new();
        let mut alloc_sites = Vec::new();

        let empty_pts = PointsToSet::unknown();
        let pts_of = |id: NodeId| pta.get(&id).unwrap_or(&empty_pts);

        for function in program.functions.values() {
            for &id in &function.order {
                let Some(instr) = function.instruction(id) else { continue };
                let mut defs = Vec::new();
                let mut overwrites = Vec::new();
                let mut uses = Vec::new();

                match instr.kind {
                    NodeKind::Alloc | NodeKind::DynAlloc => {
                        alloc_sites.push(id);
                        overwrites.push(DefSite::whole_object(id));
                    }
                    NodeKind::Store => {
                        let mut ops = node_operands(&instr.operands);
                        if let (Some(val), Some(ptr)) = (ops.next(), ops.next()) {
                            let _ = val;
                            let (sites, strong) = resolve_sites(pts_of(ptr), instr.type_size, options.field_insensitive);
                            if strong {
                                overwrites.extend(sites);
                            } else {
                                defs.extend(sites);
                            }
                        }
                    }
                    NodeKind::Memcpy => {
                        let mut ops = node_operands(&instr.operands);
                        if let (Some(dst), Some(src)) = (ops.next(), ops.next()) {
                            let (dst_sites, strong) = resolve_sites(pts_of(dst), instr.type_size, options.field_insensitive);
                            if strong {
                                overwrites.extend(dst_sites);
                            } else {
                                defs.extend(dst_sites);
                            }
                            let (src_sites, _) = resolve_sites(pts_of(src), instr.type_size, options.field_insensitive);
                            uses.extend(src_sites);
                        }
                    }
                    NodeKind::Load => {
                        if let Some(ptr) = node_operands(&instr.operands).next() {
                            let (sites, _) = resolve_sites(pts_of(ptr), instr.type_size, options.field_insensitive);
                            uses.extend(sites);
                        }
                    }
                    NodeKind::Free | NodeKind::InvalidateObject => {
                        if let Some(target) = node_operands(&instr.operands).next() {
                            let (sites, _) = resolve_sites(pts_of(target), None, options.field_insensitive);
                            overwrites.extend(sites);
                        }
                    }
                    NodeKind::Call => {
                        let callees = resolve_callees(&instr.operands, program, pta);
                        let known_summaries = summaries.filter(|s| callees.iter().all(|c| s.contains_key(&c.id)));
                        match (callees.is_empty(), known_summaries) {
                            (true, _) => {
                                // Opaque call: no callee resolved at all, direct or
                                // through points-to. `undefined_are_pure` only gates
                                // this case, never a call we can actually bind.
                                if !options.undefined_are_pure {
                                    defs.push(DefSite::whole_object(UNKNOWN_MEMORY));
                                    uses.push(DefSite::whole_object(UNKNOWN_MEMORY));
                                }
                            }
                            (false, Some(summaries)) => {
                                for callee in &callees {
                                    let summary = &summaries[&callee.id];
                                    defs.extend(summary.may_def.iter().map(|&t| DefSite::whole_object(t)));
                                    uses.extend(summary.may_ref.iter().map(|&t| DefSite::whole_object(t)));
                                }
                            }
                            (false, None) => {
                                // First pass: no summary computed yet. Blanket
                                // default, refined once `build`'s fixpoint loop
                                // reruns this with a summary in hand.
                                defs.push(DefSite::whole_object(UNKNOWN_MEMORY));
                                uses.push(DefSite::whole_object(UNKNOWN_MEMORY));
                            }
                        }
                    }
                    _ => {}
                }

                nodes.insert(
                    id,
                    RwNode {
                        kind: instr.kind,
                        function: function.id,
                        successors: instr.successors.clone(),
                        predecessors: instr.predecessors.clone(),
                        defs,
                        overwrites,
                        uses,
                    },
                );
                order.push(id);
            }
        }

        for global in program.globals.values() {
            alloc_sites.push(global.id);
        }

        RwGraph { nodes, order, alloc_sites }
    }

    pub fn node(&self, id: NodeId) -> Option<&RwNode> {
        self.nodes.get(&id)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut RwNode> {
        self.nodes.get_mut(&id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::ir::Instruction;

    fn default_options() -> RdOptions {
        RdOptions { sparse: false, ..RdOptions::default() }
    }

    /// `caller` calls `callee` directly; `callee` stores through its own
    /// alloc and nothing else.
    fn program_with_direct_call() -> Program {
        let mut program = Program::new();

        let mut callee = Function::new(2, "callee", 20);
        let mut alloc = Instruction::new(20, NodeKind::Alloc);
        alloc.successors.push(21);
        let mut store = Instruction::new(21, NodeKind::Store).with_operands(vec![Operand::Node(20), Operand::Node(20)]);
        store.predecessors.push(20);
        store.successors.push(22);
        let mut ret = Instruction::new(22, NodeKind::Return);
        ret.predecessors.push(21);
        callee.add_instruction(alloc);
        callee.add_instruction(store);
        callee.add_instruction(ret);
        program.functions.insert(2, callee);

        let mut caller = Function::new(1, "caller", 10);
        let mut call = Instruction::new(10, NodeKind::Call).with_operands(vec![Operand::Symbol("callee".into())]);
        call.successors.push(11);
        let mut done = Instruction::new(11, NodeKind::Return);
        done.predecessors.push(10);
        caller.add_instruction(call);
        caller.add_instruction(done);
        program.functions.insert(1, caller);

        program
    }

    #[test]
    fn resolvable_call_gets_precise_mod_ref_instead_of_blanket_unknown() {
        let program = program_with_direct_call();
        let mut pta: FxHashMap<NodeId, PointsToSet> = FxHashMap::default();
        let mut alloc_pts = PointsToSet::new();
        alloc_pts.insert(crate::features::points_to::Pointer::to_object(20, Offset::new(0)));
        pta.insert(20, alloc_pts);
        let graph = RwGraph::build(&program, &pta, &default_options());

        let call = graph.node(10).expect("call node present");
        assert!(call.defs.iter().any(|s| s.target == 20), "expected the callee's own alloc as a def target");
        assert!(!call.defs.iter().any(|s| s.target == UNKNOWN_MEMORY), "precise summary should drop blanket UNKNOWN_MEMORY");
    }

    #[test]
    fn unresolvable_call_keeps_blanket_unknown_memory() {
        let mut program = Program::new();
        let mut caller = Function::new(1, "caller", 10);
        let mut call = Instruction::new(10, NodeKind::Call);
        call.successors.push(11);
        let mut done = Instruction::new(11, NodeKind::Return);
        done.predecessors.push(10);
        caller.add_instruction(call);
        caller.add_instruction(done);
        program.functions.insert(1, caller);

        let pta: FxHashMap<NodeId, PointsToSet> = FxHashMap::default();
        let graph = RwGraph::build(&program, &pta, &default_options());

        let call = graph.node(10).expect("call node present");
        assert!(call.defs.iter().any(|s| s.target == UNKNOWN_MEMORY));
        assert!(call.uses.iter().any(|s| s.target == UNKNOWN_MEMORY));
    }
}
