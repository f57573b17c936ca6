//! Instruction node identities and the closed opcode tag set.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable node identifier. `0` is reserved for "invalid" — constructing a
/// graph with a node at ID 0, or querying one, is a programming error.
pub type NodeId = u32;

/// The closed set of instruction/value kinds the analyzer understands,
/// per the design's data model (§3) and the PTA node inventory (§4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    Alloc,
    DynAlloc,
    Store,
    Load,
    Phi,
    Gep,
    Cast,
    Call,
    CallReturn,
    Return,
    Fork,
    Join,
    /// Lock acquire, used only when building thread regions (§4.7).
    Lock,
    /// Lock release.
    Unlock,
    NullAddr,
    UnknownMem,
    Invalidated,
    Noop,
    Constant,
    Function,
    /// PTA-only: marks an object as freed/invalidated without being a
    /// `CALL` to a named free function (e.g. a scope-exit destructor).
    InvalidateObject,
    /// `free(ptr)`-shaped call, recognized as invalidation when
    /// `invalidate_nodes` is enabled.
    Free,
    /// `memcpy(dst, src, len)`.
    Memcpy,
}

impl NodeKind {
    /// Expected operand count for opcodes with a fixed arity, per the
    /// PTA validator rule in design §4.2. Variadic kinds return `None`.
    pub fn expected_operand_count(&self) -> Option<usize> {
        match self {
            NodeKind::Store | NodeKind::Memcpy => Some(2),
            NodeKind::Load
            | NodeKind::Cast
            | NodeKind::Gep
            | NodeKind::Free
            | NodeKind::InvalidateObject
            | NodeKind::Return => Some(1),
            NodeKind::NullAddr
            | NodeKind::UnknownMem
            | NodeKind::Noop
            | NodeKind::Function
            | NodeKind::Constant
            | NodeKind::Alloc
            | NodeKind::DynAlloc => Some(0),
            // PHI, CALL, and the rest have variable arity.
            NodeKind::Phi | NodeKind::Call | NodeKind::CallReturn => None,
            NodeKind::Fork | NodeKind::Join | NodeKind::Lock | NodeKind::Unlock => None,
            NodeKind::Invalidated => Some(0),
        }
    }

    /// Whether a non-root node of this kind is exempt from the "every
    /// non-root node has a predecessor" validator rule.
    pub fn exempt_from_predecessor_rule(&self) -> bool {
        matches!(
            self,
            NodeKind::Function | NodeKind::Constant | NodeKind::NullAddr | NodeKind::UnknownMem
        )
    }

    /// Whether this kind participates in the pointer-relevant subgraph the
    /// PTA builder materializes (design §4.2 `build`).
    pub fn is_pta_relevant(&self) -> bool {
        matches!(
            self,
            NodeKind::Alloc
                | NodeKind::DynAlloc
                | NodeKind::Store
                | NodeKind::Load
                | NodeKind::Gep
                | NodeKind::Cast
                | NodeKind::Phi
                | NodeKind::Call
                | NodeKind::CallReturn
                | NodeKind::Constant
                | NodeKind::NullAddr
                | NodeKind::UnknownMem
                | NodeKind::Function
                | NodeKind::InvalidateObject
                | NodeKind::Free
                | NodeKind::Noop
                | NodeKind::Memcpy
                // A FORK's own node stands for the thread handle it hands
                // back; tracked as an object so a JOIN's handle argument can
                // be resolved against it through aliasing, same as any
                // other pointer-sized value.
                | NodeKind::Fork
        )
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/// An instruction's operand: either a reference to another node's result,
/// or a small set of inline payloads opcodes need (a field offset for
/// `GEP`, a callee name for unresolved calls, etc).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operand {
    Node(NodeId),
    /// A compile-time-constant byte offset, used by `GEP`.
    ConstOffset(u64),
    /// An unresolved callee name (resolved to `FUNCTION` nodes, or left
    /// unknown, by the caller's points-to results).
    Symbol(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DebugLoc {
    pub file: u32,
    pub line: u32,
    pub column: u32,
}
