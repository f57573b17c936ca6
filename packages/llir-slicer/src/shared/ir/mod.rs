//! The host-provided IR adapter.
//!
//! This is the boundary named in the design's §1 "deliberately OUT of
//! scope": a real deployment plugs in a parser for its own LLIR dialect
//! and builds a [`Program`] from it. What lives here is the in-memory
//! shape every analysis stage in this crate is written against: modules →
//! functions → blocks → instructions, globals with initializers, and
//! struct/array layout queries.

mod layout;
mod node;
mod program;

pub use layout::Layout;
pub use node::{DebugLoc, NodeId, NodeKind, Operand};
pub use program::{Function, Global, Initializer, Program};
