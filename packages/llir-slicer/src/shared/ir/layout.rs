//! Struct/array layout queries, used by field-sensitive GEP offset
//! computation (design §4.2) to turn a chain of member/index accesses
//! into a single byte offset, and by global-initializer recursion to
//! size nested `Initializer`s.

use serde::{Deserialize, Serialize};

/// A single field of a `Struct` layout: byte offset from the start of the
/// struct and the size of the field itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub offset: u64,
    pub size: u64,
}

/// A type layout, as much as the adapter needs to expose for offset
/// arithmetic. Anything not a struct or array is treated as an opaque
/// scalar of a given size.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Layout {
    Scalar { size: u64 },
    Struct { size: u64, fields: Vec<Field> },
    Array { element_size: u64, count: u64 },
}

impl Layout {
    pub fn size(&self) -> u64 {
        match self {
            Layout::Scalar { size } => *size,
            Layout::Struct { size, .. } => *size,
            Layout::Array { element_size, count } => element_size.saturating_mul(*count),
        }
    }

    /// Byte offset of the `index`-th field of a struct layout, or `None`
    /// if `self` isn't a struct or the index is out of range.
    pub fn field_offset(&self, index: usize) -> Option<u64> {
        match self {
            Layout::Struct { fields, .. } => fields.get(index).map(|f| f.offset),
            _ => None,
        }
    }

    /// Byte offset of the `index`-th element of an array layout, saturating
    /// rather than overflowing when `index` is absurdly large — the same
    /// saturating convention `Offset` arithmetic uses elsewhere (design
    /// §4.1).
    pub fn element_offset(&self, index: u64) -> Option<u64> {
        match self {
            Layout::Array { element_size, .. } => Some(element_size.saturating_mul(index)),
            _ => None,
        }
    }
}
