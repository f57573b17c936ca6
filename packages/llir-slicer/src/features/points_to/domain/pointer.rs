use crate::features::offset::Offset;
use crate::shared::ir::NodeId;
use serde::{Deserialize, Serialize};

/// What a [`Pointer`] designates: an allocation-site node, or one of the
/// three sentinels the design calls out — `NULL`, `UNKNOWN_MEMORY`, and
/// `INVALIDATED` (a target that has been freed while `invalidate_nodes` is
/// on).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PointerTarget {
    Object(NodeId),
    Null,
    Unknown,
    Invalidated,
}

impl PointerTarget {
    pub fn is_valid(&self) -> bool {
        matches!(self, PointerTarget::Object(_))
    }
}

/// A `(target, offset)` pair. Two pointers are equal iff both components
/// are equal — a pointer into the same object at an unknown offset is a
/// distinct fact from one at offset zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pointer {
    pub target: PointerTarget,
    pub offset: Offset,
}

impl Pointer {
    pub fn new(target: PointerTarget, offset: Offset) -> Self {
        Self { target, offset }
    }

    pub fn to_object(node: NodeId, offset: Offset) -> Self {
        Self::new(PointerTarget::Object(node), offset)
    }

    pub fn null() -> Self {
        Self::new(PointerTarget::Null, Offset::new(0))
    }

    pub fn unknown() -> Self {
        Self::new(PointerTarget::Unknown, Offset::UNKNOWN)
    }

    pub fn invalidated() -> Self {
        Self::new(PointerTarget::Invalidated, Offset::UNKNOWN)
    }

    pub fn is_valid(&self) -> bool {
        self.target.is_valid()
    }

    /// Apply a GEP-style shift, saturating the offset arithmetic and
    /// collapsing past `bound` bytes to [`Offset::UNKNOWN`] (the field
    /// sensitivity cap from `PtaOptions::field_sensitivity_bound`).
    pub fn shifted(&self, shift: Offset, bound: u64) -> Pointer {
        let new_offset = self.offset + shift;
        let capped = match new_offset.value() {
            Some(v) if v > bound => Offset::UNKNOWN,
            _ => new_offset,
        };
        Pointer::new(self.target, capped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_requires_both_components_equal() {
        let a = Pointer::to_object(1, Offset::new(4));
        let b = Pointer::to_object(1, Offset::new(8));
        assert_ne!(a, b);
        assert_eq!(a, Pointer::to_object(1, Offset::new(4)));
    }

    #[test]
    fn sentinels_are_not_valid() {
        assert!(!Pointer::null().is_valid());
        assert!(!Pointer::unknown().is_valid());
        assert!(!Pointer::invalidated().is_valid());
        assert!(Pointer::to_object(5, Offset::new(0)).is_valid());
    }

    #[test]
    fn shift_caps_at_field_sensitivity_bound() {
        let p = Pointer::to_object(1, Offset::new(10));
        let shifted = p.shifted(Offset::new(300), 256);
        assert!(shifted.offset.is_unknown());
    }
}
