use super::pointer::{Pointer, PointerTarget};
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

/// A set of pointers, with the semantic predicates the design names
/// separately from plain set membership: `hasNull`/`hasUnknown`/
/// `hasInvalidated` track sentinel presence; iteration yields valid
/// (object) pointers only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointsToSet {
    pointers: FxHashSet<Pointer>,
}

impl PointsToSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn unknown() -> Self {
        let mut set = Self::new();
        set.insert(Pointer::unknown());
        set
    }

    pub fn insert(&mut self, pointer: Pointer) -> bool {
        self.pointers.insert(pointer)
    }

    /// Union `other` into `self`, returning whether anything changed —
    /// the growth check every fixpoint's worklist relies on to detect "no
    /// change, stop re-queueing this node."
    pub fn union_with(&mut self, other: &PointsToSet) -> bool {
        let before = self.pointers.len();
        self.pointers.extend(other.pointers.iter().copied());
        self.pointers.len() != before
    }

    pub fn empty(&self) -> bool {
        self.pointers.is_empty()
    }

    pub fn has_null(&self) -> bool {
        self.pointers.iter().any(|p| p.target == PointerTarget::Null)
    }

    pub fn has_unknown(&self) -> bool {
        self.pointers.iter().any(|p| p.target == PointerTarget::Unknown)
    }

    pub fn has_invalidated(&self) -> bool {
        self.pointers.iter().any(|p| p.target == PointerTarget::Invalidated)
    }

    /// A valid (non-sentinel) pointer, and only that pointer, is present —
    /// the sentinel slots may or may not also be populated.
    pub fn is_singleton(&self) -> bool {
        self.valid_pointers().count() == 1
    }

    /// Singleton *and* that pointer's target is valid and not invalidated —
    /// the strongest of the cardinality predicates, used to justify a
    /// strong update.
    pub fn is_known_singleton(&self) -> bool {
        self.is_singleton() && !self.has_invalidated() && !self.has_unknown()
    }

    /// Iterate the valid (object) pointers only — sentinel membership is
    /// queried separately via `has_null`/`has_unknown`/`has_invalidated`.
    pub fn valid_pointers(&self) -> impl Iterator<Item = &Pointer> {
        self.pointers.iter().filter(|p| p.is_valid())
    }

    pub fn len(&self) -> usize {
        self.pointers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pointers.is_empty()
    }

    /// Rewrite every pointer currently targeting `freed` to
    /// [`PointerTarget::Invalidated`], per the `invalidateNodes` semantics
    /// for `FREE`/`INVALIDATE_OBJECT`.
    pub fn invalidate(&mut self, freed: crate::shared::ir::NodeId) {
        let stale: Vec<Pointer> = self
            .pointers
            .iter()
            .filter(|p| p.target == PointerTarget::Object(freed))
            .copied()
            .collect();
        for p in stale {
            self.pointers.remove(&p);
            self.pointers.insert(Pointer::invalidated());
        }
    }
}

impl FromIterator<Pointer> for PointsToSet {
    fn from_iter<T: IntoIterator<Item = Pointer>>(iter: T) -> Self {
        Self { pointers: iter.into_iter().collect() }
    }
}
