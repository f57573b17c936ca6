use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, Sub};

/// A byte offset within an abstract memory object.
///
/// `UNKNOWN` is a sentinel distinct from any concrete value — the
/// analyzer's way of saying "some offset, we don't know which", not "zero".
/// Arithmetic saturates instead of wrapping: an offset that would overflow
/// `u64` or combine with `UNKNOWN` collapses to `UNKNOWN` rather than
/// panicking or wrapping into a bogus concrete value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Offset(Option<u64>);

impl Offset {
    pub const UNKNOWN: Offset = Offset(None);

    pub const fn new(value: u64) -> Self {
        Offset(Some(value))
    }

    pub fn is_unknown(&self) -> bool {
        self.0.is_none()
    }

    pub fn value(&self) -> Option<u64> {
        self.0
    }
}

impl Default for Offset {
    fn default() -> Self {
        Offset::new(0)
    }
}

impl From<u64> for Offset {
    fn from(value: u64) -> Self {
        Offset::new(value)
    }
}

impl Add for Offset {
    type Output = Offset;

    fn add(self, rhs: Offset) -> Offset {
        match (self.0, rhs.0) {
            (Some(a), Some(b)) => Offset(Some(a.saturating_add(b))),
            _ => Offset::UNKNOWN,
        }
    }
}

impl Sub for Offset {
    type Output = Offset;

    /// Saturates at zero rather than going negative — offsets never
    /// represent "before the start of the object" in this model.
    fn sub(self, rhs: Offset) -> Offset {
        match (self.0, rhs.0) {
            (Some(a), Some(b)) => Offset(Some(a.saturating_sub(b))),
            _ => Offset::UNKNOWN,
        }
    }
}

impl Ord for Offset {
    /// `UNKNOWN` sorts as maximum: it stands for "somewhere in the object,
    /// we don't know where", which must come after every concrete byte
    /// position for range-style reasoning (e.g. "is this within bounds") to
    /// stay conservative rather than accidentally sorting first.
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.map_or(u64::MAX, |v| v).cmp(&other.0.map_or(u64::MAX, |v| v))
    }
}

impl PartialOrd for Offset {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Offset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(v) => write!(f, "{v}"),
            None => write!(f, "<unknown>"),
        }
    }
}
