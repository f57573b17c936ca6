/// Which edge list a traversal follows. The dominance module walks
/// `Forward` for dominators and `Backward` for post-dominators over the
/// same instruction graph; the slicer's two phases walk `Backward` over
/// the dependence graph with different edge-kind exclusions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

impl Direction {
    pub fn reverse(self) -> Direction {
        match self {
            Direction::Forward => Direction::Backward,
            Direction::Backward => Direction::Forward,
        }
    }
}
