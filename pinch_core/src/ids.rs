//! Stable integer identifiers, in place of the pointers used by the source engine (see
//! `SPEC_FULL.md` section 4.2.1).

/// A contig identifier. Positive is the forward strand, negative its reverse complement.
pub type Name = i64;

/// A component identifier, assigned densely during adjacency-component enumeration.
pub type ComponentId = u32;

/// A graph vertex. Stable across the graph's lifetime, never reused after [`crate::PinchGraph::destroy_vertex`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VertexId(pub u64);

impl VertexId {
    /// The distinguished sink vertex that unattached stub components get linked to.
    pub const SINK: VertexId = VertexId(0);
}

/// A black edge, encoded as `(canonical block index, orientation)` packed into the low bit, per
/// the redesign note resolved in `SPEC_FULL.md` 4.2.1: `twin` is a pure id computation rather than
/// a pointer chase.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlockId(pub u64);

impl BlockId {
    /// The forward-oriented id for this block, clearing the orientation bit.
    pub fn canonical(self) -> BlockId {
        BlockId(self.0 & !1)
    }

    /// True if this id already names the forward orientation.
    pub fn is_canonical(self) -> bool {
        self.0 & 1 == 0
    }

    /// The same block, opposite orientation.
    pub fn twin(self) -> BlockId {
        BlockId(self.0 ^ 1)
    }
}

/// Which side of a split point a vertex sits on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Side {
    /// The lower-coordinate side.
    Left,
    /// The higher-coordinate side.
    Right,
}

impl Side {
    /// The opposite side.
    pub fn flip(self) -> Side {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }
}

// `pinch_digraph::Edge<VertexId>` is satisfied via the blanket `impl<N: Copy> Edge<N> for N`.
