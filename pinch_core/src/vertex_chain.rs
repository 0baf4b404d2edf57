//! C3: the intermediate representation used while merging two pieces (`SPEC_FULL.md` 4.3).

use crate::error::{precondition, Result};
use crate::graph::PinchGraph;
use crate::ids::{BlockId, Side, VertexId};
use crate::piece::Piece;

/// A chain of vertices covering one piece, in contig order, each tagged with its offset from
/// `piece.start` and whether it is the LEFT or RIGHT endpoint of the black edge it terminates.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VertexChain {
    /// The chain's vertices, in contig order.
    pub vertices: Vec<VertexId>,
    /// Each vertex's offset from the piece's start.
    pub coords: Vec<i64>,
    /// Which side of its edge each vertex terminates.
    pub sides: Vec<Side>,
}

impl VertexChain {
    /// An empty chain.
    pub fn new() -> VertexChain {
        VertexChain::default()
    }

    /// Empties the chain in place, keeping its backing allocations.
    pub fn clear(&mut self) {
        self.vertices.clear();
        self.coords.clear();
        self.sides.clear();
    }

    fn push(&mut self, vertex: VertexId, coord: i64, side: Side) {
        self.vertices.push(vertex);
        self.coords.push(coord);
        self.sides.push(side);
    }

    /// Number of vertices in the chain.
    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    /// True if the chain has no vertices.
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Two chains are structurally equal when their `coords`/`sides` arrays match; the vertices
    /// themselves may still differ (that is precisely what `pinch_merge_piece` fixes up).
    pub fn structurally_equal(&self, other: &VertexChain) -> bool {
        self.coords == other.coords && self.sides == other.sides
    }
}

/// Caller-owned, reusable scratch space for a single `pinch_merge_piece` call, per the "static
/// work buffers become caller-owned reusable buffers" design note.
#[derive(Default)]
pub struct PinchMergeScratch {
    /// Scratch chain for the first piece.
    pub chain1: VertexChain,
    /// Scratch chain for the second piece.
    pub chain2: VertexChain,
}

impl PinchMergeScratch {
    /// A scratch buffer with both chains empty.
    pub fn new() -> PinchMergeScratch {
        PinchMergeScratch::default()
    }
}

fn find_edge_at(graph: &PinchGraph, contig: crate::ids::Name, start: i64) -> Result<BlockId> {
    // The vertex doesn't matter for the lookup itself, since `split_edge` already guarantees the
    // boundary exists; we just need any vertex incident on it. `split_edge` with LEFT at `start`
    // returns exactly that vertex, so callers are expected to have called it already.
    let v = graph.split_edge(contig, start, Side::Left)?;
    graph
        .black_edges(v)
        .find(|&id| {
            let p = graph.edge_piece(id);
            p.contig == contig && p.start == start
        })
        .ok_or_else(|| precondition("get_chain_of_vertices", format!("no edge at contig {contig} position {start}")))
}

/// Builds the vertex chain covering `piece`, splitting edges as needed so that every offset
/// boundary inside the piece gets its own vertex.
pub fn get_chain_of_vertices(graph: &mut PinchGraph, piece: Piece, out: &mut VertexChain) -> Result<()> {
    out.clear();

    let left_vertex = graph.split_edge(piece.contig, piece.start, Side::Left)?;
    graph.split_edge(piece.contig, piece.end, Side::Right)?;

    out.push(left_vertex, 0, Side::Left);

    let mut edge = find_edge_at(graph, piece.contig, piece.start)?;
    loop {
        let edge_piece = graph.edge_piece(edge);
        let offset_end = edge_piece.end - piece.start;
        out.push(graph.edge_to(edge), offset_end, Side::Right);
        if edge_piece.end == piece.end {
            break;
        }
        edge = graph.get_next_edge(edge)?;
        let next_piece = graph.edge_piece(edge);
        out.push(graph.edge_from(edge), next_piece.start - piece.start, Side::Left);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chain_covers_single_edge_piece() {
        let mut g = PinchGraph::new();
        g.add_sequence(1, 10).unwrap();
        let mut chain = VertexChain::new();
        get_chain_of_vertices(&mut g, Piece::new(1, 1, 10), &mut chain).unwrap();
        assert_eq!(chain.coords, vec![0, 9]);
        assert_eq!(chain.sides, vec![Side::Left, Side::Right]);
    }

    #[test]
    fn chain_covers_multiple_edges_after_prior_split() {
        let mut g = PinchGraph::new();
        g.add_sequence(1, 10).unwrap();
        g.split_edge(1, 5, Side::Right).unwrap();

        let mut chain = VertexChain::new();
        get_chain_of_vertices(&mut g, Piece::new(1, 1, 10), &mut chain).unwrap();
        assert_eq!(chain.coords, vec![0, 4, 5, 9]);
        assert_eq!(
            chain.sides,
            vec![Side::Left, Side::Right, Side::Left, Side::Right]
        );
    }

    #[test]
    fn structural_equality_ignores_vertex_identity() {
        let mut a = VertexChain::new();
        a.push(VertexId(1), 0, Side::Left);
        a.push(VertexId(2), 9, Side::Right);
        let mut b = VertexChain::new();
        b.push(VertexId(99), 0, Side::Left);
        b.push(VertexId(100), 9, Side::Right);
        assert!(a.structurally_equal(&b));
    }
}
