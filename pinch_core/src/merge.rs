//! C5: pinch merge, the core algorithm (`SPEC_FULL.md` 4.5, 4.5.1).

use log::{debug, trace};

use crate::adjacency::AdjacencyIndex;
use crate::error::{precondition, Result};
use crate::external::{Op, PairwiseAlignment};
use crate::graph::PinchGraph;
use crate::ids::{Name, Side, VertexId};
use crate::piece::Piece;
use crate::vertex_chain::{get_chain_of_vertices, PinchMergeScratch};

/// The result of attempting to pinch-merge a single piece pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MergeOutcome {
    /// The piece was merged into the graph.
    Merged,
    /// The merge was consistent with the graph's structure but not with adjacency-component
    /// proximity, and so was rejected rather than applied (`SPEC_FULL.md` 4.5.1). Not an error:
    /// callers are expected to see rejections routinely and tally them.
    Rejected {
        /// One of the two vertices whose adjacency components didn't permit the merge.
        vertex1: VertexId,
        /// The other.
        vertex2: VertexId,
    },
}

/// Tally returned by `pinch_merge` after walking a whole alignment.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MergeReport {
    /// Number of piece pairs successfully merged.
    pub applied: usize,
    /// Number of piece pairs rejected for adjacency-component proximity.
    pub rejected: usize,
}

fn direct_black_edge(graph: &PinchGraph, from: VertexId, to: VertexId) -> Option<crate::ids::BlockId> {
    graph.black_edges(from).find(|&id| graph.edge_to(id) == to)
}

/// Attempts to pinch two equal-length, 1-based pieces together.
///
/// Algorithm (`SPEC_FULL.md` 4.5):
/// 1. Build the vertex chain covering each piece, splitting edges as needed (this also takes care
///    of "prepare endpoints": `get_chain_of_vertices` always splits at `piece.start`/`piece.end`
///    first).
/// 2. If the two chains don't have matching internal breakpoints, split the other piece at every
///    breakpoint the first one has, and vice versa, then rebuild both chains. Repeat until they
///    agree structurally.
/// 3. Make sure every vertex in both chains has an adjacency-component label.
/// 4. Reject the whole merge if any paired-up vertex pair is inconsistent with adjacency-component
///    proximity.
/// 5. Merge each paired-up vertex that isn't already identical, unioning their component labels.
///    If a direct black edge of length > 1 would be destroyed by the merge, split it in the middle
///    first and restart the chain walk from the beginning.
pub fn pinch_merge_piece(
    graph: &mut PinchGraph,
    adjacency: &mut AdjacencyIndex,
    overlap_n: u32,
    p1: Piece,
    p2: Piece,
    scratch: &mut PinchMergeScratch,
) -> Result<MergeOutcome> {
    if p1.length() != p2.length() {
        return Err(precondition(
            "pinch_merge_piece",
            "pieces being merged must have equal length",
        ));
    }

    loop {
        get_chain_of_vertices(graph, p1, &mut scratch.chain1)?;
        get_chain_of_vertices(graph, p2, &mut scratch.chain2)?;
        if scratch.chain1.structurally_equal(&scratch.chain2) {
            break;
        }

        let breakpoints1 = scratch.chain1.clone();
        let breakpoints2 = scratch.chain2.clone();
        for (coord, side) in breakpoints1.coords.iter().zip(breakpoints1.sides.iter()) {
            graph.split_edge(p2.contig, p2.start + coord, *side)?;
        }
        for (coord, side) in breakpoints2.coords.iter().zip(breakpoints2.sides.iter()) {
            graph.split_edge(p1.contig, p1.start + coord, *side)?;
        }
    }

    let len = scratch.chain1.len();
    for i in 0..len {
        adjacency.label_for(graph, scratch.chain1.vertices[i])?;
        adjacency.label_for(graph, scratch.chain2.vertices[i])?;
    }

    for i in 0..len {
        let v1 = scratch.chain1.vertices[i];
        let v2 = scratch.chain2.vertices[i];
        if v1 == v2 {
            continue;
        }
        let l1 = adjacency.labels_of(v1).cloned().unwrap_or_default();
        let l2 = adjacency.labels_of(v2).cloned().unwrap_or_default();
        if !adjacency.overlaps(&l1, &l2, overlap_n) {
            trace!("pinch_merge_piece: rejecting {v1:?}/{v2:?}, not within {overlap_n} components");
            return Ok(MergeOutcome::Rejected { vertex1: v1, vertex2: v2 });
        }
    }

    let mut i = 0;
    while i < scratch.chain1.len() {
        let v1 = scratch.chain1.vertices[i];
        let v2 = scratch.chain2.vertices[i];
        if v1 == v2 {
            i += 1;
            continue;
        }

        // Dead-end and sink vertices are never destroyed (they are a contig's permanent termini,
        // or the one shared sink). Two such vertices landing on the same chain position are
        // adjacent, not identical: grey-connect them instead of merging.
        if graph.vertex_kind(v1) != crate::graph::VertexKind::Interior
            || graph.vertex_kind(v2) != crate::graph::VertexKind::Interior
        {
            graph.connect_vertices(v1, v2);
            i += 1;
            continue;
        }

        if let Some(edge) = direct_black_edge(graph, v1, v2) {
            let piece = graph.edge_piece(edge);
            if piece.length() > 1 {
                let boundary = piece.start + piece.length() / 2 - 1;
                graph.split_edge(piece.contig, boundary, Side::Right)?;
                get_chain_of_vertices(graph, p1, &mut scratch.chain1)?;
                get_chain_of_vertices(graph, p2, &mut scratch.chain2)?;
                i = 0;
                continue;
            }
        }

        let l1 = adjacency.labels_of(v1).cloned().unwrap_or_default();
        let l2 = adjacency.labels_of(v2).cloned().unwrap_or_default();
        let merged = graph.merge_vertices(v1, v2)?;
        adjacency.set_labels(merged, l1.union(&l2));
        for j in i..scratch.chain1.len() {
            if scratch.chain1.vertices[j] == v1 || scratch.chain1.vertices[j] == v2 {
                scratch.chain1.vertices[j] = merged;
            }
            if scratch.chain2.vertices[j] == v1 || scratch.chain2.vertices[j] == v2 {
                scratch.chain2.vertices[j] = merged;
            }
        }
        i += 1;
    }

    Ok(MergeOutcome::Merged)
}

fn oriented_piece(contig: Name, strand: bool, pos: i64, len: i64) -> Piece {
    if strand {
        Piece::new(contig, pos, pos + len - 1)
    } else {
        Piece::new(-contig, -pos, -pos + len - 1)
    }
}

/// Walks every MATCH operation of `alignment`, pinch-merging the aligned pieces in order, and
/// tallies how many merges were applied versus rejected for adjacency-proximity reasons.
pub fn pinch_merge(
    graph: &mut PinchGraph,
    adjacency: &mut AdjacencyIndex,
    overlap_n: u32,
    alignment: &PairwiseAlignment,
    scratch: &mut PinchMergeScratch,
) -> Result<MergeReport> {
    debug!(
        "pinch_merge: contig {} x contig {}, {} ops",
        alignment.contig1,
        alignment.contig2,
        alignment.operations.len()
    );
    let step1: i64 = if alignment.strand1 { 1 } else { -1 };
    let step2: i64 = if alignment.strand2 { 1 } else { -1 };
    let mut j = alignment.start1;
    let mut k = alignment.start2;
    let mut report = MergeReport::default();

    for op in &alignment.operations {
        match *op {
            Op::Match(len) => {
                let len = len as i64;
                let p1 = oriented_piece(alignment.contig1, alignment.strand1, j, len);
                let p2 = oriented_piece(alignment.contig2, alignment.strand2, k, len);
                match pinch_merge_piece(graph, adjacency, overlap_n, p1, p2, scratch)? {
                    MergeOutcome::Merged => report.applied += 1,
                    MergeOutcome::Rejected { .. } => report.rejected += 1,
                }
                j += step1 * len;
                k += step2 * len;
            }
            Op::InsertX(len) => k += step2 * len as i64,
            Op::InsertY(len) => j += step1 * len as i64,
        }
    }

    // `start`/`end` are half-open (`SPEC_FULL.md` 4.5), so a clean traversal lands `j`/`k`
    // exactly on `end1`/`end2`, not one step past them.
    if j != alignment.end1 || k != alignment.end2 {
        return Err(precondition(
            "pinch_merge",
            "alignment operations did not consume exactly the declared coordinate ranges",
        ));
    }
    debug!("pinch_merge: applied {} rejected {}", report.applied, report.rejected);
    Ok(report)
}
