#![deny(missing_docs)]

//! The pinch-graph rewriting core of a multiple-genome alignment engine.
//!
//! A pinch graph (`SPEC_FULL.md` section 4) is a bidirected multigraph recording how a set of
//! contigs align to each other: black edges are aligned segments, grey edges are the adjacencies
//! between consecutive segments of the same contig. Merging two segments ("pinching" them
//! together) is the graph-rewriting primitive the rest of the crate builds on — the adjacency
//! index, the over-alignment trimmer, the tree-coverage statistic, and the stub-sink linker are
//! all passes over the graph this module exposes.

#[macro_use]
extern crate log;

#[cfg(test)]
#[macro_use]
extern crate pretty_assertions;

mod adjacency;
mod error;
mod external;
mod graph;
mod ids;
mod merge;
mod piece;
mod serialize;
mod stub_sink;
#[cfg(test)]
mod testutil;
mod tree_coverage;
mod trim;
mod vertex_chain;

pub use crate::{
    adjacency::{AdjacencyIndex, ComponentGraph, ComponentLabels},
    error::{Error, Result},
    external::{subtree_branch_length, EventTree, ObjectStore, Op, PairwiseAlignment, Sequence},
    graph::{PinchGraph, VertexKind},
    ids::{BlockId, ComponentId, Name, Side, VertexId},
    merge::{pinch_merge, pinch_merge_piece, MergeOutcome, MergeReport},
    piece::Piece,
    serialize::{CactusReader, CactusWriter, Tag},
    stub_sink::{link_stub_components_to_sink, unlink_stub_components_from_sink, EndAttachment, LinkConfig},
    tree_coverage::{common_ancestor, tree_coverage},
    trim::{remove_over_aligned_edges, TrimConfig},
    vertex_chain::{get_chain_of_vertices, PinchMergeScratch, VertexChain},
};
