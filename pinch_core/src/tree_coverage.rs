//! C7: tree coverage (`SPEC_FULL.md` 4.7).

use std::collections::HashSet;

use log::warn;

use crate::error::{precondition, Error, Result};
use crate::external::{subtree_branch_length, EventTree, ObjectStore};
use crate::graph::PinchGraph;
use crate::ids::VertexId;

/// Grounded verbatim on `cactusEventTree.c`'s `eventTree_getCommonAncestor`: a two-phase walk that
/// needs nothing but `parent`, not precomputed depths.
pub fn common_ancestor<T: EventTree + ?Sized>(tree: &T, e1: T::Event, e2: T::Event) -> T::Event {
    let mut visited = Vec::new();
    let mut cur = e1;
    loop {
        visited.push(cur);
        if cur == e2 {
            return e2;
        }
        match tree.parent(cur) {
            Some(p) => cur = p,
            None => break,
        }
    }

    let mut cur = e2;
    loop {
        if visited.contains(&cur) {
            return cur;
        }
        match tree.parent(cur) {
            Some(p) => cur = p,
            None => return cur,
        }
    }
}

/// Fraction of the event tree's total branch length separating the events of `v`'s incident
/// (non-stub) black edges, normalised against the tree's overall depth.
pub fn tree_coverage<S, T>(graph: &PinchGraph, v: VertexId, store: &S, tree: &T) -> Result<f64>
where
    S: ObjectStore,
    T: EventTree<Event = S::Event>,
{
    let events: Vec<T::Event> = graph
        .black_edges(v)
        .filter(|&id| !graph.is_stub(id))
        .map(|id| {
            let piece = graph.edge_piece(id);
            store.sequence(piece.contig.abs()).map(|s| s.event)
        })
        .collect::<Result<Vec<_>>>()?;

    if events.is_empty() {
        return Err(precondition(
            "tree_coverage",
            format!("vertex {v:?} has no non-stub black edges"),
        ));
    }

    let ancestor = events
        .iter()
        .skip(1)
        .fold(events[0], |acc, &e| common_ancestor(tree, acc, e));

    let mut total = 0.0;
    let mut seen = HashSet::new();
    for &e in &events {
        let mut cur = e;
        while cur != ancestor {
            if seen.insert(cur) {
                total += tree.branch_length(cur);
            }
            match tree.parent(cur) {
                Some(p) => cur = p,
                None => break,
            }
        }
    }

    let root = tree.root();
    let denom = match tree.children(root).into_iter().next() {
        Some(first_child) => subtree_branch_length(tree, first_child),
        None => 0.0,
    };
    if denom == 0.0 {
        return Ok(0.0);
    }

    let raw = total / denom;
    if !(-1e-3..=1.0 + 1e-3).contains(&raw) {
        warn!("tree_coverage: vertex {v:?} produced {raw} outside tolerance, failing");
        return Err(Error::NumericOutOfRange { value: raw, vertex: v });
    }
    Ok(raw.clamp(0.0, 1.0))
}
