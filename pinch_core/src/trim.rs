//! C6: the over-alignment trimmer (`SPEC_FULL.md` 4.6).

use std::collections::{BTreeMap, BTreeSet};

use log::{debug, trace};

use crate::error::Result;
use crate::external::{EventTree, ObjectStore};
use crate::graph::PinchGraph;
use crate::ids::VertexId;
use crate::tree_coverage::tree_coverage;

/// Thresholds governing which blocks count as over-aligned and how far the seed set is allowed
/// to spread before splitting (`SPEC_FULL.md` 4.6, AC3).
#[derive(Clone, Copy, Debug)]
pub struct TrimConfig {
    min_tree_coverage: f64,
    max_degree: usize,
    extension_steps: u32,
}

impl Default for TrimConfig {
    fn default() -> TrimConfig {
        TrimConfig {
            min_tree_coverage: 0.9,
            max_degree: 7,
            extension_steps: 0,
        }
    }
}

impl TrimConfig {
    /// Minimum tree coverage a vertex's first non-stub edge may have before it's seeded anyway.
    pub fn with_min_tree_coverage(mut self, value: f64) -> TrimConfig {
        self.min_tree_coverage = value;
        self
    }

    /// Maximum black degree a vertex may have before it's seeded for splitting.
    pub fn with_max_degree(mut self, value: usize) -> TrimConfig {
        self.max_degree = value;
        self
    }

    /// How many grey-adjacency hops the seed set is allowed to spread before splitting.
    pub fn with_extension_steps(mut self, value: u32) -> TrimConfig {
        self.extension_steps = value;
        self
    }
}

/// Runs one pass of the trimmer: seeds from over-aligned blocks plus `extra_seeds`, extends
/// through grey-adjacent blocks within `config.extension_steps`, then splits every vertex in
/// the resulting set whose black degree is still `> 1`. Returns the number of vertices split.
pub fn remove_over_aligned_edges<S, T>(
    graph: &mut PinchGraph,
    store: &S,
    tree: &T,
    config: &TrimConfig,
    extra_seeds: impl IntoIterator<Item = VertexId>,
) -> Result<usize>
where
    S: ObjectStore,
    T: EventTree<Event = S::Event>,
{
    let mut distance = seed(graph, store, tree, config)?;
    for v in extra_seeds {
        if graph.is_dead_end(v) || graph.is_sink(v) {
            continue;
        }
        distance.entry(v).or_insert(0);
    }

    extend(graph, &mut distance, config.extension_steps);

    let to_split: Vec<VertexId> = distance
        .keys()
        .copied()
        .filter(|&v| graph.black_degree(v) > 1)
        .collect();
    debug!(
        "remove_over_aligned_edges: {} seeded/extended vertices, {} survive the degree filter",
        distance.len(),
        to_split.len()
    );

    let mut split_count = 0;
    for v in to_split {
        if graph.black_degree(v) <= 1 {
            // A prior split in this same pass may have already pulled v's edges away.
            continue;
        }
        let new_vertices = split_multiple_black_edges(graph, v);
        remove_trivial_grey_edge_components(graph, &new_vertices);
        split_count += 1;
    }
    Ok(split_count)
}

fn seed<S, T>(
    graph: &PinchGraph,
    store: &S,
    tree: &T,
    config: &TrimConfig,
) -> Result<BTreeMap<VertexId, u32>>
where
    S: ObjectStore,
    T: EventTree<Event = S::Event>,
{
    let mut distance = BTreeMap::new();
    for v in graph.vertices() {
        if graph.is_dead_end(v) || graph.is_sink(v) {
            continue;
        }
        let Some(edge) = graph.black_edges(v).next() else {
            continue;
        };
        if graph.is_stub(edge) {
            continue;
        }

        let over_degree = graph.black_degree(v) > config.max_degree;
        if !over_degree && tree_coverage(graph, v, store, tree)? >= config.min_tree_coverage {
            continue;
        }

        let from = graph.edge_from(edge);
        let to = graph.edge_to(edge);
        distance.entry(from).or_insert(0u32);
        distance.entry(to).or_insert(0u32);
    }
    Ok(distance)
}

/// Propagates distances outward along grey-adjacent, non-stub blocks until a fixed point (or a
/// 10-iteration cool-down expires without change), per `SPEC_FULL.md` 4.6 step 3.
fn extend(graph: &PinchGraph, distance: &mut BTreeMap<VertexId, u32>, extension_steps: u32) {
    let mut cooldown = 10;
    loop {
        let mut changed = false;
        let frontier: Vec<(VertexId, u32)> = distance.iter().map(|(&v, &d)| (v, d)).collect();
        for (v, d) in frontier {
            if d >= extension_steps {
                continue;
            }
            for neighbor in graph.grey_edges(v).collect::<Vec<_>>() {
                let Some(edge) = graph.black_edges(neighbor).next() else {
                    continue;
                };
                if graph.is_stub(edge) {
                    continue;
                }
                let block_len = graph.edge_piece(edge).length() as u32;
                let from = graph.edge_from(edge);
                let to = graph.edge_to(edge);
                let (near, far) = if from == neighbor { (from, to) } else { (to, from) };
                let far_dist = d + block_len;

                changed |= relax(distance, near, d);
                changed |= relax(distance, far, far_dist);
            }
        }

        if changed {
            cooldown = 10;
        } else {
            cooldown -= 1;
            if cooldown == 0 {
                break;
            }
        }
    }
}

/// Inserts `d` for `v` if absent, or lowers its stored distance if `d` is smaller. Returns
/// whether the map changed.
fn relax(distance: &mut BTreeMap<VertexId, u32>, v: VertexId, d: u32) -> bool {
    match distance.get(&v).copied() {
        None => {
            distance.insert(v, d);
            true
        }
        Some(existing) if d < existing => {
            distance.insert(v, d);
            true
        }
        Some(_) => false,
    }
}

/// `splitMultipleBlackEdges(u)`: detaches every black edge incident to `u` onto its own fresh
/// vertex, reconnects each fresh vertex to the grey neighbours of the edge's far endpoint, then
/// destroys `u`. Returns the fresh vertices, for `removeTrivialGreyEdgeComponents` to inspect.
fn split_multiple_black_edges(graph: &mut PinchGraph, u: VertexId) -> Vec<VertexId> {
    let edges: Vec<_> = graph.black_edges(u).collect();
    let mut new_vertices = Vec::with_capacity(edges.len());
    for edge in edges {
        let far = if graph.edge_from(edge) == u {
            graph.edge_to(edge)
        } else {
            graph.edge_from(edge)
        };
        let far_neighbors: Vec<VertexId> = graph.grey_edges(far).collect();
        let fresh = graph.isolate_black_edge(u, edge);
        for n in far_neighbors {
            graph.connect_vertices(fresh, n);
        }
        new_vertices.push(fresh);
    }
    graph.destroy_vertex(u);
    trace!("split_multiple_black_edges: {u:?} -> {new_vertices:?}");
    new_vertices
}

/// `removeTrivialGreyEdgeComponents`: among `candidates`, finds mutually grey-adjacent pairs
/// that are each a grey-degree-1, black-degree-1, non-stub singleton, concatenates their black
/// edges back into one, and destroys both.
fn remove_trivial_grey_edge_components(graph: &mut PinchGraph, candidates: &[VertexId]) {
    let mut remaining: BTreeSet<VertexId> = candidates.iter().copied().collect();
    for &a in candidates {
        if !remaining.contains(&a) {
            continue;
        }
        if graph.grey_degree(a) != 1 || graph.black_degree(a) != 1 {
            continue;
        }
        let b = match graph.grey_edges(a).next() {
            Some(b) if remaining.contains(&b) && b != a => b,
            _ => continue,
        };
        if graph.grey_degree(b) != 1 || graph.black_degree(b) != 1 {
            continue;
        }

        if graph.concat_black_edges(a, b).is_some() {
            graph.disconnect_vertices(a, b);
            graph.destroy_vertex(a);
            graph.destroy_vertex(b);
            remaining.remove(&a);
            remaining.remove(&b);
            trace!("remove_trivial_grey_edge_components: merged {a:?}, {b:?}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::{Name, Side};
    use crate::testutil::{Event, TestStore, TestTree};
    use std::collections::HashMap;

    /// Root with four direct children, each one branch-length unit out. Mirrors the degenerate
    /// star topology these tests need: every non-root event is equally "far" from the root.
    fn flat_tree() -> TestTree {
        let root = Event(0);
        let mut tree = TestTree::new(root);
        for c in 1..=4 {
            tree.add_child(root, Event(c), 1.0);
        }
        tree
    }

    fn distinct_event_per_contig(n: i64) -> TestStore {
        let mut map = HashMap::new();
        for c in 1..=n {
            map.insert(c, Event(c as u32));
        }
        TestStore(map)
    }

    /// A 20-base contig split at 5, 10 and 15. The position-10 vertex sits strictly between two
    /// other interior vertices, so its one black edge (the grey-linked pair vertex across the
    /// split carries the other half) is non-stub.
    fn interior_vertex(g: &mut PinchGraph, contig: Name) -> VertexId {
        g.add_sequence(contig, 20).unwrap();
        g.split_edge(contig, 5, Side::Right).unwrap();
        let middle = g.split_edge(contig, 10, Side::Right).unwrap();
        g.split_edge(contig, 15, Side::Right).unwrap();
        middle
    }

    #[test]
    fn seeds_a_vertex_whose_black_degree_exceeds_max_degree() {
        let mut g = PinchGraph::new();
        let mut vertices = Vec::new();
        for c in 1..=4 {
            vertices.push(interior_vertex(&mut g, c));
        }
        let mut merged = vertices[0];
        for &other in &vertices[1..] {
            merged = g.merge_vertices(merged, other).unwrap();
        }
        // One non-stub edge per contig, none touching a dead end.
        assert_eq!(g.black_degree(merged), 4);
        assert!(g.black_edges(merged).all(|id| !g.is_stub(id)));

        let store = distinct_event_per_contig(4);
        let tree = flat_tree();
        let config = TrimConfig::default().with_max_degree(3).with_min_tree_coverage(0.0);
        let split_count =
            remove_over_aligned_edges(&mut g, &store, &tree, &config, std::iter::empty()).unwrap();
        assert_eq!(split_count, 1);
        assert_eq!(g.black_degree(merged), 0);
    }

    #[test]
    fn a_vertex_below_the_degree_threshold_is_left_alone() {
        let mut g = PinchGraph::new();
        let middle = interior_vertex(&mut g, 1);
        let store = distinct_event_per_contig(1);
        let tree = flat_tree();
        let config = TrimConfig::default().with_max_degree(7).with_min_tree_coverage(0.0);
        let split_count =
            remove_over_aligned_edges(&mut g, &store, &tree, &config, std::iter::empty()).unwrap();
        assert_eq!(split_count, 0);
        assert_eq!(g.black_degree(middle), 1);
    }

    #[test]
    fn explicit_extra_seeds_are_split_even_without_triggering_thresholds() {
        let mut g = PinchGraph::new();
        let mut vertices = Vec::new();
        for c in 1..=3 {
            vertices.push(interior_vertex(&mut g, c));
        }
        let mut merged = vertices[0];
        for &other in &vertices[1..] {
            merged = g.merge_vertices(merged, other).unwrap();
        }
        assert_eq!(g.black_degree(merged), 3);

        let store = distinct_event_per_contig(3);
        let tree = flat_tree();
        // Thresholds generous enough that nothing would seed on its own.
        let config = TrimConfig::default().with_max_degree(100).with_min_tree_coverage(0.0);
        let split_count =
            remove_over_aligned_edges(&mut g, &store, &tree, &config, [merged]).unwrap();
        assert_eq!(split_count, 1);
        assert_eq!(g.black_degree(merged), 0);
    }

    #[test]
    fn concat_black_edges_glues_two_isolated_singletons_back_together() {
        let mut g = PinchGraph::new();
        let m1 = interior_vertex(&mut g, 1);
        let edge = g.black_edges(m1).next().unwrap();
        let a = g.isolate_black_edge(m1, edge);
        // a now holds one non-stub edge on its own, pointing at whichever of contig 1's split
        // vertices `edge` used to lead to.
        assert_eq!(g.black_degree(a), 1);
        assert!(!g.is_stub(g.black_edges(a).next().unwrap()));

        let m2 = interior_vertex(&mut g, 2);
        let edge2 = g.black_edges(m2).next().unwrap();
        let b = g.isolate_black_edge(m2, edge2);

        g.connect_vertices(a, b);
        // a and b each hold pieces of different contigs, so they can never be contiguous.
        assert!(g.concat_black_edges(a, b).is_none());
    }
}
