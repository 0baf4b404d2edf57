//! C4: the adjacency-component index (`SPEC_FULL.md` 4.4, 4.4.1).
//!
//! Adjacency components are connected components of the (symmetric) grey-edge relation. Because
//! grey edges are always inserted in both directions (I2), a strongly-connected-components pass
//! over that relation is exactly a connected-components pass, so this module reuses
//! `pinch_digraph`'s Tarjan implementation rather than reimplementing union-find-on-vertices; see
//! `graph/src/tarjan.rs` and `graph/src/partition.rs`. On top of that pass, a contig's two dead
//! ends are folded into one component whenever both are still bare stubs (grey degree 0): before
//! any adjacency is known, a sequence's own telomeres are the same unplaced scaffold, not two
//! unrelated ends, which is what lets `linkStubComponentsToSink`'s `2 * (componentCount - 1)`
//! count (`SPEC_FULL.md` 4.8) hold.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use pinch_digraph::Graph as DigraphGraph;

use crate::error::{precondition, Result};
use crate::graph::PinchGraph;
use crate::ids::{ComponentId, Name, VertexId};

/// A small, sorted, deduplicated set of component ids. A vertex can belong to more than one
/// component transiently, between a merge and the next relabelling pass.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ComponentLabels(Vec<ComponentId>);

impl ComponentLabels {
    /// A label set containing only `id`.
    pub fn singleton(id: ComponentId) -> ComponentLabels {
        ComponentLabels(vec![id])
    }

    /// The label set's members, sorted and deduplicated.
    pub fn as_slice(&self) -> &[ComponentId] {
        &self.0
    }

    /// The sorted, deduplicated union of two label sets.
    pub fn union(&self, other: &ComponentLabels) -> ComponentLabels {
        let mut merged: Vec<ComponentId> = self.0.iter().chain(other.0.iter()).copied().collect();
        merged.sort_unstable();
        merged.dedup();
        ComponentLabels(merged)
    }
}

/// The meta-graph over adjacency components, linking two components whenever some black edge in
/// the pinch graph bridges them. Built once per enumeration pass and treated as read-only while
/// merges proceed (per the source engine's `adjacencyComponentGraph`).
#[derive(Clone, Debug, Default)]
pub struct ComponentGraph {
    neighbors: BTreeMap<ComponentId, BTreeSet<ComponentId>>,
}

impl ComponentGraph {
    fn connect(&mut self, a: ComponentId, b: ComponentId) {
        if a != b {
            self.neighbors.entry(a).or_default().insert(b);
            self.neighbors.entry(b).or_default().insert(a);
        }
    }

    /// True if `a == b`, or there is a path of length at most `n` between them.
    pub fn within(&self, a: ComponentId, b: ComponentId, n: u32) -> bool {
        if a == b {
            return true;
        }
        let mut frontier = VecDeque::new();
        frontier.push_back((a, 0u32));
        let mut seen = BTreeSet::new();
        seen.insert(a);
        while let Some((cur, dist)) = frontier.pop_front() {
            if dist >= n {
                continue;
            }
            if let Some(neighbors) = self.neighbors.get(&cur) {
                for &next in neighbors {
                    if next == b {
                        return true;
                    }
                    if seen.insert(next) {
                        frontier.push_back((next, dist + 1));
                    }
                }
            }
        }
        false
    }
}

/// Per-vertex adjacency-component membership, plus the component meta-graph used for the
/// `componentsWithin` proximity query.
pub struct AdjacencyIndex {
    labels: BTreeMap<VertexId, ComponentLabels>,
    component_graph: ComponentGraph,
    next_component: ComponentId,
}

struct GreyView<'g, F> {
    graph: &'g PinchGraph,
    predicate: F,
}

impl<'g, 'a, F> DigraphGraph<'a> for GreyView<'g, F>
where
    'g: 'a,
    F: Fn(VertexId) -> bool + 'a,
{
    type Node = VertexId;
    type Edge = VertexId;
    type NodesIter = std::vec::IntoIter<VertexId>;
    type EdgesIter = std::vec::IntoIter<VertexId>;

    fn nodes(&'a self) -> Self::NodesIter {
        self.graph
            .vertices()
            .filter(|v| (self.predicate)(*v))
            .collect::<Vec<_>>()
            .into_iter()
    }

    fn out_edges(&'a self, u: &VertexId) -> Self::EdgesIter {
        self.graph
            .grey_edges(*u)
            .filter(|v| (self.predicate)(*v))
            .collect::<Vec<_>>()
            .into_iter()
    }

    fn in_edges(&'a self, u: &VertexId) -> Self::EdgesIter {
        self.out_edges(u)
    }
}

fn union_find_find(parent: &mut [usize], x: usize) -> usize {
    if parent[x] != x {
        parent[x] = union_find_find(parent, parent[x]);
    }
    parent[x]
}

fn union_find_union(parent: &mut [usize], a: usize, b: usize) {
    let (ra, rb) = (union_find_find(parent, a), union_find_find(parent, b));
    if ra != rb {
        parent[ra] = rb;
    }
}

impl AdjacencyIndex {
    /// Enumerates adjacency components over the vertices accepted by `predicate`, and builds the
    /// component meta-graph from every black edge whose two endpoints land in different
    /// components.
    ///
    /// A contig's two dead ends are folded into the same component when *both* are still bare
    /// stubs (grey degree 0): before any adjacency is known, a sequence's own telomeres are the
    /// same unplaced scaffold, so `linkStubComponentsToSink`'s `2 * (componentCount - 1)` count
    /// (`SPEC_FULL.md` 4.8) treats them as one unit rather than two unrelated singletons. A dead
    /// end that already carries a grey edge (pinched or previously linked) is left to plain
    /// grey-edge connectivity.
    pub fn build(graph: &PinchGraph, predicate: impl Fn(VertexId) -> bool) -> (AdjacencyIndex, usize) {
        let view = GreyView {
            graph,
            predicate: &predicate,
        };
        let sccs = view.tarjan();

        let mut label_of: BTreeMap<VertexId, usize> = BTreeMap::new();
        let mut parent: Vec<usize> = Vec::new();
        for (i, part) in sccs.parts().enumerate() {
            parent.push(i);
            for &v in part {
                label_of.insert(v, i);
            }
        }

        let mut by_contig: BTreeMap<Name, Vec<VertexId>> = BTreeMap::new();
        for v in graph.vertices() {
            if predicate(v) && graph.is_dead_end(v) && graph.grey_degree(v) == 0 {
                if let Some(contig) = graph.dead_end_contig(v) {
                    by_contig.entry(contig).or_default().push(v);
                }
            }
        }
        for ends in by_contig.into_values() {
            if ends.len() == 2 {
                let (a, b) = (ends[0], ends[1]);
                if let (Some(&la), Some(&lb)) = (label_of.get(&a), label_of.get(&b)) {
                    union_find_union(&mut parent, la, lb);
                }
            }
        }

        let mut renumber: BTreeMap<usize, ComponentId> = BTreeMap::new();
        let mut labels = BTreeMap::new();
        for (v, old_id) in label_of {
            let root = union_find_find(&mut parent, old_id);
            let next_id = renumber.len() as ComponentId;
            let id = *renumber.entry(root).or_insert(next_id);
            labels.insert(v, ComponentLabels::singleton(id));
        }
        let count = renumber.len();

        let mut component_graph = ComponentGraph::default();
        for v in graph.vertices() {
            let Some(v_label) = labels.get(&v) else { continue };
            for edge in graph.black_edges(v) {
                let to = graph.edge_to(edge);
                if let Some(to_label) = labels.get(&to) {
                    for &a in v_label.as_slice() {
                        for &b in to_label.as_slice() {
                            component_graph.connect(a, b);
                        }
                    }
                }
            }
        }

        (
            AdjacencyIndex {
                labels,
                component_graph,
                next_component: count as ComponentId,
            },
            count,
        )
    }

    /// The component meta-graph built by `build`.
    pub fn component_graph(&self) -> &ComponentGraph {
        &self.component_graph
    }

    /// `v`'s currently known label set, if any.
    pub fn labels_of(&self, v: VertexId) -> Option<&ComponentLabels> {
        self.labels.get(&v)
    }

    /// Overwrites `v`'s label set, e.g. after a merge has unioned two vertices' labels.
    pub fn set_labels(&mut self, v: VertexId, labels: ComponentLabels) {
        self.labels.insert(v, labels);
    }

    /// Returns the label set for `v`, walking its unique alternating grey-black trail to find an
    /// already-labelled vertex if `v` itself has none yet (`SPEC_FULL.md` 4.4). A vertex born with
    /// grey-degree 0 (freshly split, not yet wired into any adjacency) has no trail to walk;
    /// splitting an edge never changes adjacency structure, so such a vertex simply straddles
    /// whatever components already touch it through its black edges, and inherits their union. If
    /// none of its black neighbours are labelled yet either, it starts a fresh singleton.
    pub fn label_for(&mut self, graph: &PinchGraph, v: VertexId) -> Result<ComponentLabels> {
        if let Some(labels) = self.labels.get(&v) {
            return Ok(labels.clone());
        }
        if graph.grey_degree(v) == 0 {
            let mut inherited: Option<ComponentLabels> = None;
            for edge in graph.black_edges(v) {
                let neighbor = graph.edge_to(edge);
                if let Some(labels) = self.labels.get(&neighbor) {
                    inherited = Some(match inherited {
                        Some(acc) => acc.union(labels),
                        None => labels.clone(),
                    });
                }
            }
            let labels = inherited.unwrap_or_else(|| {
                let id = self.next_component;
                self.next_component += 1;
                ComponentLabels::singleton(id)
            });
            self.labels.insert(v, labels.clone());
            return Ok(labels);
        }

        let mut trail = vec![v];
        let mut cur = v;
        let found = loop {
            let mut grey = graph.grey_edges(cur);
            let next = grey.next().ok_or_else(|| {
                precondition("label_for", format!("vertex {cur:?} has no grey edge to walk"))
            })?;
            if grey.next().is_some() {
                return Err(precondition(
                    "label_for",
                    format!("vertex {cur:?} has grey degree != 1, cannot walk a unique trail"),
                ));
            }
            trail.push(next);
            if let Some(labels) = self.labels.get(&next) {
                break labels.clone();
            }

            let mut black = graph.black_edges(next);
            let edge = black.next().ok_or_else(|| {
                precondition("label_for", format!("vertex {next:?} has no black edge to walk"))
            })?;
            let to = graph.edge_to(edge);
            trail.push(to);
            if let Some(labels) = self.labels.get(&to) {
                break labels.clone();
            }
            cur = to;
        };

        for v in trail {
            self.labels.insert(v, found.clone());
        }
        Ok(found)
    }

    /// Two label sets overlap when any pair of their members is within `n` hops in the component
    /// graph.
    pub fn overlaps(&self, a: &ComponentLabels, b: &ComponentLabels, n: u32) -> bool {
        a.as_slice()
            .iter()
            .any(|&x| b.as_slice().iter().any(|&y| self.component_graph.within(x, y, n)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::Side;

    #[test]
    fn singleton_vertices_get_distinct_components() {
        let mut g = PinchGraph::new();
        let (l1, r1) = g.add_sequence(1, 10).unwrap();
        let (l2, _r2) = g.add_sequence(2, 10).unwrap();
        let (index, count) = AdjacencyIndex::build(&g, |_| true);
        // One component per contig (both of its still-bare dead ends fold together) plus the
        // isolated sink vertex.
        assert_eq!(count, 3);
        assert_eq!(index.labels_of(l1), index.labels_of(r1));
        assert_ne!(index.labels_of(l1), index.labels_of(l2));
    }

    #[test]
    fn grey_connected_vertices_share_a_component() {
        let mut g = PinchGraph::new();
        let (l1, _) = g.add_sequence(1, 10).unwrap();
        let (l2, _) = g.add_sequence(2, 10).unwrap();
        g.connect_vertices(l1, l2);
        let (index, _count) = AdjacencyIndex::build(&g, |_| true);
        assert_eq!(index.labels_of(l1), index.labels_of(l2));
    }

    #[test]
    fn component_graph_links_components_joined_by_a_black_edge() {
        let mut g = PinchGraph::new();
        g.add_sequence(1, 10).unwrap();
        let mid = g.split_edge(1, 5, Side::Right).unwrap();
        let (index, _count) = AdjacencyIndex::build(&g, |_| true);
        let labels = index.labels_of(mid).unwrap().clone();
        // mid's own component is trivially within 0 of itself.
        assert!(index.overlaps(&labels, &labels, 0));
    }

    #[test]
    fn label_for_inherits_its_black_neighbours_component() {
        let mut g = PinchGraph::new();
        let (l1, r1) = g.add_sequence(1, 10).unwrap();
        let (mut index, _count) = AdjacencyIndex::build(&g, |_| true);
        let l1_label = index.labels_of(l1).cloned().unwrap();
        assert_eq!(index.labels_of(r1).cloned().unwrap(), l1_label);

        // `isolate_black_edge` retargets one endpoint of the contig's sole black edge onto a
        // fresh vertex without touching any grey edges, so the new vertex postdates the
        // enumeration pass at grey degree 0: it inherits the label of the black neighbour
        // (`l1`) it is still attached to, rather than starting fresh or erroring.
        let edge = g.black_edges(l1).next().unwrap();
        let new_vertex = g.isolate_black_edge(r1, edge);
        assert!(index.labels_of(new_vertex).is_none());
        let labels = index.label_for(&g, new_vertex).unwrap();
        assert_eq!(labels, l1_label);
    }

    #[test]
    fn label_for_walks_unique_trail_to_a_labelled_vertex() {
        let mut g = PinchGraph::new();
        let (l1, r1) = g.add_sequence(1, 10).unwrap();
        let (l2, r2) = g.add_sequence(2, 10).unwrap();
        let (mut index, _count) = AdjacencyIndex::build(&g, |_| true);
        let l2_label = index.labels_of(l2).cloned().unwrap();

        // `a` and `b` both postdate the enumeration pass and, via `isolate_black_edge`, start at
        // grey degree 0 with one black neighbour apiece (`l1`, `l2`). Connecting them gives `a` a
        // unique grey hop to `b`, whose own black edge still points back at the already-labelled
        // `l2`, so walking from `a` should recover `l2`'s label for both of them.
        let edge1 = g.black_edges(l1).next().unwrap();
        let a = g.isolate_black_edge(r1, edge1);
        let edge2 = g.black_edges(l2).next().unwrap();
        let b = g.isolate_black_edge(r2, edge2);
        g.connect_vertices(a, b);

        assert!(index.labels_of(a).is_none());
        let found = index.label_for(&g, a).unwrap();
        assert_eq!(found, l2_label);
        assert_eq!(index.labels_of(b).cloned().unwrap(), l2_label);
    }
}
