//! C8: the stub-sink linker (`SPEC_FULL.md` 4.8).

use std::collections::BTreeMap;

use log::debug;

use crate::adjacency::AdjacencyIndex;
use crate::graph::PinchGraph;
use crate::ids::{ComponentId, Name, VertexId};

/// AC3 configuration for the linker. The flower/End data model itself is out of scope for this
/// crate (see [`EndAttachment`] for the minimal stand-in this module needs).
#[derive(Clone, Copy, Debug, Default)]
pub struct LinkConfig {
    attach_ends: bool,
}

impl LinkConfig {
    /// Whether linked dead ends should be marked attached in the caller's [`EndAttachment`].
    pub fn with_attach_ends(mut self, value: bool) -> LinkConfig {
        self.attach_ends = value;
        self
    }
}

/// Minimal stand-in for the cactus `Cap`/`End` "attached" flag (glossary: "free vs attached
/// flags control whether a stub may be pinned to the sink"). The full Flower/End model is out of
/// scope; this just remembers which dead ends `link_stub_components_to_sink` has pinned, so
/// `unlink_stub_components_from_sink` can tell a caller-attached end apart from one it pinned
/// itself.
#[derive(Default, Debug)]
pub struct EndAttachment {
    attached: std::collections::BTreeSet<VertexId>,
}

impl EndAttachment {
    /// Marks `v` as pinned to the sink.
    pub fn mark_attached(&mut self, v: VertexId) {
        self.attached.insert(v);
    }

    /// Marks `v` as free to be unlinked again.
    pub fn mark_free(&mut self, v: VertexId) {
        self.attached.remove(&v);
    }

    /// True if `v` is currently marked attached.
    pub fn is_attached(&self, v: VertexId) -> bool {
        self.attached.contains(&v)
    }
}

/// Grey-connects the dead ends of every adjacency component other than the sink's own to the
/// sink vertex, one sequence's worth of dead ends per component: the longest sequence among
/// those whose cap terminates in that component. Returns the freshly built `AdjacencyIndex` (the
/// caller's next pass can reuse it) and the number of dead ends newly connected to the sink.
pub fn link_stub_components_to_sink(
    graph: &mut PinchGraph,
    config: &LinkConfig,
    mut attachment: Option<&mut EndAttachment>,
) -> (AdjacencyIndex, usize) {
    let (index, count) = AdjacencyIndex::build(graph, |_| true);
    let sink_labels = index.labels_of(VertexId::SINK).cloned().unwrap_or_default();

    let mut by_component: BTreeMap<ComponentId, Vec<VertexId>> = BTreeMap::new();
    for v in graph.vertices().collect::<Vec<_>>() {
        if !graph.is_dead_end(v) {
            continue;
        }
        let Some(labels) = index.labels_of(v) else {
            continue;
        };
        if labels.as_slice().iter().any(|c| sink_labels.as_slice().contains(c)) {
            continue;
        }
        let key = labels.as_slice()[0];
        by_component.entry(key).or_default().push(v);
    }

    let mut linked = 0;
    for (_component, dead_ends) in by_component {
        let Some(longest_contig) = longest_sequence(graph, &dead_ends) else {
            continue;
        };
        for v in dead_ends {
            if graph.dead_end_contig(v) == Some(longest_contig) {
                graph.connect_vertices(v, VertexId::SINK);
                if config.attach_ends {
                    if let Some(a) = attachment.as_mut() {
                        a.mark_attached(v);
                    }
                }
                linked += 1;
            }
        }
    }
    debug!("link_stub_components_to_sink: {count} components, {linked} dead ends linked");
    (index, linked)
}

fn longest_sequence(graph: &PinchGraph, dead_ends: &[VertexId]) -> Option<Name> {
    let mut best: Option<(Name, i64)> = None;
    for &v in dead_ends {
        let contig = graph.dead_end_contig(v)?;
        let len = graph.contig_length(contig).unwrap_or(0);
        if best.map_or(true, |(_, best_len)| len > best_len) {
            best = Some((contig, len));
        }
    }
    best.map(|(contig, _)| contig)
}

/// Inverse of [`link_stub_components_to_sink`]: disconnects every dead end from the sink whose
/// end is free (not in `attachment`) and whose only grey edge is to the sink.
pub fn unlink_stub_components_from_sink(graph: &mut PinchGraph, attachment: &EndAttachment) -> usize {
    let mut unlinked = 0;
    for v in graph.vertices().collect::<Vec<_>>() {
        if !graph.is_dead_end(v) || attachment.is_attached(v) {
            continue;
        }
        let mut grey = graph.grey_edges(v);
        let Some(only) = grey.next() else { continue };
        if grey.next().is_some() || only != VertexId::SINK {
            continue;
        }
        graph.disconnect_vertices(v, VertexId::SINK);
        unlinked += 1;
    }
    debug!("unlink_stub_components_from_sink: {unlinked} dead ends unlinked");
    unlinked
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn links_the_longest_sequence_of_each_unconnected_component() {
        let mut g = PinchGraph::new();
        let (l1, _r1) = g.add_sequence(1, 20).unwrap();
        let (l2, _r2) = g.add_sequence(2, 10).unwrap();
        // Each contig is its own adjacency component (its two still-bare dead ends fold
        // together), and within each component the lone contig present is trivially the
        // longest, so both of its dead ends get linked.
        let config = LinkConfig::default();
        let (_index, linked) = link_stub_components_to_sink(&mut g, &config, None);
        assert_eq!(linked, 4); // both dead ends of both contigs
        assert_eq!(g.grey_degree(l1), 1);
        assert_eq!(g.grey_edges(l1).next(), Some(VertexId::SINK));
        assert_eq!(g.grey_degree(l2), 1);
    }

    #[test]
    fn does_not_relink_dead_ends_already_in_the_sinks_component() {
        let mut g = PinchGraph::new();
        let (l1, _r1) = g.add_sequence(1, 10).unwrap();
        g.connect_vertices(l1, VertexId::SINK);
        let config = LinkConfig::default();
        let (_index, linked) = link_stub_components_to_sink(&mut g, &config, None);
        // l1 is already in the sink's component; only the remaining dead end (_r1) is new.
        assert_eq!(linked, 1);
        assert_eq!(g.grey_degree(l1), 1);
    }

    #[test]
    fn attach_ends_records_linked_dead_ends_and_unlink_reverses_unattached_ones() {
        let mut g = PinchGraph::new();
        let (l1, r1) = g.add_sequence(1, 10).unwrap();
        let mut attachment = EndAttachment::default();
        let config = LinkConfig::default().with_attach_ends(true);
        link_stub_components_to_sink(&mut g, &config, Some(&mut attachment));
        assert!(attachment.is_attached(l1));
        assert!(attachment.is_attached(r1));

        // Nothing unlinks: both ends are marked attached.
        let unlinked = unlink_stub_components_from_sink(&mut g, &attachment);
        assert_eq!(unlinked, 0);

        attachment.mark_free(l1);
        let unlinked = unlink_stub_components_from_sink(&mut g, &attachment);
        assert_eq!(unlinked, 1);
        assert_eq!(g.grey_degree(l1), 0);
        assert_eq!(g.grey_degree(r1), 1);
    }
}
