//! Parses the flat text input files and drives a `pinch_core` pipeline end to end.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use log::{debug, info};

use pinch_core::{
    link_stub_components_to_sink, pinch_merge, remove_over_aligned_edges, CactusWriter, EventTree,
    LinkConfig, Name, ObjectStore, Op, PairwiseAlignment, PinchGraph, PinchMergeScratch, Sequence,
    TrimConfig,
};

use crate::Cli;

/// An in-memory event, identified by the small integer ids this CLI's tree file assigns.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Event(u32);

/// A phylogeny loaded from a flat `event<TAB>parent<TAB>branch_length` file.
///
/// This is the concrete, file-backed counterpart to `pinch_core`'s `EventTree` trait; the trait
/// itself stays collaborator-only inside the core (`SPEC_FULL.md` section 6).
pub struct FileEventTree {
    root: Event,
    parents: HashMap<Event, Event>,
    lengths: HashMap<Event, f64>,
    names: HashMap<Event, String>,
    children: HashMap<Event, Vec<Event>>,
}

impl EventTree for FileEventTree {
    type Event = Event;

    fn root(&self) -> Event {
        self.root
    }

    fn parent(&self, event: Event) -> Option<Event> {
        self.parents.get(&event).copied()
    }

    fn children(&self, event: Event) -> Vec<Event> {
        self.children.get(&event).cloned().unwrap_or_default()
    }

    fn branch_length(&self, event: Event) -> f64 {
        self.lengths.get(&event).copied().unwrap_or(0.0)
    }

    fn name(&self, event: Event) -> String {
        self.names
            .get(&event)
            .cloned()
            .unwrap_or_else(|| format!("event{}", event.0))
    }
}

/// Sequence records loaded from a flat `name<TAB>length<TAB>event<TAB>header` file.
pub struct FileObjectStore {
    sequences: HashMap<Name, Sequence<Event>>,
}

impl ObjectStore for FileObjectStore {
    type Event = Event;

    fn sequence(&self, name: Name) -> pinch_core::Result<Sequence<Event>> {
        self.sequences
            .get(&name)
            .cloned()
            .ok_or(pinch_core::Error::ObjectStoreMiss { kind: "sequence", name })
    }
}

fn parse_tree(path: &Path) -> Result<FileEventTree> {
    let text = fs::read_to_string(path).with_context(|| format!("reading tree file {}", path.display()))?;
    let mut parents = HashMap::new();
    let mut lengths = HashMap::new();
    let mut names = HashMap::new();
    let mut children: HashMap<Event, Vec<Event>> = HashMap::new();
    let mut root = None;

    for (lineno, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() != 3 {
            bail!("tree file line {}: expected 3 tab-separated fields", lineno + 1);
        }
        let (event_str, parent_str, branch_str) = (fields[0], fields[1], fields[2]);
        let event = Event(event_str.parse().with_context(|| format!("tree file line {}", lineno + 1))?);
        names.insert(event, format!("event{}", event.0));

        if parent_str == "-" {
            root = Some(event);
            continue;
        }
        let parent = Event(parent_str.parse().with_context(|| format!("tree file line {}", lineno + 1))?);
        let branch_length: f64 = branch_str.parse().with_context(|| format!("tree file line {}", lineno + 1))?;
        parents.insert(event, parent);
        lengths.insert(event, branch_length);
        children.entry(parent).or_default().push(event);
    }

    let root = root.context("tree file must mark exactly one event's parent as \"-\"")?;
    Ok(FileEventTree { root, parents, lengths, names, children })
}

fn parse_sequences(path: &Path, graph: &mut PinchGraph) -> Result<FileObjectStore> {
    let text = fs::read_to_string(path).with_context(|| format!("reading sequences file {}", path.display()))?;
    let mut sequences = HashMap::new();

    for (lineno, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() != 4 {
            bail!("sequences file line {}: expected 4 tab-separated fields", lineno + 1);
        }
        let (name_str, length_str, event_str, header) = (fields[0], fields[1], fields[2], fields[3]);
        let name: Name = name_str.parse().with_context(|| format!("sequences file line {}", lineno + 1))?;
        let length: i64 = length_str.parse().with_context(|| format!("sequences file line {}", lineno + 1))?;
        let event = Event(event_str.parse().with_context(|| format!("sequences file line {}", lineno + 1))?);

        graph.add_sequence(name, length)?;
        sequences.insert(
            name,
            Sequence { name, header: header.to_owned(), length, event },
        );
    }

    Ok(FileObjectStore { sequences })
}

fn parse_ops(field: &str) -> Result<Vec<Op>> {
    field
        .split(',')
        .map(|token| {
            let (kind, len) = token.split_at(1);
            let len: u64 = len.parse().with_context(|| format!("bad op length in {token:?}"))?;
            Ok(match kind {
                "M" => Op::Match(len),
                "X" => Op::InsertX(len),
                "Y" => Op::InsertY(len),
                _ => bail!("unrecognised op kind {kind:?} in {token:?}"),
            })
        })
        .collect()
}

fn parse_alignments(path: &Path) -> Result<Vec<PairwiseAlignment>> {
    let text = fs::read_to_string(path).with_context(|| format!("reading alignments file {}", path.display()))?;
    let mut out = Vec::new();

    for (lineno, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() != 9 {
            bail!("alignments file line {}: expected 9 tab-separated fields", lineno + 1);
        }
        let (c1, c2, s1, e1, s2, e2, strand1, strand2, ops) = (
            fields[0], fields[1], fields[2], fields[3], fields[4], fields[5], fields[6],
            fields[7], fields[8],
        );
        let ctx = || format!("alignments file line {}", lineno + 1);
        out.push(PairwiseAlignment {
            contig1: c1.parse().with_context(ctx)?,
            contig2: c2.parse().with_context(ctx)?,
            start1: s1.parse().with_context(ctx)?,
            end1: e1.parse().with_context(ctx)?,
            start2: s2.parse().with_context(ctx)?,
            end2: e2.parse().with_context(ctx)?,
            strand1: strand1 == "+",
            strand2: strand2 == "+",
            operations: parse_ops(ops)?,
        });
    }

    Ok(out)
}

/// Runs the full pipeline described by `cli`: load sequences and alignments, link free stubs to
/// the sink, pinch-merge every alignment, trim over-aligned blocks, and dump the resulting blocks.
pub fn run(cli: &Cli) -> Result<()> {
    let mut graph = PinchGraph::new();
    let store = parse_sequences(&cli.sequences, &mut graph)?;
    let tree = parse_tree(&cli.tree)?;
    let alignments = parse_alignments(&cli.alignments)?;
    info!("ingest: {} sequences, {} alignments loaded", store.sequences.len(), alignments.len());

    let link_config = LinkConfig::default().with_attach_ends(cli.attach_ends);
    let (mut adjacency, linked) = link_stub_components_to_sink(&mut graph, &link_config, None);
    debug!("ingest: linked {linked} free stubs to the sink");

    let mut scratch = PinchMergeScratch::new();
    let mut applied = 0;
    let mut rejected = 0;
    for alignment in &alignments {
        let report = pinch_merge(&mut graph, &mut adjacency, cli.adjacency_overlap, alignment, &mut scratch)?;
        applied += report.applied;
        rejected += report.rejected;
    }
    info!("ingest: {applied} pieces merged, {rejected} rejected");

    let trim_config = TrimConfig::default()
        .with_min_tree_coverage(cli.min_tree_coverage)
        .with_max_degree(cli.max_degree)
        .with_extension_steps(cli.extension_steps);
    let split = remove_over_aligned_edges(&mut graph, &store, &tree, &trim_config, std::iter::empty())?;
    info!("ingest: trimmer split {split} over-aligned vertices");

    write_blocks(&graph, &cli.out)?;
    Ok(())
}

fn write_blocks(graph: &PinchGraph, out: &Path) -> Result<()> {
    let file = fs::File::create(out).with_context(|| format!("creating output file {}", out.display()))?;
    let mut writer = CactusWriter::new(std::io::BufWriter::new(file));

    let mut seen = std::collections::BTreeSet::new();
    let mut written = 0;
    for v in graph.vertices() {
        for edge in graph.black_edges(v) {
            if !seen.insert(edge.canonical()) {
                continue;
            }
            let piece = graph.edge_piece(edge);
            writer.write_tag(pinch_core::Tag::Segment)?;
            writer.write_name(piece.contig)?;
            writer.write_i64(piece.start)?;
            writer.write_i64(piece.end)?;
            written += 1;
        }
    }
    info!("ingest: wrote {written} blocks to {}", out.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    fn write_fixture(dir: &Path, name: &str, contents: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        let mut f = fs::File::create(&path).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn parses_a_minimal_tree_file() {
        let dir = std::env::temp_dir();
        let path = write_fixture(&dir, "pinchctl_test_tree.tsv", "0\t-\t0\n1\t0\t2.5\n");
        let tree = parse_tree(&path).unwrap();
        assert_eq!(tree.root(), Event(0));
        assert_eq!(tree.parent(Event(1)), Some(Event(0)));
        assert_eq!(tree.branch_length(Event(1)), 2.5);
        assert_eq!(tree.children(Event(0)), vec![Event(1)]);
    }

    #[test]
    fn parses_ops_field() {
        let ops = parse_ops("M4,X2,Y1").unwrap();
        assert_eq!(ops, vec![Op::Match(4), Op::InsertX(2), Op::InsertY(1)]);
    }

    #[test]
    fn parses_sequences_and_registers_them_in_the_graph() {
        let dir = std::env::temp_dir();
        let path = write_fixture(&dir, "pinchctl_test_seqs.tsv", "1\t10\t0\tcontig one\n");
        let mut graph = PinchGraph::new();
        let store = parse_sequences(&path, &mut graph).unwrap();
        assert_eq!(graph.contig_length(1), Some(10));
        assert_eq!(store.sequence(1).unwrap().header, "contig one");
    }
}
