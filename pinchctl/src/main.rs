//! A minimal command-line driver that feeds pairwise alignments into `pinch_core`.
//!
//! This is a thin ingestion harness, not a full assembly pipeline: it reads three flat,
//! tab-separated files (sequences, event tree, pairwise alignments), runs them through
//! `pinch_core`'s public passes in the order a real caller would (stub-sink linking, then
//! pinch-merging, then over-alignment trimming), and dumps the resulting blocks.

use std::path::PathBuf;

use clap::Parser;
use flexi_logger::Logger;

mod ingest;

/// Feeds pairwise alignments into `pinch_core` and writes out the resulting pinch blocks.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Tab-separated `name, length, event, header` sequence records.
    #[arg(long)]
    sequences: PathBuf,

    /// Tab-separated `event, parent, branch_length` phylogeny ("-" marks the root's parent).
    #[arg(long)]
    tree: PathBuf,

    /// Tab-separated pairwise alignment records.
    #[arg(long)]
    alignments: PathBuf,

    /// Where to write the resulting block records.
    #[arg(long)]
    out: PathBuf,

    /// Minimum tree coverage a vertex's first non-stub edge may have before it is seeded for
    /// splitting anyway.
    #[arg(long, default_value_t = 0.9)]
    min_tree_coverage: f64,

    /// Maximum black degree a vertex may have before it is seeded for splitting.
    #[arg(long, default_value_t = 7)]
    max_degree: usize,

    /// How many grey-adjacency hops the trimmer's seed set is allowed to spread before splitting.
    #[arg(long, default_value_t = 0)]
    extension_steps: u32,

    /// Adjacency-component overlap tolerance passed to each pinch-merge.
    #[arg(long, default_value_t = 0)]
    adjacency_overlap: u32,

    /// Mark stub-linked dead ends as attached, so a later pass could unlink just those.
    #[arg(long, default_value_t = false)]
    attach_ends: bool,
}

fn main() {
    Logger::try_with_env_or_str("info")
        .unwrap_or_else(|e| panic!("logger configuration failed with {e}"))
        .start()
        .unwrap_or_else(|e| panic!("logger initialization failed with {e}"));

    let cli = Cli::parse();
    if let Err(e) = ingest::run(&cli) {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
