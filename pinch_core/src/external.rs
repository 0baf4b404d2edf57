//! Upstream/downstream collaborator traits (`SPEC_FULL.md` section 6, 3.1).
//!
//! The object store and event tree are explicitly out of scope as concrete implementations; this
//! module models only the surface the core actually calls into, as two small traits. An in-memory
//! reference implementation of both lives in `testutil` for the core's own tests.

use crate::error::Result;
use crate::ids::Name;

/// A pairwise alignment operation, as produced by the (out-of-scope) aligner.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Op {
    /// `n` bases of the two contigs aligned one-to-one.
    Match(u64),
    /// `n` bases present only in the first contig.
    InsertX(u64),
    /// `n` bases present only in the second contig.
    InsertY(u64),
}

/// One pairwise alignment between two contigs, already resolved from header strings to `Name`s by
/// the caller (the string-to-`Name` lookup is the object store's job, and the object store itself
/// is out of scope).
#[derive(Clone, Debug)]
pub struct PairwiseAlignment {
    /// The first contig's name.
    pub contig1: Name,
    /// The second contig's name.
    pub contig2: Name,
    /// Start coordinate of the aligned range on the first contig.
    pub start1: i64,
    /// Half-open end coordinate of the aligned range on the first contig: one past the last
    /// aligned position in the walk direction (`strand1`).
    pub end1: i64,
    /// Start coordinate of the aligned range on the second contig.
    pub start2: i64,
    /// Half-open end coordinate of the aligned range on the second contig: one past the last
    /// aligned position in the walk direction (`strand2`).
    pub end2: i64,
    /// Strand of the first contig (`true` = forward).
    pub strand1: bool,
    /// Strand of the second contig (`true` = forward).
    pub strand2: bool,
    /// The alignment's edit script.
    pub operations: Vec<Op>,
}

/// A resolved sequence record, as returned by an `ObjectStore`.
#[derive(Clone, Debug)]
pub struct Sequence<Event> {
    /// The contig name this record describes.
    pub name: Name,
    /// The sequence's header/description string.
    pub header: String,
    /// Total length of the sequence, in bases.
    pub length: i64,
    /// The phylogenetic event the sequence was sampled from.
    pub event: Event,
}

/// The subset of the on-disk object store the core calls into: resolving a contig `Name` to its
/// sequence record (and, through it, the event it was sampled from).
pub trait ObjectStore {
    /// The event-tree node type this store's sequences are tagged with.
    type Event: Copy + Eq + std::hash::Hash + std::fmt::Debug;

    /// Looks up the sequence record for `name`.
    fn sequence(&self, name: Name) -> Result<Sequence<Self::Event>>;
}

/// The subset of the phylogenetic event tree the core calls into. Never mutated by the core.
pub trait EventTree {
    /// The tree's node type.
    type Event: Copy + Eq + std::hash::Hash + std::fmt::Debug;

    /// The tree's root event.
    fn root(&self) -> Self::Event;
    /// `event`'s parent, or `None` at the root.
    fn parent(&self, event: Self::Event) -> Option<Self::Event>;
    /// `event`'s direct children.
    fn children(&self, event: Self::Event) -> Vec<Self::Event>;
    /// Length of the branch leading to `event` from its parent.
    fn branch_length(&self, event: Self::Event) -> f64;
    /// Human-readable name for `event`.
    fn name(&self, event: Self::Event) -> String;
}

/// Total branch length of the subtree rooted at `event`, excluding `event`'s own branch.
/// Derivable purely from `children`/`branch_length`, so it is a free function rather than part of
/// the trait.
pub fn subtree_branch_length<T: EventTree + ?Sized>(tree: &T, event: T::Event) -> f64 {
    let mut total = 0.0;
    for child in tree.children(event) {
        total += tree.branch_length(child) + subtree_branch_length(tree, child);
    }
    total
}
