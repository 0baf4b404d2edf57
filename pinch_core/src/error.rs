// Copyright 2018-2019 Joe Neeman.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.
//
// See the LICENSE-APACHE or LICENSE-MIT files at the top-level directory
// of this distribution.

use crate::ids::{Name, VertexId};

/// Everything that can go wrong manipulating a [`crate::PinchGraph`].
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// One of the invariants in `SPEC_FULL.md` 4.2.2 (I1-I5) was about to be broken.
    #[error("invariant {invariant} violated by {operator} touching vertex {vertex:?}")]
    InvariantViolation {
        /// The invariant's name, e.g. `"I3"`.
        invariant: &'static str,
        /// The operation that attempted the offending change.
        operator: &'static str,
        /// The vertex the violation was detected at.
        vertex: VertexId,
    },
    /// A caller-supplied precondition didn't hold.
    #[error("precondition violated in {operator}: {detail}")]
    PreconditionViolation {
        /// The operation whose precondition failed.
        operator: &'static str,
        /// Human-readable detail of what was wrong.
        detail: String,
    },
    /// A computed statistic fell outside its expected `[0, 1]` range by more than tolerance.
    #[error("tree coverage {value} outside tolerance for vertex {vertex:?}")]
    NumericOutOfRange {
        /// The out-of-range value.
        value: f64,
        /// The vertex the statistic was computed for.
        vertex: VertexId,
    },
    /// The object store had no entry of the requested kind.
    #[error("object store has no {kind} for {name:?}")]
    ObjectStoreMiss {
        /// What was being looked up, e.g. `"sequence"`.
        kind: &'static str,
        /// The contig name that was looked up.
        name: Name,
    },
}

/// Shorthand for this crate's fallible return type.
pub type Result<T> = std::result::Result<T, Error>;

pub(crate) fn precondition(operator: &'static str, detail: impl Into<String>) -> Error {
    Error::PreconditionViolation {
        operator,
        detail: detail.into(),
    }
}

pub(crate) fn invariant(invariant: &'static str, operator: &'static str, vertex: VertexId) -> Error {
    Error::InvariantViolation {
        invariant,
        operator,
        vertex,
    }
}
