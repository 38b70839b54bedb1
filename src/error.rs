//! Error taxonomy for the inference engine.
//!
//! Four families, per the specification's error-handling design: moves that
//! violate a support invariant ([`InvalidMoveError`]), invariant-check
//! failures ([`ConsistencyError`]), missing parent state discovered before
//! sampling ([`SafetyError`]), and calls to a method that is not meaningful
//! for a given variant ([`DepletedMethodError`]). All four are
//! `thiserror`-derived and carry a stable `code()` for callers that want to
//! match on error identity without matching the full variant shape, mirroring
//! the teacher crate's `ChutoroErrorCode`/`HnswErrorCode` convention.

use thiserror::Error;

/// Stable, machine-readable identifiers for [`InvalidMoveError`] variants.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[non_exhaustive]
pub enum InvalidMoveErrorCode {
    NegativeEdgeCount,
    NonexistentEdgeRemoval,
    OrphansParentLabel,
    UnsupportedBlockCount,
    UnsupportedLevel,
}

impl InvalidMoveErrorCode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NegativeEdgeCount => "INVALID_MOVE_NEGATIVE_EDGE_COUNT",
            Self::NonexistentEdgeRemoval => "INVALID_MOVE_NONEXISTENT_EDGE_REMOVAL",
            Self::OrphansParentLabel => "INVALID_MOVE_ORPHANS_PARENT_LABEL",
            Self::UnsupportedBlockCount => "INVALID_MOVE_UNSUPPORTED_BLOCK_COUNT",
            Self::UnsupportedLevel => "INVALID_MOVE_UNSUPPORTED_LEVEL",
        }
    }
}

/// A requested move would violate a support invariant of some node in the
/// prior tree. Ratio-computing methods never propagate this: they catch it
/// internally and return [`f64::NEG_INFINITY`] so the Metropolis rule
/// rejects the move naturally. Apply methods return it as an `Err`.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
#[non_exhaustive]
pub enum InvalidMoveError {
    #[error("resulting edge count {got} is negative")]
    NegativeEdgeCount { got: i64 },
    #[error("cannot remove {requested} parallel edges between {u} and {v}; only {available} present")]
    NonexistentEdgeRemoval {
        u: usize,
        v: usize,
        requested: u64,
        available: u64,
    },
    #[error("destroying label {label} at level {level} would orphan its parent at level {level} + 1")]
    OrphansParentLabel { label: usize, level: usize },
    #[error("block count {got} at level {level} is outside the prior's support")]
    UnsupportedBlockCount { level: usize, got: u64 },
    #[error("level {level} exceeds the current nesting depth {depth}")]
    UnsupportedLevel { level: usize, depth: usize },
}

impl InvalidMoveError {
    #[must_use]
    pub const fn code(&self) -> InvalidMoveErrorCode {
        match self {
            Self::NegativeEdgeCount { .. } => InvalidMoveErrorCode::NegativeEdgeCount,
            Self::NonexistentEdgeRemoval { .. } => InvalidMoveErrorCode::NonexistentEdgeRemoval,
            Self::OrphansParentLabel { .. } => InvalidMoveErrorCode::OrphansParentLabel,
            Self::UnsupportedBlockCount { .. } => InvalidMoveErrorCode::UnsupportedBlockCount,
            Self::UnsupportedLevel { .. } => InvalidMoveErrorCode::UnsupportedLevel,
        }
    }
}

/// An invariant check (`check_consistency`) failed. Always surfaced as an
/// `Err`; never swallowed the way [`InvalidMoveError`] is by ratio methods.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
#[non_exhaustive]
pub enum ConsistencyError {
    #[error("degree sequence sums to {actual}, expected {expected} (= 2 * edge count)")]
    DegreeSumMismatch { expected: u64, actual: u64 },
    #[error("label graph entry ({r}, {s}) is {recorded}, but the underlying graph has {recomputed}")]
    LabelGraphMismatch {
        r: usize,
        s: usize,
        recorded: u64,
        recomputed: u64,
    },
    #[error("nested level {level} block count {child} does not aggregate to {parent} parents")]
    NestedAggregationMismatch {
        level: usize,
        child: usize,
        parent: usize,
    },
    #[error("effective block count {effective} does not match reported block count {reported}")]
    BlockCountMismatch { effective: usize, reported: usize },
}

/// A node's required parent reference was missing or invalid when it was
/// used. Checked by `check_safety` before sampling.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
#[non_exhaustive]
pub enum SafetyError {
    #[error("{node} requires parent `{parent}`, which was not supplied")]
    MissingParent { node: &'static str, parent: &'static str },
    #[error("{node} field `{field}` has invalid value: {reason}")]
    InvalidField {
        node: &'static str,
        field: &'static str,
        reason: &'static str,
    },
}

/// A method was called on a variant for which it is not meaningful (e.g.
/// setting a single flat partition on a nested-only prior).
#[derive(Clone, Debug, Error, Eq, PartialEq)]
#[non_exhaustive]
pub enum DepletedMethodError {
    #[error("{type_name}::{method} is not supported by this variant")]
    NotSupported {
        type_name: &'static str,
        method: &'static str,
    },
}
