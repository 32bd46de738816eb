//! Error types for graph validation, scheduling and spectrum queries.
//!
//! Every failure is fatal to the query that raised it. Validation errors are
//! raised once, when a [`DemoGraph`](crate::graph::DemoGraph) is built;
//! everything else is raised by a query before (or, for solver failures,
//! while) the solver is driven.

use crate::graph::PopId;
use thiserror::Error;

/// Malformed graph structure or node attributes.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TopologyError {
    #[error("graph has no nodes")]
    Empty,

    #[error("node `{0}` is defined more than once")]
    DuplicateNode(PopId),

    #[error("edge {from} -> {to} references unknown node `{missing}`")]
    UnknownNode { from: PopId, to: PopId, missing: PopId },

    #[error("edge {from} -> {to} is defined more than once")]
    DuplicateEdge { from: PopId, to: PopId },

    #[error("graph has no root (every node has a parent)")]
    NoRoot,

    #[error("graph has multiple roots: {0:?}")]
    MultipleRoots(Vec<PopId>),

    #[error("node `{id}` has multiple parents {parents:?} (merges are not supported)")]
    MultipleParents { id: PopId, parents: Vec<PopId> },

    #[error("directed cycle through nodes {0:?}")]
    Cycle(Vec<PopId>),

    #[error("too many children: node `{id}` has {count} (limit {limit})")]
    TooManyChildren { id: PopId, count: usize, limit: usize },

    #[error("weighted edge {from} -> {to} is not part of a split")]
    LoneWeightedEdge { from: PopId, to: PopId },

    #[error("node `{0}` has no size attributes (needs `nu` or `nu0` + `nuF`)")]
    MissingSize(PopId),

    #[error("node `{0}` defines both `nu` and `nu0`/`nuF`")]
    AmbiguousSize(PopId),

    #[error("node `{id}`: invalid {name} = {value}")]
    InvalidParameter {
        id: PopId,
        name: &'static str,
        value: f64,
    },

    #[error("node `{id}`: epoch duration must be finite and non-negative (T = {value:?})")]
    InvalidDuration { id: PopId, value: Option<f64> },

    #[error("root `{id}` must have T = 0 (found {value})")]
    RootDuration { id: PopId, value: f64 },

    #[error("node `{id}`: {kind} references unknown node `{target}`")]
    UnknownReference {
        id: PopId,
        kind: &'static str,
        target: PopId,
    },

    #[error("node `{id}`: {kind} references itself")]
    SelfReference { id: PopId, kind: &'static str },

    #[error("node `{id}`: pulse into `{target}` has {name} = {value} outside [0, 1]")]
    PulseOutOfRange {
        id: PopId,
        target: PopId,
        name: &'static str,
        value: f64,
    },

    #[error("pulse {from} -> {target} at time {time} but `{target}` is not live then")]
    PulseTargetNotLive {
        from: PopId,
        target: PopId,
        time: f64,
    },
}

/// Too many populations live in the joint solver state at once.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{} live populations {populations:?} at time {time} exceed the limit of {limit}", populations.len())]
pub struct CapacityError {
    pub time: f64,
    pub populations: Vec<PopId>,
    pub limit: usize,
}

/// A failure reported by a solver backend.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("solver primitive `{primitive}` failed: {message}")]
pub struct SolverError {
    pub primitive: &'static str,
    pub message: String,
}

impl SolverError {
    pub fn new(primitive: &'static str, message: impl Into<String>) -> Self {
        Self {
            primitive,
            message: message.into(),
        }
    }
}

/// Errors returned by graph loading and spectrum queries.
#[derive(Debug, Error)]
pub enum DemographyError {
    #[error(transparent)]
    Topology(#[from] TopologyError),

    #[error(transparent)]
    Capacity(#[from] CapacityError),

    #[error("requested population `{0}` is not in the graph")]
    UnreachableLeaf(PopId),

    #[error("no populations requested")]
    EmptyRequest,

    #[error("invalid sample request for `{id}`: {reason}")]
    InvalidSample { id: PopId, reason: String },

    #[error("axis mismatch: expected {expected:?}, found {found:?}")]
    AxisMismatch {
        expected: Vec<PopId>,
        found: Vec<PopId>,
    },

    #[error("population `{id}` holds {available} lineages but {needed} are needed")]
    LineageShortfall {
        id: PopId,
        needed: usize,
        available: usize,
    },

    #[error(transparent)]
    Solver(#[from] SolverError),

    #[error("failed to parse graph description: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for query-level operations.
pub type Result<T, E = DemographyError> = std::result::Result<T, E>;
