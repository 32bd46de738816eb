//! Serialized graph description.
//!
//! A [`GraphSpec`] is the raw, unvalidated input: node attribute records and
//! an edge list. It mirrors the attribute names used by demographic model
//! descriptions (`nu`, `nu0`, `nuF`, `T`, `m`, `pulse`) and can be read from
//! JSON or assembled with the builder methods.
//!
//! # Example
//!
//! ```
//! use demography::graph::{GraphSpec, NodeSpec};
//!
//! let spec = GraphSpec::new()
//!     .add_node(NodeSpec::constant("root", 1.0, 0.0))
//!     .add_node(NodeSpec::constant("A", 2.0, 0.5))
//!     .add_node(NodeSpec::constant("YRI", 1.0, 0.1).with_migration("CEU", 2.0))
//!     .add_node(NodeSpec::exponential("CEU", 0.5, 3.0, 0.1).with_migration("YRI", 2.0))
//!     .add_edge("root", "A")
//!     .add_edge("A", "YRI")
//!     .add_edge("A", "CEU");
//! assert_eq!(spec.nodes.len(), 4);
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Raw graph description.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphSpec {
    pub nodes: Vec<NodeSpec>,
    #[serde(default)]
    pub edges: Vec<EdgeSpec>,
}

impl GraphSpec {
    /// Create an empty description.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(mut self, node: NodeSpec) -> Self {
        self.nodes.push(node);
        self
    }

    /// Add an unweighted (continuation or split) edge.
    pub fn add_edge(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.edges.push(EdgeSpec {
            from: from.into(),
            to: to.into(),
            weight: None,
        });
        self
    }

    /// Add a split edge carrying a split weight.
    pub fn add_weighted_edge(
        mut self,
        from: impl Into<String>,
        to: impl Into<String>,
        weight: f64,
    ) -> Self {
        self.edges.push(EdgeSpec {
            from: from.into(),
            to: to.into(),
            weight: Some(weight),
        });
        self
    }

    /// Parse a description from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serialize the description as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Raw node attributes.
///
/// Exactly one of `nu` or the `nu0`/`nuF` pair must be set, and `T` is
/// required; both are checked during validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSpec {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nu: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nu0: Option<f64>,
    #[serde(default, rename = "nuF", alias = "nu_f", skip_serializing_if = "Option::is_none")]
    pub nu_f: Option<f64>,
    #[serde(default, rename = "T", skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(default, rename = "m", skip_serializing_if = "BTreeMap::is_empty")]
    pub migration: BTreeMap<String, f64>,
    #[serde(default, rename = "pulse", skip_serializing_if = "Vec::is_empty")]
    pub pulses: Vec<PulseSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selfing: Option<f64>,
}

impl NodeSpec {
    /// A node with no attributes set.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            nu: None,
            nu0: None,
            nu_f: None,
            duration: None,
            migration: BTreeMap::new(),
            pulses: Vec::new(),
            selfing: None,
        }
    }

    /// Constant-size epoch.
    pub fn constant(id: impl Into<String>, nu: f64, duration: f64) -> Self {
        Self {
            nu: Some(nu),
            duration: Some(duration),
            ..Self::new(id)
        }
    }

    /// Exponential size change from `nu0` to `nu_f` over the epoch.
    pub fn exponential(id: impl Into<String>, nu0: f64, nu_f: f64, duration: f64) -> Self {
        Self {
            nu0: Some(nu0),
            nu_f: Some(nu_f),
            duration: Some(duration),
            ..Self::new(id)
        }
    }

    /// Migration into this population from `source` at `rate`.
    pub fn with_migration(mut self, source: impl Into<String>, rate: f64) -> Self {
        self.migration.insert(source.into(), rate);
        self
    }

    /// Pulse into `target` at position `at` along this epoch, replacing
    /// `fraction` of the target's ancestry.
    pub fn with_pulse(mut self, target: impl Into<String>, at: f64, fraction: f64) -> Self {
        self.pulses.push(PulseSpec {
            target: target.into(),
            at,
            fraction,
        });
        self
    }

    pub fn with_selfing(mut self, rate: f64) -> Self {
        self.selfing = Some(rate);
        self
    }
}

/// Raw pulse annotation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PulseSpec {
    pub target: String,
    /// Position along the source's epoch, in `[0, 1]`
    pub at: f64,
    /// Admixture fraction, in `[0, 1]`
    pub fraction: f64,
}

/// Raw edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeSpec {
    pub from: String,
    pub to: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
}
