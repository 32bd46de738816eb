//! The validated, read-only demography.

use crate::config::{Limits, SolverSettings, TIME_TOLERANCE};
use crate::errors::{DemographyError, TopologyError};
use crate::graph::{Edge, GraphSpec, PopId, PopulationNode, PulseEvent, SplitWeight};
use crate::validate;
use std::collections::BTreeMap;
use std::path::Path;

/// A validated population graph.
///
/// Built once from a [`GraphSpec`] and never mutated afterwards, so a single
/// graph can serve any number of independent spectrum queries, including
/// queries running on different threads.
#[derive(Debug, Clone)]
pub struct DemoGraph {
    root: PopId,
    nodes: BTreeMap<PopId, PopulationNode>,
    /// Outgoing edges per node, ordered by child id
    children: BTreeMap<PopId, Vec<Edge>>,
    parents: BTreeMap<PopId, PopId>,
    /// Nodes ordered by start time, then depth, then id
    order: Vec<PopId>,
    leaves: Vec<PopId>,
    /// `(source, index)` of every pulse, in firing order
    pulse_order: Vec<(PopId, usize)>,
    present: f64,
    limits: Limits,
    settings: SolverSettings,
}

impl DemoGraph {
    /// Validate a description with the default [`Limits`].
    pub fn new(spec: GraphSpec) -> Result<Self, TopologyError> {
        Self::with_limits(spec, Limits::default())
    }

    /// Validate a description against custom limits.
    pub fn with_limits(spec: GraphSpec, limits: Limits) -> Result<Self, TopologyError> {
        validate::validate(&spec, limits)
    }

    /// Parse and validate a JSON description.
    pub fn from_json_str(json: &str) -> Result<Self, DemographyError> {
        let spec = GraphSpec::from_json(json)?;
        Ok(Self::new(spec)?)
    }

    /// Read, parse and validate a JSON description from disk.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, DemographyError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Replace the selection settings used by spectrum queries.
    pub fn with_settings(mut self, settings: SolverSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Assemble the derived indices. Callers must have validated the parts.
    pub(crate) fn from_parts(
        root: PopId,
        nodes: BTreeMap<PopId, PopulationNode>,
        edges: Vec<Edge>,
        limits: Limits,
    ) -> Self {
        let mut children: BTreeMap<PopId, Vec<Edge>> =
            nodes.keys().map(|id| (id.clone(), Vec::new())).collect();
        let mut parents = BTreeMap::new();
        for edge in edges {
            parents.insert(edge.child.clone(), edge.parent.clone());
            children.entry(edge.parent.clone()).or_default().push(edge);
        }
        for list in children.values_mut() {
            list.sort_by(|a, b| a.child.cmp(&b.child));
        }

        let depth = |id: &PopId| {
            let mut depth = 0usize;
            let mut current = id;
            while let Some(parent) = parents.get(current) {
                depth += 1;
                current = parent;
            }
            depth
        };
        let mut order: Vec<(f64, usize, PopId)> = nodes
            .iter()
            .map(|(id, node)| (node.start, depth(id), id.clone()))
            .collect();
        order.sort_by(|a, b| {
            a.0.total_cmp(&b.0)
                .then_with(|| a.1.cmp(&b.1))
                .then_with(|| a.2.cmp(&b.2))
        });
        let order: Vec<PopId> = order.into_iter().map(|(_, _, id)| id).collect();

        let leaves: Vec<PopId> = children
            .iter()
            .filter(|(_, edges)| edges.is_empty())
            .map(|(id, _)| id.clone())
            .collect();
        let present = leaves
            .iter()
            .map(|id| nodes[id].end())
            .fold(0.0, f64::max);

        Self {
            root,
            nodes,
            children,
            parents,
            order,
            leaves,
            pulse_order: Vec::new(),
            present,
            limits,
            settings: SolverSettings::default(),
        }
    }

    /// Fix the firing order of all pulses and record each pulse's rank.
    pub(crate) fn set_pulse_order(&mut self, order: Vec<(PopId, usize)>) {
        for (rank, (source, index)) in order.iter().enumerate() {
            if let Some(pulse) = self
                .nodes
                .get_mut(source)
                .and_then(|node| node.pulses.get_mut(*index))
            {
                pulse.rank = rank;
            }
        }
        self.pulse_order = order;
    }

    /// The single ancestral population.
    pub fn root(&self) -> &PopId {
        &self.root
    }

    pub fn node(&self, id: &str) -> Option<&PopulationNode> {
        self.nodes.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    /// All nodes, keyed by id.
    pub fn nodes(&self) -> &BTreeMap<PopId, PopulationNode> {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Outgoing edges of `id`, ordered by child id.
    pub fn child_edges(&self, id: &str) -> &[Edge] {
        self.children.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Child ids of `id`, ordered.
    pub fn children(&self, id: &str) -> impl Iterator<Item = &PopId> {
        self.child_edges(id).iter().map(|edge| &edge.child)
    }

    pub fn parent(&self, id: &str) -> Option<&PopId> {
        self.parents.get(id)
    }

    /// Split weight on the edge `parent -> child`, if the edge is weighted.
    pub fn split_weight(&self, parent: &str, child: &str) -> Option<SplitWeight> {
        self.child_edges(parent)
            .iter()
            .find(|edge| &*edge.child == child)
            .and_then(|edge| edge.weight)
    }

    /// Nodes ordered by start time; ancestors precede descendants that start
    /// at the same time, remaining ties are broken by id.
    pub fn order(&self) -> &[PopId] {
        &self.order
    }

    /// Every pulse in firing order, with its index among its source's pulses.
    ///
    /// Pulses fire by time. At one instant a pulse waits until its source and
    /// target exist and until the earlier pulses of its source have fired; a
    /// population created at that instant exists once its parent has fired
    /// its own pulses. Among the pulses free to fire, the lowest
    /// `(source, target)` goes first.
    pub fn pulses(&self) -> impl Iterator<Item = (usize, &PulseEvent)> {
        self.pulse_order.iter().filter_map(|(source, index)| {
            let pulse = self.nodes.get(source)?.pulses.get(*index)?;
            Some((*index, pulse))
        })
    }

    /// Nodes without children, ordered by id.
    pub fn leaves(&self) -> &[PopId] {
        &self.leaves
    }

    pub fn is_leaf(&self, id: &str) -> bool {
        self.child_edges(id).is_empty() && self.contains(id)
    }

    /// A leaf whose epoch ends before the present (an ancient sample).
    pub fn is_ancient(&self, id: &str) -> bool {
        self.is_leaf(id)
            && self
                .node(id)
                .is_some_and(|node| node.end() < self.present - TIME_TOLERANCE)
    }

    /// Time at which the latest leaf epoch ends.
    pub fn present(&self) -> f64 {
        self.present
    }

    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    pub fn settings(&self) -> &SolverSettings {
        &self.settings
    }
}
