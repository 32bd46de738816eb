//! Lineage requirements.
//!
//! Works backwards from the requested leaf sample sizes to the number of
//! lineages every population must carry so that all later splits and pulses
//! can be served:
//!
//! - a requested leaf needs its sample size, an unrequested leaf needs nothing
//! - a node needs the sum of what its children need at their start
//! - each pulse out of a node additionally needs as many lineages as the
//!   target holds at the moment of the pulse
//!
//! Pulses are counted in the graph's firing order ([`DemoGraph::pulses`]).

use crate::errors::{DemographyError, Result};
use crate::graph::{DemoGraph, PopId, PulseEvent};
use crate::schedule::Demand;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use tracing::trace;

/// Requested sample size per leaf population.
pub type SampleSizes = BTreeMap<PopId, usize>;

/// Lineage counts derived from one sample request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineageRequirements {
    requested: SampleSizes,
    /// Per node: lineages held before each of its pulses, then after the last
    held: BTreeMap<PopId, Vec<usize>>,
    /// Per node: lineages drawn by each of its pulses
    drawn: BTreeMap<PopId, Vec<usize>>,
}

/// Compute lineage requirements for `requested` over `graph`.
///
/// Fails with [`DemographyError::UnreachableLeaf`] for ids absent from the
/// graph; requests naming internal nodes or asking for zero lineages are
/// rejected as invalid samples.
pub fn required_lineages(graph: &DemoGraph, requested: &SampleSizes) -> Result<LineageRequirements> {
    if requested.is_empty() {
        return Err(DemographyError::EmptyRequest);
    }
    for (id, &size) in requested {
        if !graph.contains(id) {
            return Err(DemographyError::UnreachableLeaf(id.clone()));
        }
        if !graph.is_leaf(id) {
            return Err(DemographyError::InvalidSample {
                id: id.clone(),
                reason: "only leaf populations can be sampled".to_string(),
            });
        }
        if size == 0 {
            return Err(DemographyError::InvalidSample {
                id: id.clone(),
                reason: "sample size must be positive".to_string(),
            });
        }
    }

    let mut tracker = Tracker {
        graph,
        requested,
        base: HashMap::new(),
        held: HashMap::new(),
    };

    let mut held = BTreeMap::new();
    let mut drawn = BTreeMap::new();
    for (id, node) in graph.nodes() {
        let counts: Vec<usize> = (0..=node.pulses.len())
            .map(|index| tracker.held(id, index))
            .collect();
        let draws: Vec<usize> = counts.windows(2).map(|pair| pair[0] - pair[1]).collect();
        trace!(population = %id, ?counts, "lineage requirement");
        held.insert(id.clone(), counts);
        drawn.insert(id.clone(), draws);
    }

    Ok(LineageRequirements {
        requested: requested.clone(),
        held,
        drawn,
    })
}

impl LineageRequirements {
    /// Lineages needed at the start of `id`'s epoch (0 for unknown ids).
    pub fn get(&self, id: &str) -> usize {
        self.held
            .get(id)
            .and_then(|counts| counts.first())
            .copied()
            .unwrap_or(0)
    }

    /// Lineages left once all of `id`'s pulses have been applied.
    pub fn at_end(&self, id: &str) -> usize {
        self.held
            .get(id)
            .and_then(|counts| counts.last())
            .copied()
            .unwrap_or(0)
    }

    /// Lineages held by `id` just before its pulse `index`.
    pub fn before_pulse(&self, id: &str, index: usize) -> usize {
        self.held
            .get(id)
            .and_then(|counts| counts.get(index))
            .copied()
            .unwrap_or(0)
    }

    /// Lineages drawn from `id` by its pulse `index`, equal to what the
    /// target holds at that moment.
    pub fn drawn_by_pulse(&self, id: &str, index: usize) -> usize {
        self.drawn
            .get(id)
            .and_then(|draws| draws.get(index))
            .copied()
            .unwrap_or(0)
    }

    /// The sample request these requirements were derived from.
    pub fn requested(&self) -> &SampleSizes {
        &self.requested
    }

    /// Start-of-epoch requirement for every node.
    pub fn iter(&self) -> impl Iterator<Item = (&PopId, usize)> {
        self.held
            .iter()
            .map(|(id, counts)| (id, counts.first().copied().unwrap_or(0)))
    }
}

impl Demand for LineageRequirements {
    fn needs(&self, id: &str) -> bool {
        self.get(id) > 0
    }

    fn needs_pulse(&self, source: &str, index: usize) -> bool {
        self.drawn_by_pulse(source, index) > 0
    }

    fn needs_after_pulse(&self, source: &str, index: usize) -> bool {
        self.before_pulse(source, index + 1) > 0
    }
}

struct Tracker<'a> {
    graph: &'a DemoGraph,
    requested: &'a SampleSizes,
    base: HashMap<PopId, usize>,
    held: HashMap<(PopId, usize), usize>,
}

impl Tracker<'_> {
    /// Lineages `id` must still hold after all of its own pulses.
    fn base(&mut self, id: &PopId) -> usize {
        if let Some(&count) = self.base.get(id) {
            return count;
        }
        let graph = self.graph;
        let count = if graph.is_leaf(id) {
            self.requested.get(id).copied().unwrap_or(0)
        } else {
            graph
                .children(id)
                .map(|child| self.held(child, 0))
                .sum()
        };
        self.base.insert(id.clone(), count);
        count
    }

    /// Lineages `id` holds before its pulse `from` (or after all pulses when
    /// `from` equals the pulse count).
    fn held(&mut self, id: &PopId, from: usize) -> usize {
        let key = (id.clone(), from);
        if let Some(&count) = self.held.get(&key) {
            return count;
        }
        let graph = self.graph;
        let pulses = graph
            .node(id)
            .map(|node| node.pulses.as_slice())
            .unwrap_or(&[]);
        let mut count = self.base(id);
        for pulse in pulses.iter().skip(from) {
            count += self.held_by_target(pulse);
        }
        self.held.insert(key, count);
        count
    }

    /// What the target of `pulse` holds at the moment the pulse fires.
    fn held_by_target(&mut self, pulse: &PulseEvent) -> usize {
        let graph = self.graph;
        let target_pulses = graph
            .node(&pulse.target)
            .map(|node| node.pulses.as_slice())
            .unwrap_or(&[]);
        let pending = target_pulses.partition_point(|later| !fires_after(later, pulse));
        self.held(&pulse.target, pending)
    }
}

/// Whether `a` fires strictly after `b` in schedule order.
fn fires_after(a: &PulseEvent, b: &PulseEvent) -> bool {
    a.rank > b.rank
}
