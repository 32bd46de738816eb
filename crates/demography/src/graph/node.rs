//! Validated population records.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Population identifier.
pub type PopId = Arc<str>;

/// Size trajectory over a population's epoch, relative to the reference size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SizeSpec {
    /// Constant size `nu`
    Constant { nu: f64 },
    /// Exponential change from `nu0` at the start of the epoch to `nu_f` at its end
    Exponential { nu0: f64, nu_f: f64 },
}

impl SizeSpec {
    /// Size at the start of the epoch.
    pub fn initial(&self) -> f64 {
        match *self {
            SizeSpec::Constant { nu } => nu,
            SizeSpec::Exponential { nu0, .. } => nu0,
        }
    }

    /// Size at the end of the epoch.
    pub fn final_size(&self) -> f64 {
        match *self {
            SizeSpec::Constant { nu } => nu,
            SizeSpec::Exponential { nu_f, .. } => nu_f,
        }
    }

    /// Size `elapsed` time units into an epoch of length `duration`.
    ///
    /// Exponential trajectories follow `nu0 * (nu_f / nu0)^(elapsed / duration)`.
    pub fn at(&self, elapsed: f64, duration: f64) -> f64 {
        match *self {
            SizeSpec::Constant { nu } => nu,
            SizeSpec::Exponential { nu0, nu_f } => {
                if duration <= 0.0 {
                    nu_f
                } else {
                    nu0 * (nu_f / nu0).powf(elapsed / duration)
                }
            }
        }
    }
}

/// Fraction of a parent's lineages routed to one child of a split.
///
/// Weights of sibling edges are independent and need not sum to one.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct SplitWeight(f64);

impl SplitWeight {
    /// Weights must lie strictly between 0 and 1.
    pub fn new(weight: f64) -> Option<Self> {
        (weight > 0.0 && weight < 1.0).then_some(Self(weight))
    }

    pub fn get(&self) -> f64 {
        self.0
    }
}

/// Fraction of a target population's ancestry replaced by a pulse.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct AdmixFraction(f64);

impl AdmixFraction {
    /// Fractions must lie in `[0, 1]`.
    pub fn new(fraction: f64) -> Option<Self> {
        (0.0..=1.0).contains(&fraction).then_some(Self(fraction))
    }

    pub fn get(&self) -> f64 {
        self.0
    }
}

/// Parent-to-child lineage relation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub parent: PopId,
    pub child: PopId,
    /// Present on the edges of a split, absent on plain continuations
    pub weight: Option<SplitWeight>,
}

/// Instantaneous one-way migration pulse from `source` into `target`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PulseEvent {
    pub source: PopId,
    pub target: PopId,
    /// Position along the source's epoch, in `[0, 1]`
    pub at: f64,
    /// Absolute time of the pulse
    pub time: f64,
    pub fraction: AdmixFraction,
    /// Position in the graph-wide firing order, see [`DemoGraph::pulses`](crate::graph::DemoGraph::pulses)
    pub rank: usize,
}

/// A population epoch with its demographic parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopulationNode {
    pub id: PopId,
    pub size: SizeSpec,
    /// Epoch length, in units of 2N_ref generations
    pub duration: f64,
    /// Absolute start time (the root starts at 0)
    pub start: f64,
    /// Migration rates into this population, keyed by source population
    pub migration: BTreeMap<PopId, f64>,
    /// Pulses sourced from this population, ordered by time then target
    pub pulses: Vec<PulseEvent>,
    /// Selfing rate in `[0, 1]`
    pub selfing: f64,
}

impl PopulationNode {
    /// Absolute end time of the epoch.
    pub fn end(&self) -> f64 {
        self.start + self.duration
    }

    /// Size at absolute time `time`, clamped to the epoch.
    pub fn size_at(&self, time: f64) -> f64 {
        let elapsed = (time - self.start).clamp(0.0, self.duration);
        self.size.at(elapsed, self.duration)
    }

    /// Migration rate into this population from `source` (0 when absent).
    pub fn migration_from(&self, source: &str) -> f64 {
        self.migration.get(source).copied().unwrap_or(0.0)
    }
}
