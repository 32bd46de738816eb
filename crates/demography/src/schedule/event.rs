//! Scheduled events.

use crate::graph::{AdmixFraction, PopId, SizeSpec};
use serde::Serialize;

/// Size trajectory of one population over one integration step.
///
/// `at(t)` evaluates the population's epoch trajectory `offset + t` time
/// units after the epoch started.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SizeFunction {
    pub spec: SizeSpec,
    /// Length of the population's whole epoch
    pub epoch: f64,
    /// Time already elapsed in the epoch when the step begins
    pub offset: f64,
}

impl SizeFunction {
    /// Size `t` time units into the step.
    pub fn at(&self, t: f64) -> f64 {
        let elapsed = (self.offset + t).clamp(0.0, self.epoch);
        self.spec.at(elapsed, self.epoch)
    }

    /// `true` when the size does not change over the step.
    pub fn is_constant(&self) -> bool {
        match self.spec {
            SizeSpec::Constant { .. } => true,
            SizeSpec::Exponential { nu0, nu_f } => nu0 == nu_f,
        }
    }
}

/// One joint integration step over every live population.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Integration {
    /// Absolute time at which the step begins
    pub start: f64,
    pub duration: f64,
    /// Live populations in axis order
    pub populations: Vec<PopId>,
    pub sizes: Vec<SizeFunction>,
    /// `migration[i][j]`: rate into population `i` from population `j`
    pub migration: Vec<Vec<f64>>,
    pub frozen: Vec<bool>,
    pub selfing: Vec<f64>,
}

impl Integration {
    /// `true` when no migration happens during the step.
    pub fn is_isolated(&self) -> bool {
        self.migration.iter().flatten().all(|&rate| rate == 0.0)
    }

    /// Sizes of all populations `t` time units into the step.
    pub fn sizes_at(&self, t: f64) -> Vec<f64> {
        self.sizes.iter().map(|size| size.at(t)).collect()
    }
}

/// One entry of the linear event list.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    /// Equilibrium spectrum of the root population
    Equilibrium { population: PopId, nu: f64 },
    Integrate(Integration),
    /// `child_a` takes over the parent's axis, `child_b` is appended last
    Split {
        parent: PopId,
        child_a: PopId,
        child_b: PopId,
    },
    /// The axis continues under a new population
    Relabel { from: PopId, to: PopId },
    PulseAdmix {
        source: PopId,
        target: PopId,
        fraction: AdmixFraction,
    },
    Marginalize { population: PopId },
    Reorder { order: Vec<PopId> },
}

impl Event {
    /// Short name of the event kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Event::Equilibrium { .. } => "equilibrium",
            Event::Integrate(_) => "integrate",
            Event::Split { .. } => "split",
            Event::Relabel { .. } => "relabel",
            Event::PulseAdmix { .. } => "pulse_admix",
            Event::Marginalize { .. } => "marginalize",
            Event::Reorder { .. } => "reorder",
        }
    }
}
