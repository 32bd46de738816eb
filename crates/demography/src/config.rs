//! Named limits and solver settings.
//!
//! The population cap and the children cap reflect what a typical
//! frequency-spectrum backend can handle; a backend with a different scale
//! can be paired with custom [`Limits`].

use serde::{Deserialize, Serialize};

/// Default maximum number of populations in the joint solver state.
pub const MAX_LIVE_POPULATIONS: usize = 5;

/// Default maximum number of structural children per node (binary split).
pub const MAX_CHILDREN: usize = 2;

/// Absolute tolerance for comparing event times.
pub const TIME_TOLERANCE: f64 = 1e-9;

/// Structural and scheduling limits enforced by a [`DemoGraph`](crate::graph::DemoGraph).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Limits {
    /// Maximum populations live at any scheduled time
    pub max_live_populations: usize,
    /// Maximum outgoing structural edges per node. Split events are binary,
    /// so scheduling fails when more than two children are needed.
    pub max_children: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_live_populations: MAX_LIVE_POPULATIONS,
            max_children: MAX_CHILDREN,
        }
    }
}

impl Limits {
    /// Create limits with a custom population cap.
    pub fn with_max_live_populations(mut self, max: usize) -> Self {
        self.max_live_populations = max;
        self
    }
}

/// Selection parameters handed to the solver.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverSettings {
    /// Scaled selection coefficient
    pub gamma: f64,
    /// Dominance coefficient
    pub h: f64,
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self { gamma: 0.0, h: 0.5 }
    }
}

impl SolverSettings {
    /// Neutral settings (`gamma = 0`, `h = 0.5`).
    pub fn neutral() -> Self {
        Self::default()
    }
}

/// `true` when two event times coincide within [`TIME_TOLERANCE`].
pub(crate) fn same_time(a: f64, b: f64) -> bool {
    (a - b).abs() <= TIME_TOLERANCE
}
