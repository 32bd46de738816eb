//! Event scheduling.
//!
//! Walks a [`DemoGraph`](crate::graph::DemoGraph) forward in time and emits
//! the flat event list a solver backend replays: equilibrium, joint
//! integrations, splits, relabels, pulses, marginalizations and a final
//! reorder.

pub mod event;
pub mod scheduler;

pub use event::{Event, Integration, SizeFunction};
pub use scheduler::Schedule;

/// Which populations and pulses a schedule has to keep.
///
/// Implemented by [`LineageRequirements`](crate::lineages::LineageRequirements)
/// for sample-driven pruning and by [`KeepAll`] for the unpruned schedule.
pub trait Demand {
    /// Whether `id` must be present at the start of its epoch.
    fn needs(&self, id: &str) -> bool;

    /// Whether pulse `index` of `source` has to be applied.
    fn needs_pulse(&self, source: &str, index: usize) -> bool;

    /// Whether `source` is still needed once its pulse `index` is applied.
    fn needs_after_pulse(&self, source: &str, index: usize) -> bool;
}

/// Keeps every population and every pulse.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeepAll;

impl Demand for KeepAll {
    fn needs(&self, _id: &str) -> bool {
        true
    }

    fn needs_pulse(&self, _source: &str, _index: usize) -> bool {
        true
    }

    fn needs_after_pulse(&self, _source: &str, _index: usize) -> bool {
        true
    }
}
