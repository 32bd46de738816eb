//! Frequency-spectrum solver boundary.
//!
//! The numerical integrator lives behind the [`Solver`] trait. A backend only
//! has to provide the primitives below; everything about which primitive to
//! call, with which lineage counts and on which axis, is decided by the
//! [`SolverAdapter`].
//!
//! Axes are positional. After every primitive the adapter checks that the
//! backend's [`SpectrumState::pop_ids`] still matches its own axis map.

pub mod adapter;
pub mod trace;

pub use adapter::SolverAdapter;
pub use trace::{Call, TraceSolver, TraceState};

use crate::errors::SolverError;
use crate::graph::PopId;
use crate::schedule::SizeFunction;

/// A joint frequency spectrum with labelled axes.
pub trait SpectrumState {
    /// Population label of every axis, in axis order.
    fn pop_ids(&self) -> &[PopId];

    /// Rename the population on `axis`.
    fn relabel(&mut self, axis: usize, id: PopId);
}

/// Parameters for the root equilibrium spectrum.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EquilibriumParams {
    pub theta: f64,
    /// Root population size relative to the reference size
    pub nu: f64,
    pub gamma: f64,
    pub h: f64,
}

/// One joint integration step, borrowed from a scheduled event.
#[derive(Debug, Clone, Copy)]
pub struct IntegrationStep<'a> {
    pub duration: f64,
    pub sizes: &'a [SizeFunction],
    /// `migration[i][j]`: rate into axis `i` from axis `j`
    pub migration: &'a [Vec<f64>],
    pub frozen: &'a [bool],
    pub selfing: &'a [f64],
    pub theta: f64,
    pub gamma: f64,
    pub h: f64,
}

/// Primitive operations of a frequency-spectrum backend.
///
/// Every primitive consumes the current state and returns the updated one.
pub trait Solver {
    type State: SpectrumState;

    /// Equilibrium spectrum of one population carrying `lineages` lineages.
    fn equilibrium(
        &self,
        lineages: usize,
        params: &EquilibriumParams,
        id: &PopId,
    ) -> Result<Self::State, SolverError>;

    /// Integrate all axes jointly over one step.
    fn integrate(
        &self,
        state: Self::State,
        step: &IntegrationStep<'_>,
    ) -> Result<Self::State, SolverError>;

    /// Split `axis` into two populations with `lineages.0` and `lineages.1`
    /// lineages. The first takes over `axis`, the second is appended.
    fn split(
        &self,
        state: Self::State,
        axis: usize,
        lineages: (usize, usize),
        ids: (&PopId, &PopId),
    ) -> Result<Self::State, SolverError>;

    /// Replace `fraction` of `target`'s ancestry with lineages drawn from
    /// `source`, leaving `keep_source` lineages on the source axis. The
    /// target keeps its lineage count.
    fn admix(
        &self,
        state: Self::State,
        source: usize,
        target: usize,
        fraction: f64,
        keep_source: usize,
    ) -> Result<Self::State, SolverError>;

    /// Sum out `axis`.
    fn marginalize(&self, state: Self::State, axis: usize) -> Result<Self::State, SolverError>;

    /// Permute axes so that new axis `i` is old axis `order[i]`.
    fn reorder(&self, state: Self::State, order: &[usize]) -> Result<Self::State, SolverError>;
}
