//! # Demography
//!
//! Compiles a population-history graph into the ordered event list a
//! frequency-spectrum solver needs, and replays it against a pluggable
//! solver backend.
//!
//! A query goes through four stages:
//!
//! 1. [`validate`]: check the raw graph and build a read-only [`DemoGraph`]
//! 2. [`lineages`]: work out how many lineages each population must carry
//! 3. [`schedule`]: walk the graph forward in time and emit [`Event`]s
//! 4. [`solver`]: map each event onto a [`Solver`] primitive
//!
//! No numerical integrator ships with this crate; [`TraceSolver`] records
//! the calls a real backend would receive.

pub mod config;
pub mod errors;
pub mod graph;
pub mod lineages;
pub mod prelude;
pub mod query;
pub mod schedule;
pub mod solver;
pub mod validate;

pub use config::{Limits, SolverSettings, MAX_CHILDREN, MAX_LIVE_POPULATIONS, TIME_TOLERANCE};
pub use errors::{CapacityError, DemographyError, Result, SolverError, TopologyError};
pub use graph::{DemoGraph, GraphSpec, NodeSpec, PopId};
pub use lineages::{required_lineages, LineageRequirements, SampleSizes};
pub use query::SfsQuery;
pub use schedule::{Event, Schedule};
pub use solver::{Solver, SpectrumState, TraceSolver};
pub use validate::validate;
