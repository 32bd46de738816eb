//! Commonly used imports for convenience.
//!
//! # Example
//!
//! ```
//! use demography::prelude::*;
//!
//! let graph = DemoGraph::new(
//!     GraphSpec::new().add_node(NodeSpec::constant("root", 1.0, 0.0)),
//! )
//! .unwrap();
//! let samples: SampleSizes = [(PopId::from("root"), 10)].into_iter().collect();
//! let state = graph.sfs(&TraceSolver, &samples, 1.0, &["root"]).unwrap();
//! assert_eq!(state.lineages, vec![10]);
//! ```

pub use crate::config::{Limits, SolverSettings};
pub use crate::errors::{self, DemographyError, Result, TopologyError};
pub use crate::graph::{DemoGraph, GraphSpec, NodeSpec, PopId};
pub use crate::lineages::{LineageRequirements, SampleSizes};
pub use crate::query::SfsQuery;
pub use crate::schedule::{Event, Schedule};
pub use crate::solver::{Solver, SpectrumState, TraceSolver};
