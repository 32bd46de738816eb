//! Graph model: raw descriptions and the validated demography.
//!
//! - `GraphSpec`: serialized input (node attributes plus an edge list).
//! - `PopulationNode`, `Edge`, `PulseEvent`: typed, validated records.
//! - `DemoGraph`: the read-only aggregate every query runs against.

pub mod demograph;
pub mod node;
pub mod spec;

pub use demograph::DemoGraph;
pub use node::{AdmixFraction, Edge, PopId, PopulationNode, PulseEvent, SizeSpec, SplitWeight};
pub use spec::{EdgeSpec, GraphSpec, NodeSpec, PulseSpec};
