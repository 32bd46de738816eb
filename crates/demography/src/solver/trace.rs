//! Dry-run backend that records primitive calls.

use crate::errors::SolverError;
use crate::graph::PopId;
use crate::solver::{EquilibriumParams, IntegrationStep, Solver, SpectrumState};
use serde::Serialize;

/// One recorded primitive call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "call", rename_all = "snake_case")]
pub enum Call {
    Equilibrium {
        id: PopId,
        lineages: usize,
        nu: f64,
    },
    Integrate {
        populations: Vec<PopId>,
        duration: f64,
    },
    Split {
        axis: usize,
        lineages: (usize, usize),
        ids: (PopId, PopId),
    },
    Admix {
        source: usize,
        target: usize,
        fraction: f64,
        keep_source: usize,
    },
    Marginalize {
        axis: usize,
    },
    Reorder {
        order: Vec<usize>,
    },
    Relabel {
        axis: usize,
        id: PopId,
    },
}

/// Axis labels, lineage counts and the call log of a dry run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TraceState {
    pub pop_ids: Vec<PopId>,
    pub lineages: Vec<usize>,
    pub calls: Vec<Call>,
}

impl TraceState {
    /// Number of recorded calls of the given kind.
    pub fn count(&self, kind: &str) -> usize {
        self.calls.iter().filter(|call| call.kind() == kind).count()
    }
}

impl Call {
    pub fn kind(&self) -> &'static str {
        match self {
            Call::Equilibrium { .. } => "equilibrium",
            Call::Integrate { .. } => "integrate",
            Call::Split { .. } => "split",
            Call::Admix { .. } => "admix",
            Call::Marginalize { .. } => "marginalize",
            Call::Reorder { .. } => "reorder",
            Call::Relabel { .. } => "relabel",
        }
    }
}

impl SpectrumState for TraceState {
    fn pop_ids(&self) -> &[PopId] {
        &self.pop_ids
    }

    fn relabel(&mut self, axis: usize, id: PopId) {
        self.calls.push(Call::Relabel {
            axis,
            id: id.clone(),
        });
        self.pop_ids[axis] = id;
    }
}

/// Backend that computes nothing and only tracks shapes.
///
/// Useful for inspecting what a schedule would ask of a real integrator,
/// and for catching lineage bookkeeping errors before paying for one.
#[derive(Debug, Clone, Copy, Default)]
pub struct TraceSolver;

fn check_axis(primitive: &'static str, state: &TraceState, axis: usize) -> Result<(), SolverError> {
    if axis >= state.pop_ids.len() {
        return Err(SolverError::new(
            primitive,
            format!("axis {axis} out of range for {} axes", state.pop_ids.len()),
        ));
    }
    Ok(())
}

impl Solver for TraceSolver {
    type State = TraceState;

    fn equilibrium(
        &self,
        lineages: usize,
        params: &EquilibriumParams,
        id: &PopId,
    ) -> Result<TraceState, SolverError> {
        Ok(TraceState {
            pop_ids: vec![id.clone()],
            lineages: vec![lineages],
            calls: vec![Call::Equilibrium {
                id: id.clone(),
                lineages,
                nu: params.nu,
            }],
        })
    }

    fn integrate(
        &self,
        mut state: TraceState,
        step: &IntegrationStep<'_>,
    ) -> Result<TraceState, SolverError> {
        let axes = state.pop_ids.len();
        if step.sizes.len() != axes || step.migration.len() != axes || step.frozen.len() != axes {
            return Err(SolverError::new(
                "integrate",
                format!("step parameters do not cover {axes} axes"),
            ));
        }
        state.calls.push(Call::Integrate {
            populations: state.pop_ids.clone(),
            duration: step.duration,
        });
        Ok(state)
    }

    fn split(
        &self,
        mut state: TraceState,
        axis: usize,
        lineages: (usize, usize),
        ids: (&PopId, &PopId),
    ) -> Result<TraceState, SolverError> {
        check_axis("split", &state, axis)?;
        if lineages.0 + lineages.1 != state.lineages[axis] {
            return Err(SolverError::new(
                "split",
                format!(
                    "cannot split {} lineages into {} and {}",
                    state.lineages[axis], lineages.0, lineages.1
                ),
            ));
        }
        state.pop_ids[axis] = ids.0.clone();
        state.lineages[axis] = lineages.0;
        state.pop_ids.push(ids.1.clone());
        state.lineages.push(lineages.1);
        state.calls.push(Call::Split {
            axis,
            lineages,
            ids: (ids.0.clone(), ids.1.clone()),
        });
        Ok(state)
    }

    fn admix(
        &self,
        mut state: TraceState,
        source: usize,
        target: usize,
        fraction: f64,
        keep_source: usize,
    ) -> Result<TraceState, SolverError> {
        check_axis("admix", &state, source)?;
        check_axis("admix", &state, target)?;
        if keep_source + state.lineages[target] != state.lineages[source] {
            return Err(SolverError::new(
                "admix",
                format!(
                    "source holds {} lineages, cannot keep {keep_source} and give {}",
                    state.lineages[source], state.lineages[target]
                ),
            ));
        }
        state.lineages[source] = keep_source;
        state.calls.push(Call::Admix {
            source,
            target,
            fraction,
            keep_source,
        });
        Ok(state)
    }

    fn marginalize(&self, mut state: TraceState, axis: usize) -> Result<TraceState, SolverError> {
        check_axis("marginalize", &state, axis)?;
        state.pop_ids.remove(axis);
        state.lineages.remove(axis);
        state.calls.push(Call::Marginalize { axis });
        Ok(state)
    }

    fn reorder(&self, mut state: TraceState, order: &[usize]) -> Result<TraceState, SolverError> {
        let mut seen = vec![false; state.pop_ids.len()];
        for &axis in order {
            check_axis("reorder", &state, axis)?;
            seen[axis] = true;
        }
        if order.len() != seen.len() || seen.contains(&false) {
            return Err(SolverError::new("reorder", format!("{order:?} is not a permutation")));
        }
        state.pop_ids = order.iter().map(|&i| state.pop_ids[i].clone()).collect();
        state.lineages = order.iter().map(|&i| state.lineages[i]).collect();
        state.calls.push(Call::Reorder {
            order: order.to_vec(),
        });
        Ok(state)
    }
}
