//! Replays a schedule against a solver backend.

use crate::config::SolverSettings;
use crate::errors::{DemographyError, Result, SolverError};
use crate::graph::PopId;
use crate::lineages::LineageRequirements;
use crate::schedule::{Event, Integration};
use crate::solver::{EquilibriumParams, IntegrationStep, Solver, SpectrumState};
use tracing::debug;

/// Drives a [`Solver`] through an event list.
///
/// Tracks which population sits on which axis and how many lineages each
/// axis carries, and cross-checks the backend's axis labels after every
/// primitive.
pub struct SolverAdapter<'a, S: Solver + ?Sized> {
    solver: &'a S,
    lineages: &'a LineageRequirements,
    settings: SolverSettings,
    theta: f64,
    axes: Vec<PopId>,
    counts: Vec<usize>,
}

impl<'a, S: Solver + ?Sized> SolverAdapter<'a, S> {
    pub fn new(
        solver: &'a S,
        lineages: &'a LineageRequirements,
        settings: SolverSettings,
        theta: f64,
    ) -> Self {
        Self {
            solver,
            lineages,
            settings,
            theta,
            axes: Vec::new(),
            counts: Vec::new(),
        }
    }

    /// Apply `events` in order and return the final spectrum.
    pub fn apply<'e>(mut self, events: impl IntoIterator<Item = &'e Event>) -> Result<S::State> {
        let mut state: Option<S::State> = None;
        for event in events {
            let next = match (state.take(), event) {
                (None, Event::Equilibrium { population, nu }) => self.equilibrium(population, *nu)?,
                (None, other) => {
                    return Err(SolverError::new(
                        other.kind(),
                        "event list must start with an equilibrium",
                    )
                    .into())
                }
                (Some(current), event) => self.step(current, event)?,
            };
            self.check_axes(&next)?;
            state = Some(next);
        }
        state.ok_or_else(|| SolverError::new("equilibrium", "empty event list").into())
    }

    /// Lineage count per axis, in axis order.
    pub fn counts(&self) -> &[usize] {
        &self.counts
    }

    fn equilibrium(&mut self, population: &PopId, nu: f64) -> Result<S::State> {
        let lineages = self.lineages.get(population);
        let params = EquilibriumParams {
            theta: self.theta,
            nu,
            gamma: self.settings.gamma,
            h: self.settings.h,
        };
        debug!(population = %population, lineages, "equilibrium");
        let state = self.solver.equilibrium(lineages, &params, population)?;
        self.axes = vec![population.clone()];
        self.counts = vec![lineages];
        Ok(state)
    }

    fn step(&mut self, state: S::State, event: &Event) -> Result<S::State> {
        match event {
            Event::Equilibrium { .. } => {
                Err(SolverError::new("equilibrium", "equilibrium after the first event").into())
            }
            Event::Integrate(step) => self.integrate(state, step),
            Event::Split {
                parent,
                child_a,
                child_b,
            } => self.split(state, parent, child_a, child_b),
            Event::Relabel { from, to } => self.relabel(state, from, to),
            Event::PulseAdmix {
                source,
                target,
                fraction,
            } => self.admix(state, source, target, fraction.get()),
            Event::Marginalize { population } => {
                let axis = self.axis(population)?;
                debug!(population = %population, axis, "marginalize");
                let state = self.solver.marginalize(state, axis)?;
                self.axes.remove(axis);
                self.counts.remove(axis);
                Ok(state)
            }
            Event::Reorder { order } => self.reorder(state, order),
        }
    }

    fn integrate(&mut self, state: S::State, step: &Integration) -> Result<S::State> {
        if step.populations != self.axes {
            return Err(DemographyError::AxisMismatch {
                expected: step.populations.clone(),
                found: self.axes.clone(),
            });
        }
        debug!(
            start = step.start,
            duration = step.duration,
            axes = ?self.axes,
            "integrate"
        );
        let borrowed = IntegrationStep {
            duration: step.duration,
            sizes: &step.sizes,
            migration: &step.migration,
            frozen: &step.frozen,
            selfing: &step.selfing,
            theta: self.theta,
            gamma: self.settings.gamma,
            h: self.settings.h,
        };
        Ok(self.solver.integrate(state, &borrowed)?)
    }

    fn split(
        &mut self,
        state: S::State,
        parent: &PopId,
        child_a: &PopId,
        child_b: &PopId,
    ) -> Result<S::State> {
        let axis = self.axis(parent)?;
        let lineages = (self.lineages.get(child_a), self.lineages.get(child_b));
        let available = self.counts[axis];
        if lineages.0 + lineages.1 != available {
            return Err(DemographyError::LineageShortfall {
                id: parent.clone(),
                needed: lineages.0 + lineages.1,
                available,
            });
        }
        debug!(parent = %parent, axis, ?lineages, "split");
        let state = self
            .solver
            .split(state, axis, lineages, (child_a, child_b))?;
        self.axes[axis] = child_a.clone();
        self.counts[axis] = lineages.0;
        self.axes.push(child_b.clone());
        self.counts.push(lineages.1);
        Ok(state)
    }

    fn relabel(&mut self, mut state: S::State, from: &PopId, to: &PopId) -> Result<S::State> {
        let axis = self.axis(from)?;
        let needed = self.lineages.get(to);
        if self.counts[axis] != needed {
            return Err(DemographyError::LineageShortfall {
                id: to.clone(),
                needed,
                available: self.counts[axis],
            });
        }
        debug!(from = %from, to = %to, axis, "relabel");
        state.relabel(axis, to.clone());
        self.axes[axis] = to.clone();
        Ok(state)
    }

    fn admix(
        &mut self,
        state: S::State,
        source: &PopId,
        target: &PopId,
        fraction: f64,
    ) -> Result<S::State> {
        let from = self.axis(source)?;
        let into = self.axis(target)?;
        let (available, drawn) = (self.counts[from], self.counts[into]);
        if available < drawn {
            return Err(DemographyError::LineageShortfall {
                id: source.clone(),
                needed: drawn,
                available,
            });
        }
        let keep = available - drawn;
        debug!(source = %source, target = %target, fraction, keep, "pulse admixture");
        let state = self.solver.admix(state, from, into, fraction, keep)?;
        self.counts[from] = keep;
        Ok(state)
    }

    fn reorder(&mut self, state: S::State, order: &[PopId]) -> Result<S::State> {
        let mismatch = || DemographyError::AxisMismatch {
            expected: order.to_vec(),
            found: self.axes.clone(),
        };
        if order.len() != self.axes.len() {
            return Err(mismatch());
        }
        let permutation = order
            .iter()
            .map(|id| self.axes.iter().position(|axis| axis == id))
            .collect::<Option<Vec<usize>>>()
            .ok_or_else(mismatch)?;
        debug!(?permutation, "reorder");
        let state = self.solver.reorder(state, &permutation)?;
        self.axes = permutation.iter().map(|&i| self.axes[i].clone()).collect();
        self.counts = permutation.iter().map(|&i| self.counts[i]).collect();
        Ok(state)
    }

    fn axis(&self, id: &PopId) -> Result<usize> {
        self.axes
            .iter()
            .position(|axis| axis == id)
            .ok_or_else(|| DemographyError::AxisMismatch {
                expected: vec![id.clone()],
                found: self.axes.clone(),
            })
    }

    fn check_axes(&self, state: &S::State) -> Result<()> {
        if state.pop_ids() != self.axes.as_slice() {
            return Err(DemographyError::AxisMismatch {
                expected: self.axes.clone(),
                found: state.pop_ids().to_vec(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{DemoGraph, GraphSpec, NodeSpec};
    use crate::lineages::{required_lineages, SampleSizes};
    use crate::schedule::Schedule;
    use crate::solver::TraceSolver;

    fn split_graph() -> DemoGraph {
        let spec = GraphSpec::new()
            .add_node(NodeSpec::constant("root", 1.0, 0.0))
            .add_node(NodeSpec::constant("pop1", 1.0, 0.2))
            .add_node(NodeSpec::constant("pop2", 2.0, 0.2))
            .add_edge("root", "pop1")
            .add_edge("root", "pop2");
        DemoGraph::new(spec).unwrap()
    }

    fn requirements(graph: &DemoGraph) -> LineageRequirements {
        let samples: SampleSizes = [(PopId::from("pop1"), 5), (PopId::from("pop2"), 3)]
            .into_iter()
            .collect();
        required_lineages(graph, &samples).unwrap()
    }

    #[test]
    fn test_apply_tracks_counts() {
        let graph = split_graph();
        let lineages = requirements(&graph);
        let schedule = Schedule::build(&graph, &lineages, None).unwrap();
        let state = SolverAdapter::new(&TraceSolver, &lineages, SolverSettings::default(), 1.0)
            .apply(schedule.events())
            .unwrap();
        assert_eq!(state.lineages, vec![5, 3]);
        assert_eq!(state.count("integrate"), 1);
    }

    #[test]
    fn test_first_event_must_be_equilibrium() {
        let graph = split_graph();
        let lineages = requirements(&graph);
        let events = [Event::Marginalize {
            population: "pop1".into(),
        }];
        let err = SolverAdapter::new(&TraceSolver, &lineages, SolverSettings::default(), 1.0)
            .apply(&events)
            .unwrap_err();
        assert!(matches!(err, DemographyError::Solver(_)));
    }

    #[test]
    fn test_integration_over_wrong_axes() {
        let graph = split_graph();
        let lineages = requirements(&graph);
        let schedule = Schedule::build(&graph, &lineages, None).unwrap();
        let mut events = schedule.into_events();
        // drop the split so the integration names axes that do not exist
        events.retain(|event| event.kind() != "split");
        let err = SolverAdapter::new(&TraceSolver, &lineages, SolverSettings::default(), 1.0)
            .apply(&events)
            .unwrap_err();
        assert!(matches!(err, DemographyError::AxisMismatch { .. }));
    }

    #[test]
    fn test_reorder_to_unknown_population() {
        let graph = split_graph();
        let lineages = requirements(&graph);
        let mut events = Schedule::build(&graph, &lineages, None)
            .unwrap()
            .into_events();
        events.push(Event::Reorder {
            order: vec!["pop2".into(), "pop3".into()],
        });
        let err = SolverAdapter::new(&TraceSolver, &lineages, SolverSettings::default(), 1.0)
            .apply(&events)
            .unwrap_err();
        assert!(matches!(err, DemographyError::AxisMismatch { .. }));
    }
}
