//! Queries against a validated demography.

use crate::errors::{DemographyError, Result};
use crate::graph::{DemoGraph, PopId};
use crate::lineages::{required_lineages, LineageRequirements, SampleSizes};
use crate::schedule::{KeepAll, Schedule};
use crate::solver::{Solver, SolverAdapter};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

/// One frequency-spectrum request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SfsQuery {
    pub samples: SampleSizes,
    pub theta: f64,
    /// Output axis order; the sampled ids in sorted order when empty
    #[serde(default)]
    pub pop_ids: Vec<PopId>,
}

impl SfsQuery {
    pub fn new(samples: SampleSizes, theta: f64) -> Self {
        Self {
            samples,
            theta,
            pop_ids: Vec::new(),
        }
    }

    pub fn with_order<I, T>(mut self, pop_ids: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<PopId>,
    {
        self.pop_ids = pop_ids.into_iter().map(Into::into).collect();
        self
    }

    fn order(&self) -> Vec<PopId> {
        if self.pop_ids.is_empty() {
            self.samples.keys().cloned().collect()
        } else {
            self.pop_ids.clone()
        }
    }
}

impl DemoGraph {
    /// Lineages every population must carry to serve `samples`.
    pub fn required_lineages(&self, samples: &SampleSizes) -> Result<LineageRequirements> {
        required_lineages(self, samples)
    }

    /// Event list pruned to what `lineages` needs, optionally ending in a
    /// reorder to `output`.
    pub fn schedule(
        &self,
        lineages: &LineageRequirements,
        output: Option<&[PopId]>,
    ) -> Result<Schedule> {
        Schedule::build(self, lineages, output)
    }

    /// Event list over every population, without pruning.
    pub fn schedule_all(&self) -> Result<Schedule> {
        Schedule::build(self, &KeepAll, None)
    }

    /// Joint frequency spectrum of the sampled leaves, with axes in
    /// `pop_ids` order.
    ///
    /// Every check (sample request, output order, population cap) runs
    /// before the first solver call.
    #[instrument(skip(self, solver, samples), fields(populations = samples.len()))]
    pub fn sfs<S: Solver + ?Sized>(
        &self,
        solver: &S,
        samples: &SampleSizes,
        theta: f64,
        pop_ids: &[&str],
    ) -> Result<S::State> {
        let order: Vec<PopId> = pop_ids.iter().map(|&id| PopId::from(id)).collect();
        self.run_query(solver, samples, theta, &order)
    }

    /// Run independent queries in parallel, one result per query.
    pub fn sfs_batch<S>(&self, solver: &S, queries: &[SfsQuery]) -> Vec<Result<S::State>>
    where
        S: Solver + Sync + ?Sized,
        S::State: Send,
    {
        queries
            .par_iter()
            .map(|query| self.run_query(solver, &query.samples, query.theta, &query.order()))
            .collect()
    }

    fn run_query<S: Solver + ?Sized>(
        &self,
        solver: &S,
        samples: &SampleSizes,
        theta: f64,
        order: &[PopId],
    ) -> Result<S::State> {
        let lineages = self.required_lineages(samples)?;
        check_order(samples, order)?;
        let schedule = self.schedule(&lineages, Some(order))?;
        info!(
            ?samples,
            theta,
            events = schedule.len(),
            peak_live = schedule.peak_live(),
            "computing frequency spectrum"
        );
        SolverAdapter::new(solver, &lineages, *self.settings(), theta).apply(schedule.events())
    }
}

/// The output order must name every sampled leaf exactly once.
fn check_order(samples: &SampleSizes, order: &[PopId]) -> Result<()> {
    let mut sorted = order.to_vec();
    sorted.sort();
    sorted.dedup();
    if sorted.len() != order.len() || !sorted.iter().eq(samples.keys()) {
        return Err(DemographyError::AxisMismatch {
            expected: order.to_vec(),
            found: samples.keys().cloned().collect(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{GraphSpec, NodeSpec};
    use crate::solver::TraceSolver;

    fn two_pop() -> DemoGraph {
        let spec = GraphSpec::new()
            .add_node(NodeSpec::constant("root", 1.0, 0.0))
            .add_node(NodeSpec::constant("pop1", 1.0, 0.2))
            .add_node(NodeSpec::constant("pop2", 2.0, 0.2))
            .add_edge("root", "pop1")
            .add_edge("root", "pop2");
        DemoGraph::new(spec).unwrap()
    }

    fn samples(pairs: &[(&str, usize)]) -> SampleSizes {
        pairs.iter().map(|&(id, n)| (PopId::from(id), n)).collect()
    }

    #[test]
    fn test_sfs_axes_follow_order() {
        let graph = two_pop();
        let request = samples(&[("pop1", 4), ("pop2", 6)]);
        let state = graph
            .sfs(&TraceSolver, &request, 1.0, &["pop2", "pop1"])
            .unwrap();
        assert_eq!(state.pop_ids, vec![PopId::from("pop2"), PopId::from("pop1")]);
        assert_eq!(state.lineages, vec![6, 4]);
    }

    #[test]
    fn test_order_must_match_samples() {
        let graph = two_pop();
        let request = samples(&[("pop1", 4), ("pop2", 6)]);
        let orders: [&[&str]; 3] = [&["pop1"], &["pop1", "pop1"], &["pop1", "pop3"]];
        for order in orders {
            let err = graph.sfs(&TraceSolver, &request, 1.0, order).unwrap_err();
            assert!(matches!(err, DemographyError::AxisMismatch { .. }));
        }
    }

    #[test]
    fn test_schedule_all_keeps_everything() {
        let graph = two_pop();
        let schedule = graph.schedule_all().unwrap();
        assert!(!schedule.kinds().contains(&"marginalize"));
        assert_eq!(schedule.peak_live(), 2);
    }

    #[test]
    fn test_default_query_order_is_sorted() {
        let query = SfsQuery::new(samples(&[("pop2", 3), ("pop1", 5)]), 1.0);
        assert_eq!(query.order(), vec![PopId::from("pop1"), PopId::from("pop2")]);
        let query = query.with_order(["pop2", "pop1"]);
        assert_eq!(query.order()[0], PopId::from("pop2"));
    }
}
