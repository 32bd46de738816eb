//! Time-ordered traversal producing the event list.
//!
//! The scheduler keeps the live populations in solver axis order and moves
//! from one event time to the next. At each time it repeats two passes until
//! nothing changes:
//!
//! 1. epochs ending now are closed in id order (split, relabel, retire or
//!    marginalize), except for populations that still have a pulse due now
//! 2. pulses due now are applied in the graph's firing order, stopping at the
//!    first one whose source or target has not been created yet
//!
//! Between two event times all live populations are integrated jointly.

use crate::config::same_time;
use crate::errors::{CapacityError, DemographyError, Result, TopologyError};
use crate::graph::{DemoGraph, PopId, PopulationNode, PulseEvent};
use crate::schedule::{Demand, Event, Integration, SizeFunction};
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::{debug, instrument};

/// An ordered event list, consumed once by a solver adapter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Schedule {
    events: Vec<Event>,
    peak_live: usize,
}

impl Schedule {
    /// Schedule `graph`, keeping what `demand` asks for.
    ///
    /// With an `output` order the schedule ends in a [`Event::Reorder`] to
    /// that order, which must name exactly the populations left live.
    #[instrument(skip_all, fields(nodes = graph.len()))]
    pub fn build<D: Demand + ?Sized>(
        graph: &DemoGraph,
        demand: &D,
        output: Option<&[PopId]>,
    ) -> Result<Self> {
        let mut scheduler = Scheduler {
            graph,
            demand,
            time: 0.0,
            live: Vec::new(),
            retired: BTreeSet::new(),
            pulses: graph.pulses().collect(),
            fired: 0,
            events: Vec::new(),
            peak_live: 0,
        };
        scheduler.run()?;

        if let Some(order) = output {
            let mut expected: Vec<PopId> = order.to_vec();
            let mut found = scheduler.live.clone();
            expected.sort();
            found.sort();
            if expected != found {
                return Err(DemographyError::AxisMismatch {
                    expected: order.to_vec(),
                    found: scheduler.live,
                });
            }
            scheduler.push(Event::Reorder {
                order: order.to_vec(),
            });
        }

        debug!(
            events = scheduler.events.len(),
            peak_live = scheduler.peak_live,
            "schedule built"
        );
        Ok(Self {
            events: scheduler.events,
            peak_live: scheduler.peak_live,
        })
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn into_events(self) -> Vec<Event> {
        self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Largest number of populations live at any time.
    pub fn peak_live(&self) -> usize {
        self.peak_live
    }

    /// The integration steps, in order.
    pub fn integrations(&self) -> impl Iterator<Item = &Integration> {
        self.events.iter().filter_map(|event| match event {
            Event::Integrate(step) => Some(step),
            _ => None,
        })
    }

    /// Event kinds in order, e.g. `["equilibrium", "relabel", "integrate"]`.
    pub fn kinds(&self) -> Vec<&'static str> {
        self.events.iter().map(Event::kind).collect()
    }
}

impl<'a> IntoIterator for &'a Schedule {
    type Item = &'a Event;
    type IntoIter = std::slice::Iter<'a, Event>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.iter()
    }
}

struct Scheduler<'a, D: ?Sized> {
    graph: &'a DemoGraph,
    demand: &'a D,
    time: f64,
    /// Live populations in axis order
    live: Vec<PopId>,
    /// Leaves whose epoch has ended; frozen when that happened before the present
    retired: BTreeSet<PopId>,
    /// All pulses in firing order, with their index at the source
    pulses: Vec<(usize, &'a PulseEvent)>,
    /// Pulses handled so far (fired or skipped)
    fired: usize,
    events: Vec<Event>,
    peak_live: usize,
}

impl<'a, D: Demand + ?Sized> Scheduler<'a, D> {
    fn run(&mut self) -> Result<()> {
        let root = self.graph.root().clone();
        if !self.demand.needs(&root) {
            return Ok(());
        }
        let nu = self.node(&root).size.initial();
        self.push(Event::Equilibrium {
            population: root.clone(),
            nu,
        });
        self.live.push(root);
        self.enter()?;

        loop {
            self.settle()?;
            let Some(next) = self.next_time() else {
                break;
            };
            self.integrate(next);
            self.time = next;
        }
        Ok(())
    }

    fn node(&self, id: &str) -> &'a PopulationNode {
        let graph = self.graph;
        // live populations always come from the graph
        &graph.nodes()[id]
    }

    fn push(&mut self, event: Event) {
        debug!(time = self.time, kind = event.kind(), ?event, "scheduled");
        self.events.push(event);
    }

    /// Check the cap after populations became live.
    fn enter(&mut self) -> Result<()> {
        self.peak_live = self.peak_live.max(self.live.len());
        let limit = self.graph.limits().max_live_populations;
        if self.live.len() > limit {
            return Err(CapacityError {
                time: self.time,
                populations: self.live.clone(),
                limit,
            }
            .into());
        }
        Ok(())
    }

    fn axis(&self, id: &str) -> Option<usize> {
        self.live.iter().position(|live| &**live == id)
    }

    fn remove(&mut self, id: &PopId) {
        if let Some(axis) = self.axis(id) {
            self.live.remove(axis);
        }
    }

    fn marginalize(&mut self, id: &PopId) {
        self.remove(id);
        self.push(Event::Marginalize {
            population: id.clone(),
        });
    }

    /// First pulse of `id` not handled yet.
    fn pending_pulse(&self, id: &str) -> Option<&'a PulseEvent> {
        let fired = self.fired;
        self.node(id).pulses.iter().find(|pulse| pulse.rank >= fired)
    }

    fn is_due(&self, pulse: &PulseEvent) -> bool {
        same_time(pulse.time, self.time) || pulse.time < self.time
    }

    fn pulse_due(&self, id: &str) -> bool {
        self.pending_pulse(id).is_some_and(|pulse| self.is_due(pulse))
    }

    fn needed_at_end(&self, id: &str) -> bool {
        match self.node(id).pulses.len() {
            0 => self.demand.needs(id),
            n => self.demand.needs_after_pulse(id, n - 1),
        }
    }

    /// Process everything that happens at the current time.
    fn settle(&mut self) -> Result<()> {
        loop {
            let closed = self.close_epochs()?;
            let pulsed = self.apply_pulses()?;
            if !closed && !pulsed {
                break;
            }
        }
        match self.pulses.get(self.fired) {
            Some(&(_, pulse)) if self.is_due(pulse) => Err(TopologyError::PulseTargetNotLive {
                from: pulse.source.clone(),
                target: pulse.target.clone(),
                time: pulse.time,
            }
            .into()),
            _ => Ok(()),
        }
    }

    fn close_epochs(&mut self) -> Result<bool> {
        let mut ending: Vec<PopId> = self
            .live
            .iter()
            .filter(|id| !self.retired.contains(*id))
            .filter(|id| same_time(self.node(id).end(), self.time))
            .filter(|id| !self.pulse_due(id))
            .cloned()
            .collect();
        ending.sort();

        for id in &ending {
            self.close_epoch(id)?;
        }
        Ok(!ending.is_empty())
    }

    fn close_epoch(&mut self, id: &PopId) -> Result<()> {
        let graph = self.graph;
        let children: Vec<&PopId> = graph.children(id).collect();

        if children.is_empty() {
            if self.needed_at_end(id) {
                self.retired.insert(id.clone());
            } else {
                self.marginalize(id);
            }
            return Ok(());
        }

        let needed: Vec<&PopId> = children
            .iter()
            .copied()
            .filter(|child| self.demand.needs(child))
            .collect();
        let Some(axis) = self.axis(id) else {
            return Ok(());
        };

        match needed.as_slice() {
            [] => self.marginalize(id),
            [child] => {
                let child = (*child).clone();
                self.live[axis] = child.clone();
                self.push(Event::Relabel {
                    from: id.clone(),
                    to: child,
                });
                self.enter()?;
            }
            [a, b] => {
                let (a, b) = ((*a).clone(), (*b).clone());
                self.live[axis] = a.clone();
                self.live.push(b.clone());
                self.push(Event::Split {
                    parent: id.clone(),
                    child_a: a,
                    child_b: b,
                });
                self.enter()?;
            }
            // a split event only has two sides
            more => {
                return Err(TopologyError::TooManyChildren {
                    id: id.clone(),
                    count: more.len(),
                    limit: 2,
                }
                .into())
            }
        }
        Ok(())
    }

    /// Handle due pulses in firing order. A needed pulse whose source or
    /// target is created later in this instant holds back the rest.
    fn apply_pulses(&mut self) -> Result<bool> {
        let start = self.fired;
        while let Some(&(index, pulse)) = self.pulses.get(self.fired) {
            if !self.is_due(pulse) {
                break;
            }
            let source = &pulse.source;
            let live = self.axis(source).is_some();
            if self.demand.needs_pulse(source, index) {
                if !live || self.axis(&pulse.target).is_none() {
                    debug!(source = %source, target = %pulse.target, "pulse waits");
                    break;
                }
                self.push(Event::PulseAdmix {
                    source: source.clone(),
                    target: pulse.target.clone(),
                    fraction: pulse.fraction,
                });
            } else {
                debug!(source = %source, target = %pulse.target, "pulse not needed, skipped");
            }

            self.fired += 1;
            if live && !self.demand.needs_after_pulse(source, index) {
                self.marginalize(source);
            }
        }
        Ok(self.fired > start)
    }

    /// Earliest epoch end or pulse strictly after the current time.
    fn next_time(&self) -> Option<f64> {
        let now = self.time;
        self.live
            .iter()
            .filter(|id| !self.retired.contains(*id))
            .flat_map(|id| {
                let end = self.node(id).end();
                let pulse = self.pending_pulse(id).map(|pulse| pulse.time);
                std::iter::once(end).chain(pulse)
            })
            .filter(|&time| time > now && !same_time(time, now))
            .min_by(f64::total_cmp)
    }

    fn integrate(&mut self, until: f64) {
        let nodes: Vec<&PopulationNode> = self.live.iter().map(|id| self.node(id)).collect();
        let frozen: Vec<bool> = self
            .live
            .iter()
            .map(|id| self.retired.contains(id))
            .collect();

        let sizes = nodes
            .iter()
            .map(|node| SizeFunction {
                spec: node.size,
                epoch: node.duration,
                offset: self.time - node.start,
            })
            .collect();
        let migration = nodes
            .iter()
            .enumerate()
            .map(|(i, into)| {
                nodes
                    .iter()
                    .enumerate()
                    .map(|(j, from)| {
                        if i == j || frozen[i] || frozen[j] {
                            0.0
                        } else {
                            into.migration_from(&from.id)
                        }
                    })
                    .collect::<Vec<f64>>()
            })
            .collect();
        let selfing = nodes.iter().map(|node| node.selfing).collect();

        self.push(Event::Integrate(Integration {
            start: self.time,
            duration: until - self.time,
            populations: self.live.clone(),
            sizes,
            migration,
            frozen,
            selfing,
        }));
    }
}
