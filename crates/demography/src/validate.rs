//! Topology validation.
//!
//! Turns a raw [`GraphSpec`] into a [`DemoGraph`] or fails with the first
//! [`TopologyError`] found. Checks run in this order:
//!
//! 1. node attributes (ids, sizes, durations, selfing)
//! 2. edges (endpoints, duplicates, children per node)
//! 3. structure (single root, single parent, no cycles, split weights)
//! 4. migration and pulse references
//! 5. timing (root at `T = 0`, pulse targets live at the pulse time)
//! 6. pulse firing order
//!
//! Pulses are data annotations, not structural edges, so they never take part
//! in the root or cycle checks.

use crate::config::{same_time, Limits, TIME_TOLERANCE};
use crate::errors::TopologyError;
use crate::graph::{
    AdmixFraction, DemoGraph, Edge, GraphSpec, NodeSpec, PopId, PopulationNode, PulseEvent,
    SizeSpec, SplitWeight,
};
use std::collections::{BTreeMap, BTreeSet, VecDeque};

/// Validate `spec` and build the read-only graph.
pub fn validate(spec: &GraphSpec, limits: Limits) -> Result<DemoGraph, TopologyError> {
    if spec.nodes.is_empty() {
        return Err(TopologyError::Empty);
    }

    let mut nodes = BTreeMap::new();
    for raw in &spec.nodes {
        let node = node_from_spec(raw)?;
        if nodes.contains_key(&node.id) {
            return Err(TopologyError::DuplicateNode(node.id));
        }
        nodes.insert(node.id.clone(), node);
    }

    let edges = check_edges(spec, &nodes, &limits)?;
    let root = check_structure(&nodes, &edges)?;
    check_split_weights(&edges)?;
    check_references(spec, &nodes)?;

    let root_duration = nodes[&root].duration;
    if root_duration != 0.0 {
        return Err(TopologyError::RootDuration {
            id: root,
            value: root_duration,
        });
    }

    assign_times(&root, &mut nodes, &edges);
    attach_pulses(spec, &mut nodes)?;

    let mut graph = DemoGraph::from_parts(root, nodes, edges, limits);
    check_pulse_timing(&graph)?;
    let order = pulse_order(&graph)?;
    graph.set_pulse_order(order);
    Ok(graph)
}

fn node_from_spec(raw: &NodeSpec) -> Result<PopulationNode, TopologyError> {
    let id: PopId = raw.id.as_str().into();

    let size = match (raw.nu, raw.nu0, raw.nu_f) {
        (Some(nu), None, None) => SizeSpec::Constant { nu },
        (None, Some(nu0), Some(nu_f)) => SizeSpec::Exponential { nu0, nu_f },
        (Some(_), _, _) => return Err(TopologyError::AmbiguousSize(id)),
        (None, _, _) => return Err(TopologyError::MissingSize(id)),
    };
    let sizes = match size {
        SizeSpec::Constant { nu } => vec![("nu", nu)],
        SizeSpec::Exponential { nu0, nu_f } => vec![("nu0", nu0), ("nuF", nu_f)],
    };
    for (name, value) in sizes {
        if !(value.is_finite() && value > 0.0) {
            return Err(TopologyError::InvalidParameter { id, name, value });
        }
    }

    let duration = match raw.duration {
        Some(t) if t.is_finite() && t >= 0.0 => t,
        other => return Err(TopologyError::InvalidDuration { id, value: other }),
    };

    let selfing = raw.selfing.unwrap_or(0.0);
    if !(0.0..=1.0).contains(&selfing) {
        return Err(TopologyError::InvalidParameter {
            id,
            name: "selfing",
            value: selfing,
        });
    }

    let mut migration = BTreeMap::new();
    for (source, &rate) in &raw.migration {
        if !(rate.is_finite() && rate >= 0.0) {
            return Err(TopologyError::InvalidParameter {
                id,
                name: "migration rate",
                value: rate,
            });
        }
        migration.insert(PopId::from(source.as_str()), rate);
    }

    Ok(PopulationNode {
        id,
        size,
        duration,
        start: 0.0,
        migration,
        pulses: Vec::new(),
        selfing,
    })
}

fn check_edges(
    spec: &GraphSpec,
    nodes: &BTreeMap<PopId, PopulationNode>,
    limits: &Limits,
) -> Result<Vec<Edge>, TopologyError> {
    let mut seen = BTreeSet::new();
    let mut edges = Vec::with_capacity(spec.edges.len());

    for raw in &spec.edges {
        let from: PopId = raw.from.as_str().into();
        let to: PopId = raw.to.as_str().into();
        for endpoint in [&from, &to] {
            if !nodes.contains_key(endpoint) {
                return Err(TopologyError::UnknownNode {
                    missing: endpoint.clone(),
                    from: from.clone(),
                    to: to.clone(),
                });
            }
        }
        if from == to {
            return Err(TopologyError::Cycle(vec![from]));
        }
        if !seen.insert((from.clone(), to.clone())) {
            return Err(TopologyError::DuplicateEdge { from, to });
        }
        let weight = match raw.weight {
            None => None,
            Some(w) => Some(SplitWeight::new(w).ok_or_else(|| TopologyError::InvalidParameter {
                id: from.clone(),
                name: "split weight",
                value: w,
            })?),
        };
        edges.push(Edge {
            parent: from,
            child: to,
            weight,
        });
    }

    let mut out_degree: BTreeMap<&PopId, usize> = BTreeMap::new();
    for edge in &edges {
        *out_degree.entry(&edge.parent).or_default() += 1;
    }
    for (id, &count) in &out_degree {
        if count > limits.max_children {
            return Err(TopologyError::TooManyChildren {
                id: (*id).clone(),
                count,
                limit: limits.max_children,
            });
        }
    }

    Ok(edges)
}

/// Weighted edges only make sense on the branches of a split.
fn check_split_weights(edges: &[Edge]) -> Result<(), TopologyError> {
    for edge in edges.iter().filter(|edge| edge.weight.is_some()) {
        let siblings = edges
            .iter()
            .filter(|other| other.parent == edge.parent)
            .count();
        if siblings < 2 {
            return Err(TopologyError::LoneWeightedEdge {
                from: edge.parent.clone(),
                to: edge.child.clone(),
            });
        }
    }
    Ok(())
}

/// Returns the root once the graph is known to be a tree.
fn check_structure(
    nodes: &BTreeMap<PopId, PopulationNode>,
    edges: &[Edge],
) -> Result<PopId, TopologyError> {
    let mut parents: BTreeMap<&PopId, Vec<PopId>> =
        nodes.keys().map(|id| (id, Vec::new())).collect();
    for edge in edges {
        if let Some(list) = parents.get_mut(&edge.child) {
            list.push(edge.parent.clone());
        }
    }

    if let Some((id, list)) = parents.iter().find(|(_, list)| list.len() > 1) {
        return Err(TopologyError::MultipleParents {
            id: (*id).clone(),
            parents: list.clone(),
        });
    }

    let roots: Vec<PopId> = parents
        .iter()
        .filter(|(_, list)| list.is_empty())
        .map(|(id, _)| (*id).clone())
        .collect();
    let root = match roots.len() {
        0 => return Err(TopologyError::NoRoot),
        1 => roots[0].clone(),
        _ => return Err(TopologyError::MultipleRoots(roots)),
    };

    // With one parent per node, anything the root cannot reach sits on a cycle.
    let reached = descendants(&root, edges);
    let unreached: Vec<PopId> = nodes
        .keys()
        .filter(|id| !reached.contains(*id))
        .cloned()
        .collect();
    if !unreached.is_empty() {
        return Err(TopologyError::Cycle(unreached));
    }

    Ok(root)
}

fn descendants(root: &PopId, edges: &[Edge]) -> BTreeSet<PopId> {
    let mut reached = BTreeSet::from([root.clone()]);
    let mut queue = VecDeque::from([root.clone()]);
    while let Some(current) = queue.pop_front() {
        for edge in edges.iter().filter(|edge| edge.parent == current) {
            if reached.insert(edge.child.clone()) {
                queue.push_back(edge.child.clone());
            }
        }
    }
    reached
}

fn check_references(
    spec: &GraphSpec,
    nodes: &BTreeMap<PopId, PopulationNode>,
) -> Result<(), TopologyError> {
    for raw in &spec.nodes {
        let id: PopId = raw.id.as_str().into();
        let migration = raw.migration.keys().map(|target| ("migration", target));
        let pulses = raw.pulses.iter().map(|pulse| ("pulse", &pulse.target));
        for (kind, target) in migration.chain(pulses) {
            if *target == raw.id {
                return Err(TopologyError::SelfReference {
                    id: id.clone(),
                    kind,
                });
            }
            if !nodes.contains_key(target.as_str()) {
                return Err(TopologyError::UnknownReference {
                    id: id.clone(),
                    kind,
                    target: target.as_str().into(),
                });
            }
        }
    }
    Ok(())
}

fn assign_times(root: &PopId, nodes: &mut BTreeMap<PopId, PopulationNode>, edges: &[Edge]) {
    let mut queue = VecDeque::from([root.clone()]);
    while let Some(current) = queue.pop_front() {
        let end = nodes[&current].end();
        for edge in edges.iter().filter(|edge| edge.parent == current) {
            if let Some(child) = nodes.get_mut(&edge.child) {
                child.start = end;
            }
            queue.push_back(edge.child.clone());
        }
    }
}

fn attach_pulses(
    spec: &GraphSpec,
    nodes: &mut BTreeMap<PopId, PopulationNode>,
) -> Result<(), TopologyError> {
    for raw in &spec.nodes {
        let Some(node) = nodes.get_mut(raw.id.as_str()) else {
            continue;
        };
        for pulse in &raw.pulses {
            let target: PopId = pulse.target.as_str().into();
            if !(0.0..=1.0).contains(&pulse.at) {
                return Err(TopologyError::PulseOutOfRange {
                    id: node.id.clone(),
                    target,
                    name: "branch position",
                    value: pulse.at,
                });
            }
            let fraction =
                AdmixFraction::new(pulse.fraction).ok_or_else(|| TopologyError::PulseOutOfRange {
                    id: node.id.clone(),
                    target: target.clone(),
                    name: "admixture fraction",
                    value: pulse.fraction,
                })?;
            node.pulses.push(PulseEvent {
                source: node.id.clone(),
                target,
                at: pulse.at,
                time: node.start + pulse.at * node.duration,
                fraction,
                rank: 0,
            });
        }
        node.pulses.sort_by(|a, b| {
            a.time
                .total_cmp(&b.time)
                .then_with(|| a.target.cmp(&b.target))
        });
    }
    Ok(())
}

/// A pulse target must exist at the pulse time: inside its epoch, or a leaf
/// that is still alive at the present.
fn check_pulse_timing(graph: &DemoGraph) -> Result<(), TopologyError> {
    for node in graph.nodes().values() {
        for pulse in &node.pulses {
            let Some(target) = graph.node(&pulse.target) else {
                continue;
            };
            let started = pulse.time >= target.start - TIME_TOLERANCE;
            let before_end = pulse.time < target.end() - TIME_TOLERANCE;
            let open_ended = graph.is_leaf(&target.id) && !graph.is_ancient(&target.id);
            if !(started && (before_end || open_ended)) {
                return Err(TopologyError::PulseTargetNotLive {
                    from: pulse.source.clone(),
                    target: pulse.target.clone(),
                    time: pulse.time,
                });
            }
        }
    }
    Ok(())
}

/// Rank all pulses for firing, instant by instant.
fn pulse_order(graph: &DemoGraph) -> Result<Vec<(PopId, usize)>, TopologyError> {
    let mut all: Vec<(&PulseEvent, usize)> = graph
        .nodes()
        .values()
        .flat_map(|node| node.pulses.iter().enumerate().map(|(i, pulse)| (pulse, i)))
        .collect();
    all.sort_by(|a, b| {
        a.0.time
            .total_cmp(&b.0.time)
            .then_with(|| (&a.0.source, &a.0.target).cmp(&(&b.0.source, &b.0.target)))
    });

    let mut order = Vec::with_capacity(all.len());
    let mut rest = all.as_slice();
    while let Some(&(first, _)) = rest.first() {
        let end = rest
            .iter()
            .position(|(pulse, _)| !same_time(pulse.time, first.time))
            .unwrap_or(rest.len());
        let (instant, tail) = rest.split_at(end);
        order_instant(graph, first.time, instant, &mut order)?;
        rest = tail;
    }
    Ok(order)
}

/// Order the pulses of one instant; `instant` is sorted by (source, target).
fn order_instant(
    graph: &DemoGraph,
    time: f64,
    instant: &[(&PulseEvent, usize)],
    order: &mut Vec<(PopId, usize)>,
) -> Result<(), TopologyError> {
    let mut pending = instant.to_vec();
    while !pending.is_empty() {
        let ready = pending.iter().position(|&(pulse, index)| {
            let first_of_source = pending
                .iter()
                .all(|(other, i)| other.source != pulse.source || *i >= index);
            first_of_source
                && exists_at(graph, &pulse.source, time, &pending)
                && exists_at(graph, &pulse.target, time, &pending)
        });
        // same-instant pulses waiting on each other in a circle
        let Some(position) = ready else {
            let (pulse, _) = pending[0];
            return Err(TopologyError::PulseTargetNotLive {
                from: pulse.source.clone(),
                target: pulse.target.clone(),
                time: pulse.time,
            });
        };
        let (pulse, index) = pending.remove(position);
        order.push((pulse.source.clone(), index));
    }
    Ok(())
}

/// Whether `id` exists at `time` while the `pending` pulses have not fired.
fn exists_at(
    graph: &DemoGraph,
    id: &PopId,
    time: f64,
    pending: &[(&PulseEvent, usize)],
) -> bool {
    let mut current = id;
    loop {
        let Some(node) = graph.node(current) else {
            return false;
        };
        if !same_time(node.start, time) {
            return node.start < time;
        }
        let Some(parent) = graph.parent(current) else {
            return true;
        };
        if pending.iter().any(|(pulse, _)| pulse.source == *parent) {
            return false;
        }
        current = parent;
    }
}
