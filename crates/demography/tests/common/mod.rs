//! Shared fixtures and test backends.
#![allow(dead_code)]

use demography::errors::SolverError;
use demography::prelude::*;
use demography::solver::{EquilibriumParams, IntegrationStep};

pub fn ids(names: &[&str]) -> Vec<PopId> {
    names.iter().map(|&name| PopId::from(name)).collect()
}

pub fn samples(pairs: &[(&str, usize)]) -> SampleSizes {
    pairs.iter().map(|&(id, n)| (PopId::from(id), n)).collect()
}

pub fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-12 * a.abs().max(b.abs()).max(1.0)
}

/// Install a test-writer subscriber so `RUST_LOG` works under `cargo test`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// ---------------------------------------------------------------------------
// Toy backend
// ---------------------------------------------------------------------------

/// One axis of a [`ProductSpectrum`].
#[derive(Debug, Clone, PartialEq)]
pub struct Axis {
    pub id: PopId,
    pub lineages: usize,
    /// Diversity scale; the neutral spectrum entry `i` is `scale / i`
    pub scale: f64,
}

/// A spectrum that factorizes over axes.
///
/// Each axis relaxes toward `theta * nu` during integration, so the result
/// depends on sizes, durations and the order of splits and pulses, while
/// projections, permutations and zero-fraction pulses stay exact.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductSpectrum {
    pub axes: Vec<Axis>,
    ids: Vec<PopId>,
}

impl ProductSpectrum {
    fn new(axes: Vec<Axis>) -> Self {
        let ids = axes.iter().map(|axis| axis.id.clone()).collect();
        Self { axes, ids }
    }

    fn sync(mut self) -> Self {
        self.ids = self.axes.iter().map(|axis| axis.id.clone()).collect();
        self
    }

    pub fn axis(&self, id: &str) -> &Axis {
        self.axes
            .iter()
            .find(|axis| &*axis.id == id)
            .unwrap_or_else(|| panic!("no axis {id}"))
    }

    /// Marginal spectrum of one axis.
    pub fn marginal(&self, id: &str) -> Vec<f64> {
        let axis = self.axis(id);
        (1..axis.lineages).map(|i| axis.scale / i as f64).collect()
    }
}

impl SpectrumState for ProductSpectrum {
    fn pop_ids(&self) -> &[PopId] {
        &self.ids
    }

    fn relabel(&mut self, axis: usize, id: PopId) {
        self.axes[axis].id = id.clone();
        self.ids[axis] = id;
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ProductSolver;

fn missing(primitive: &'static str, axis: usize) -> SolverError {
    SolverError::new(primitive, format!("no axis {axis}"))
}

impl Solver for ProductSolver {
    type State = ProductSpectrum;

    fn equilibrium(
        &self,
        lineages: usize,
        params: &EquilibriumParams,
        id: &PopId,
    ) -> Result<ProductSpectrum, SolverError> {
        Ok(ProductSpectrum::new(vec![Axis {
            id: id.clone(),
            lineages,
            scale: params.theta * params.nu,
        }]))
    }

    fn integrate(
        &self,
        mut state: ProductSpectrum,
        step: &IntegrationStep<'_>,
    ) -> Result<ProductSpectrum, SolverError> {
        for (i, axis) in state.axes.iter_mut().enumerate() {
            if step.frozen[i] {
                continue;
            }
            let nu = step.sizes[i].at(step.duration / 2.0);
            let decay = (-step.duration / nu).exp();
            axis.scale = axis.scale * decay + step.theta * nu * (1.0 - decay);
        }
        Ok(state)
    }

    fn split(
        &self,
        mut state: ProductSpectrum,
        axis: usize,
        lineages: (usize, usize),
        ids: (&PopId, &PopId),
    ) -> Result<ProductSpectrum, SolverError> {
        let parent = state.axes.get(axis).ok_or_else(|| missing("split", axis))?.clone();
        state.axes[axis] = Axis {
            id: ids.0.clone(),
            lineages: lineages.0,
            scale: parent.scale,
        };
        state.axes.push(Axis {
            id: ids.1.clone(),
            lineages: lineages.1,
            scale: parent.scale,
        });
        Ok(state.sync())
    }

    fn admix(
        &self,
        mut state: ProductSpectrum,
        source: usize,
        target: usize,
        fraction: f64,
        keep_source: usize,
    ) -> Result<ProductSpectrum, SolverError> {
        let from = state.axes.get(source).ok_or_else(|| missing("admix", source))?.scale;
        let into = state.axes.get_mut(target).ok_or_else(|| missing("admix", target))?;
        into.scale = (1.0 - fraction) * into.scale + fraction * from;
        state.axes[source].lineages = keep_source;
        Ok(state)
    }

    fn marginalize(
        &self,
        mut state: ProductSpectrum,
        axis: usize,
    ) -> Result<ProductSpectrum, SolverError> {
        if axis >= state.axes.len() {
            return Err(missing("marginalize", axis));
        }
        state.axes.remove(axis);
        Ok(state.sync())
    }

    fn reorder(
        &self,
        state: ProductSpectrum,
        order: &[usize],
    ) -> Result<ProductSpectrum, SolverError> {
        let axes = order
            .iter()
            .map(|&i| state.axes.get(i).cloned().ok_or_else(|| missing("reorder", i)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ProductSpectrum::new(axes))
    }
}

/// Backend that fails the test on any call.
#[derive(Debug, Clone, Copy, Default)]
pub struct PanicSolver;

impl Solver for PanicSolver {
    type State = ProductSpectrum;

    fn equilibrium(
        &self,
        _: usize,
        _: &EquilibriumParams,
        _: &PopId,
    ) -> Result<ProductSpectrum, SolverError> {
        panic!("solver must not be called")
    }

    fn integrate(
        &self,
        _: ProductSpectrum,
        _: &IntegrationStep<'_>,
    ) -> Result<ProductSpectrum, SolverError> {
        panic!("solver must not be called")
    }

    fn split(
        &self,
        _: ProductSpectrum,
        _: usize,
        _: (usize, usize),
        _: (&PopId, &PopId),
    ) -> Result<ProductSpectrum, SolverError> {
        panic!("solver must not be called")
    }

    fn admix(
        &self,
        _: ProductSpectrum,
        _: usize,
        _: usize,
        _: f64,
        _: usize,
    ) -> Result<ProductSpectrum, SolverError> {
        panic!("solver must not be called")
    }

    fn marginalize(&self, _: ProductSpectrum, _: usize) -> Result<ProductSpectrum, SolverError> {
        panic!("solver must not be called")
    }

    fn reorder(&self, _: ProductSpectrum, _: &[usize]) -> Result<ProductSpectrum, SolverError> {
        panic!("solver must not be called")
    }
}

// ---------------------------------------------------------------------------
// Demographies
// ---------------------------------------------------------------------------

pub fn root_only() -> GraphSpec {
    GraphSpec::new().add_node(NodeSpec::constant("root", 1.0, 0.0))
}

/// root -> A -> {C -> {pop2, pop3}, pop1}
pub fn three_leaf() -> GraphSpec {
    GraphSpec::new()
        .add_node(NodeSpec::constant("root", 1.0, 0.0))
        .add_node(NodeSpec::constant("A", 2.0, 0.5))
        .add_node(NodeSpec::constant("C", 1.0, 0.1))
        .add_node(NodeSpec::constant("pop1", 1.5, 0.2))
        .add_node(NodeSpec::constant("pop2", 1.0, 0.1))
        .add_node(NodeSpec::exponential("pop3", 0.5, 3.0, 0.1))
        .add_edge("root", "A")
        .add_weighted_edge("A", "C", 0.6)
        .add_weighted_edge("A", "pop1", 0.4)
        .add_edge("C", "pop2")
        .add_edge("C", "pop3")
}

/// Two sister populations, `pop1` pulsing into `pop2` halfway along.
pub fn pulse_pair(fraction: f64) -> GraphSpec {
    GraphSpec::new()
        .add_node(NodeSpec::constant("root", 1.0, 0.0))
        .add_node(NodeSpec::constant("pop1", 1.0, 0.2).with_pulse("pop2", 0.5, fraction))
        .add_node(NodeSpec::constant("pop2", 2.0, 0.2))
        .add_edge("root", "pop1")
        .add_edge("root", "pop2")
}

/// Six leaves all alive at the present.
pub fn ladder() -> GraphSpec {
    let mut spec = GraphSpec::new().add_node(NodeSpec::constant("root", 1.0, 0.0));
    for name in ["A", "B", "C", "D"] {
        spec = spec.add_node(NodeSpec::constant(format!("pop{name}"), 1.0, 1.0));
    }
    for i in 0..6 {
        let duration = (5 - i).max(1) as f64;
        spec = spec.add_node(NodeSpec::constant(format!("pop{i}"), 1.0, duration));
    }
    spec.add_edge("root", "popA")
        .add_edge("root", "pop0")
        .add_edge("popA", "pop1")
        .add_edge("popA", "popB")
        .add_edge("popB", "pop2")
        .add_edge("popB", "popC")
        .add_edge("popC", "pop3")
        .add_edge("popC", "popD")
        .add_edge("popD", "pop4")
        .add_edge("popD", "pop5")
}

pub struct OoaParams {
    pub nu_a: f64,
    pub t_a: f64,
    pub nu_b: f64,
    pub t_b: f64,
    pub nu_eu0: f64,
    pub nu_eu_f: f64,
    pub nu_as0: f64,
    pub nu_as_f: f64,
    pub t_f: f64,
    pub m_af_b: f64,
    pub m_af_eu: f64,
    pub m_af_as: f64,
    pub m_eu_as: f64,
}

impl Default for OoaParams {
    fn default() -> Self {
        Self {
            nu_a: 2.11,
            t_a: 0.377,
            nu_b: 0.251,
            t_b: 0.111,
            nu_eu0: 0.224,
            nu_eu_f: 3.02,
            nu_as0: 0.0904,
            nu_as_f: 5.77,
            t_f: 0.0711,
            m_af_b: 3.80,
            m_af_eu: 0.256,
            m_af_as: 0.125,
            m_eu_as: 1.07,
        }
    }
}

/// Thirteen-parameter out-of-Africa model.
pub fn ooa(p: &OoaParams) -> GraphSpec {
    GraphSpec::new()
        .add_node(NodeSpec::constant("root", 1.0, 0.0))
        .add_node(NodeSpec::constant("A", p.nu_a, p.t_a))
        .add_node(NodeSpec::constant("B", p.nu_b, p.t_b).with_migration("YRI", p.m_af_b))
        .add_node(
            NodeSpec::constant("YRI", p.nu_a, p.t_b + p.t_f)
                .with_migration("B", p.m_af_b)
                .with_migration("CEU", p.m_af_eu)
                .with_migration("CHB", p.m_af_as),
        )
        .add_node(
            NodeSpec::exponential("CEU", p.nu_eu0, p.nu_eu_f, p.t_f)
                .with_migration("YRI", p.m_af_eu)
                .with_migration("CHB", p.m_eu_as),
        )
        .add_node(
            NodeSpec::exponential("CHB", p.nu_as0, p.nu_as_f, p.t_f)
                .with_migration("YRI", p.m_af_as)
                .with_migration("CEU", p.m_eu_as),
        )
        .add_edge("root", "A")
        .add_edge("A", "B")
        .add_edge("A", "YRI")
        .add_edge("B", "CEU")
        .add_edge("B", "CHB")
}

/// Out-of-Africa with an archaic African lineage and a Neanderthal lineage,
/// both ending before the present.
pub fn archaic_admixture() -> GraphSpec {
    let (nu_a, t_a, nu_b, t_b, nu_eu0, nu_eu_f, nu_as0, nu_as_f, t_f) =
        (3.78, 1.11, 0.233, 0.100, 0.627, 2.87, 0.176, 16.2, 0.169);
    let (m_af_b, m_af_eu, m_af_as, m_eu_as) = (3.95, 0.0, 0.180, 0.859);
    let (t_mh, t_n, f_aa_begin, m_aa, m_neand, t_arch_end) =
        (0.528, 0.364, 0.566, 0.180, 0.112, 0.0967);

    let total = t_f + t_b + t_a + t_mh + t_n;
    let t_neand = total - t_arch_end;
    let t_aa = t_f + t_b + t_a + t_mh - t_arch_end;

    GraphSpec::new()
        .add_node(NodeSpec::constant("root", 1.0, 0.0))
        .add_node(
            NodeSpec::constant("Neand", 1.0, t_neand)
                .with_migration("B", m_neand)
                .with_migration("CEU", m_neand)
                .with_migration("CHB", m_neand),
        )
        .add_node(NodeSpec::constant("MH_AA", 1.0, t_n))
        .add_node(NodeSpec::constant("AA_nomig", 1.0, f_aa_begin * t_aa))
        .add_node(
            NodeSpec::constant("AA", 1.0, (1.0 - f_aa_begin) * t_aa)
                .with_migration("MH", m_aa)
                .with_migration("A", m_aa)
                .with_migration("YRI", m_aa),
        )
        .add_node(NodeSpec::constant("MH", 1.0, t_mh).with_migration("AA", m_aa))
        .add_node(NodeSpec::constant("A", nu_a, t_a).with_migration("AA", m_aa))
        .add_node(
            NodeSpec::constant("B", nu_b, t_b)
                .with_migration("Neand", m_neand)
                .with_migration("YRI", m_af_b),
        )
        .add_node(
            NodeSpec::constant("YRI", nu_a, t_b + t_f)
                .with_migration("AA", m_aa)
                .with_migration("B", m_af_b)
                .with_migration("CEU", m_af_eu)
                .with_migration("CHB", m_af_as),
        )
        .add_node(
            NodeSpec::exponential("CEU", nu_eu0, nu_eu_f, t_f)
                .with_migration("Neand", m_neand)
                .with_migration("YRI", m_af_eu)
                .with_migration("CHB", m_eu_as),
        )
        .add_node(
            NodeSpec::exponential("CHB", nu_as0, nu_as_f, t_f)
                .with_migration("Neand", m_neand)
                .with_migration("YRI", m_af_as)
                .with_migration("CEU", m_eu_as),
        )
        .add_edge("root", "Neand")
        .add_edge("root", "MH_AA")
        .add_edge("MH_AA", "AA_nomig")
        .add_edge("MH_AA", "MH")
        .add_edge("AA_nomig", "AA")
        .add_edge("MH", "A")
        .add_edge("A", "YRI")
        .add_edge("A", "B")
        .add_edge("B", "CEU")
        .add_edge("B", "CHB")
}

/// `pop1` descends from both `B` and `D`.
pub fn merge_model() -> GraphSpec {
    GraphSpec::new()
        .add_node(NodeSpec::constant("root", 1.0, 0.0))
        .add_node(NodeSpec::constant("A", 2.0, 0.5))
        .add_node(NodeSpec::constant("B", 1.5, 0.2))
        .add_node(NodeSpec::constant("C", 1.0, 0.1))
        .add_node(NodeSpec::constant("D", 1.0, 0.1))
        .add_node(NodeSpec::constant("pop1", 1.0, 0.05))
        .add_node(NodeSpec::exponential("pop2", 0.5, 3.0, 0.15))
        .add_edge("root", "A")
        .add_edge("A", "B")
        .add_edge("A", "C")
        .add_edge("C", "D")
        .add_edge("C", "pop2")
        .add_weighted_edge("B", "pop1", 0.7)
        .add_weighted_edge("D", "pop1", 0.3)
}

/// `Pop A` merges `Early 1` and `Early 2`, `Right` merges `Pre` and `Pop B`.
pub fn multiple_mergers() -> GraphSpec {
    GraphSpec::new()
        .add_node(NodeSpec::constant("Ancestral", 1.0, 0.0))
        .add_node(NodeSpec::constant("Early 1", 1.0, 0.1))
        .add_node(NodeSpec::constant("Early 2", 1.0, 0.1))
        .add_node(NodeSpec::constant("Pop A", 2.0, 0.1).with_pulse("Pop B", 0.5, 0.05))
        .add_node(NodeSpec::constant("Pop B", 1.0, 0.2))
        .add_node(NodeSpec::constant("Pre", 2.0, 0.1))
        .add_node(NodeSpec::constant("Left", 1.0, 0.3))
        .add_node(NodeSpec::constant("Right", 1.0, 0.1))
        .add_edge("Ancestral", "Early 1")
        .add_edge("Ancestral", "Early 2")
        .add_edge("Early 1", "Left")
        .add_edge("Early 2", "Pop B")
        .add_edge("Pop A", "Pre")
        .add_weighted_edge("Early 1", "Pop A", 0.25)
        .add_weighted_edge("Early 2", "Pop A", 0.75)
        .add_weighted_edge("Pre", "Right", 0.1)
        .add_weighted_edge("Pop B", "Right", 0.9)
}
