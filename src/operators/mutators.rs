//! Mutators: perturb a genome in place.
//!
//! Per-gene mutators (gaussian, range, flip, allele, GP operation) test
//! `pmut` independently for every gene or node. Swap and subtree mutators
//! test `pmut` once per call.
//!
//! Gaussian mutators read `gauss_mu`/`gauss_sigma` (integer default
//! `0/10`, real default `0/1`). When `rangemin` or `rangemax` is set the
//! result is clamped into the range.

use super::initializators::{int_range, real_range};
use crate::error::{EvolveError, Result};
use crate::genome::params::{
    DEFAULT_INT_GAUSS_MU, DEFAULT_INT_GAUSS_SIGMA, DEFAULT_RANGE_MAX, DEFAULT_RANGE_MIN,
    DEFAULT_REAL_GAUSS_MU, DEFAULT_REAL_GAUSS_SIGMA, GAUSS_MU, GAUSS_SIGMA, MAX_DEPTH, RANGE_MAX,
    RANGE_MIN,
};
use crate::genome::{
    build_gp_tree, Genome, GpTree, ListGenome, MatrixGenome, Mutator, NodeType, Params,
    PrimitiveSet, TreeGenome, TreeMethod,
};
use crate::random::{self, EvoRng};
use std::sync::Arc;

fn gauss_params(params: &Params, mu: f64, sigma: f64) -> Result<(f64, f64)> {
    Ok((params.real_or(GAUSS_MU, mu)?, params.real_or(GAUSS_SIGMA, sigma)?))
}

fn has_bounds(params: &Params) -> bool {
    params.contains(RANGE_MIN) || params.contains(RANGE_MAX)
}

fn int_clamp(params: &Params) -> Result<Option<(i64, i64)>> {
    if !has_bounds(params) {
        return Ok(None);
    }
    let lo = params.int_or(RANGE_MIN, DEFAULT_RANGE_MIN)?;
    let hi = params.int_or(RANGE_MAX, DEFAULT_RANGE_MAX)?;
    Ok(Some((lo.min(hi), lo.max(hi))))
}

fn real_clamp(params: &Params) -> Result<Option<(f64, f64)>> {
    if !has_bounds(params) {
        return Ok(None);
    }
    let lo = params.real_or(RANGE_MIN, DEFAULT_RANGE_MIN as f64)?;
    let hi = params.real_or(RANGE_MAX, DEFAULT_RANGE_MAX as f64)?;
    Ok(Some((lo.min(hi), lo.max(hi))))
}

/// Gaussian step settings resolved from genome params.
#[derive(Debug, Clone, Copy)]
struct Gauss<T> {
    mu: f64,
    sigma: f64,
    bounds: Option<(T, T)>,
}

impl Gauss<i64> {
    fn from_params(params: &Params) -> Result<Self> {
        let (mu, sigma) = gauss_params(params, DEFAULT_INT_GAUSS_MU, DEFAULT_INT_GAUSS_SIGMA)?;
        Ok(Self { mu, sigma, bounds: int_clamp(params)? })
    }
}

impl Gauss<f64> {
    fn from_params(params: &Params) -> Result<Self> {
        let (mu, sigma) = gauss_params(params, DEFAULT_REAL_GAUSS_MU, DEFAULT_REAL_GAUSS_SIGMA)?;
        Ok(Self { mu, sigma, bounds: real_clamp(params)? })
    }
}

fn gaussian_ints<'a>(
    values: impl Iterator<Item = &'a mut i64>,
    gauss: &Gauss<i64>,
    pmut: f64,
    rng: &mut EvoRng,
) -> Result<usize> {
    let Gauss { mu, sigma, bounds } = *gauss;
    let mut mutations = 0;
    for v in values {
        if random::flip_coin(rng, pmut) {
            let mut next = v.saturating_add(random::gaussian(rng, mu, sigma)? as i64);
            if let Some((lo, hi)) = bounds {
                next = next.clamp(lo, hi);
            }
            *v = next;
            mutations += 1;
        }
    }
    Ok(mutations)
}

fn gaussian_reals<'a>(
    values: impl Iterator<Item = &'a mut f64>,
    gauss: &Gauss<f64>,
    pmut: f64,
    rng: &mut EvoRng,
) -> Result<usize> {
    let Gauss { mu, sigma, bounds } = *gauss;
    let mut mutations = 0;
    for v in values {
        if random::flip_coin(rng, pmut) {
            let mut next = *v + random::gaussian(rng, mu, sigma)?;
            if let Some((lo, hi)) = bounds {
                next = next.clamp(lo, hi);
            }
            *v = next;
            mutations += 1;
        }
    }
    Ok(mutations)
}

fn reset_ints<'a>(
    values: impl Iterator<Item = &'a mut i64>,
    (lo, hi): (i64, i64),
    pmut: f64,
    rng: &mut EvoRng,
) -> Result<usize> {
    let mut mutations = 0;
    for v in values {
        if random::flip_coin(rng, pmut) {
            *v = random::random_int(rng, lo, hi);
            mutations += 1;
        }
    }
    Ok(mutations)
}

fn reset_reals<'a>(
    values: impl Iterator<Item = &'a mut f64>,
    (lo, hi): (f64, f64),
    pmut: f64,
    rng: &mut EvoRng,
) -> Result<usize> {
    let mut mutations = 0;
    for v in values {
        if random::flip_coin(rng, pmut) {
            *v = random::random_real(rng, lo, hi);
            mutations += 1;
        }
    }
    Ok(mutations)
}

fn flip_bits<'a>(values: impl Iterator<Item = &'a mut bool>, pmut: f64, rng: &mut EvoRng) -> usize {
    let mut mutations = 0;
    for v in values {
        if random::flip_coin(rng, pmut) {
            *v = !*v;
            mutations += 1;
        }
    }
    mutations
}

// ============================================================================
// Swap
// ============================================================================

/// With probability `pmut` per call, exchanges two distinct random
/// positions (list/matrix cells, or the data of two tree nodes).
#[derive(Debug, Clone, Copy, Default)]
pub struct SwapMutator;

impl<A> Mutator<ListGenome<A>> for SwapMutator
where
    A: Clone + Send + Sync + 'static,
{
    fn mutate(&self, genome: &mut ListGenome<A>, pmut: f64, rng: &mut EvoRng) -> Result<usize> {
        if !random::flip_coin(rng, pmut) {
            return Ok(0);
        }
        match random::distinct_pair(rng, genome.len()) {
            Some((a, b)) => {
                genome.as_mut_slice().swap(a, b);
                Ok(1)
            }
            None => Ok(0),
        }
    }
}

impl<A> Mutator<MatrixGenome<A>> for SwapMutator
where
    A: Clone + Send + Sync + 'static,
{
    fn mutate(&self, genome: &mut MatrixGenome<A>, pmut: f64, rng: &mut EvoRng) -> Result<usize> {
        if !random::flip_coin(rng, pmut) {
            return Ok(0);
        }
        match random::distinct_pair(rng, genome.len()) {
            Some((a, b)) => {
                genome.as_mut_slice().swap(a, b);
                Ok(1)
            }
            None => Ok(0),
        }
    }
}

impl<T> Mutator<TreeGenome<T>> for SwapMutator
where
    T: Clone + Send + Sync + 'static,
{
    fn mutate(&self, genome: &mut TreeGenome<T>, pmut: f64, rng: &mut EvoRng) -> Result<usize> {
        if !random::flip_coin(rng, pmut) {
            return Ok(0);
        }
        genome.ensure_processed();
        match random::distinct_pair(rng, genome.node_count()) {
            Some((a, b)) => {
                genome.swap_node_data(a, b)?;
                Ok(1)
            }
            None => Ok(0),
        }
    }
}

// ============================================================================
// Gaussian
// ============================================================================

/// Adds a truncated `Normal(mu, sigma)` draw to integer genes.
#[derive(Debug, Clone, Copy, Default)]
pub struct IntegerGaussianMutator;

impl Mutator<ListGenome<i64>> for IntegerGaussianMutator {
    fn mutate(&self, genome: &mut ListGenome<i64>, pmut: f64, rng: &mut EvoRng) -> Result<usize> {
        let gauss = Gauss::<i64>::from_params(genome.params())?;
        gaussian_ints(genome.as_mut_slice().iter_mut(), &gauss, pmut, rng)
    }
}

impl Mutator<MatrixGenome<i64>> for IntegerGaussianMutator {
    fn mutate(&self, genome: &mut MatrixGenome<i64>, pmut: f64, rng: &mut EvoRng) -> Result<usize> {
        let gauss = Gauss::<i64>::from_params(genome.params())?;
        gaussian_ints(genome.as_mut_slice().iter_mut(), &gauss, pmut, rng)
    }
}

impl Mutator<TreeGenome<i64>> for IntegerGaussianMutator {
    fn mutate(&self, genome: &mut TreeGenome<i64>, pmut: f64, rng: &mut EvoRng) -> Result<usize> {
        let gauss = Gauss::<i64>::from_params(genome.params())?;
        gaussian_ints(genome.data_mut(), &gauss, pmut, rng)
    }
}

/// Adds a `Normal(mu, sigma)` draw to real genes.
#[derive(Debug, Clone, Copy, Default)]
pub struct RealGaussianMutator;

impl Mutator<ListGenome<f64>> for RealGaussianMutator {
    fn mutate(&self, genome: &mut ListGenome<f64>, pmut: f64, rng: &mut EvoRng) -> Result<usize> {
        let gauss = Gauss::<f64>::from_params(genome.params())?;
        gaussian_reals(genome.as_mut_slice().iter_mut(), &gauss, pmut, rng)
    }
}

impl Mutator<MatrixGenome<f64>> for RealGaussianMutator {
    fn mutate(&self, genome: &mut MatrixGenome<f64>, pmut: f64, rng: &mut EvoRng) -> Result<usize> {
        let gauss = Gauss::<f64>::from_params(genome.params())?;
        gaussian_reals(genome.as_mut_slice().iter_mut(), &gauss, pmut, rng)
    }
}

impl Mutator<TreeGenome<f64>> for RealGaussianMutator {
    fn mutate(&self, genome: &mut TreeGenome<f64>, pmut: f64, rng: &mut EvoRng) -> Result<usize> {
        let gauss = Gauss::<f64>::from_params(genome.params())?;
        gaussian_reals(genome.data_mut(), &gauss, pmut, rng)
    }
}

// ============================================================================
// Range reset / bit flip / allele
// ============================================================================

/// Resets genes to a uniform value in `[rangemin, rangemax]`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RangeMutator;

impl Mutator<ListGenome<i64>> for RangeMutator {
    fn mutate(&self, genome: &mut ListGenome<i64>, pmut: f64, rng: &mut EvoRng) -> Result<usize> {
        let range = int_range(genome.params())?;
        reset_ints(genome.as_mut_slice().iter_mut(), range, pmut, rng)
    }
}

impl Mutator<ListGenome<f64>> for RangeMutator {
    fn mutate(&self, genome: &mut ListGenome<f64>, pmut: f64, rng: &mut EvoRng) -> Result<usize> {
        let range = real_range(genome.params())?;
        reset_reals(genome.as_mut_slice().iter_mut(), range, pmut, rng)
    }
}

impl Mutator<TreeGenome<i64>> for RangeMutator {
    fn mutate(&self, genome: &mut TreeGenome<i64>, pmut: f64, rng: &mut EvoRng) -> Result<usize> {
        let range = int_range(genome.params())?;
        reset_ints(genome.data_mut(), range, pmut, rng)
    }
}

impl Mutator<TreeGenome<f64>> for RangeMutator {
    fn mutate(&self, genome: &mut TreeGenome<f64>, pmut: f64, rng: &mut EvoRng) -> Result<usize> {
        let range = real_range(genome.params())?;
        reset_reals(genome.data_mut(), range, pmut, rng)
    }
}

/// Inverts bits.
#[derive(Debug, Clone, Copy, Default)]
pub struct FlipMutator;

impl Mutator<ListGenome<bool>> for FlipMutator {
    fn mutate(&self, genome: &mut ListGenome<bool>, pmut: f64, rng: &mut EvoRng) -> Result<usize> {
        Ok(flip_bits(genome.as_mut_slice().iter_mut(), pmut, rng))
    }
}

impl Mutator<MatrixGenome<bool>> for FlipMutator {
    fn mutate(&self, genome: &mut MatrixGenome<bool>, pmut: f64, rng: &mut EvoRng) -> Result<usize> {
        Ok(flip_bits(genome.as_mut_slice().iter_mut(), pmut, rng))
    }
}

/// Resamples genes from the genome's allele set.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlleleMutator;

impl<A> Mutator<ListGenome<A>> for AlleleMutator
where
    A: Clone + Send + Sync + 'static,
{
    fn mutate(&self, genome: &mut ListGenome<A>, pmut: f64, rng: &mut EvoRng) -> Result<usize> {
        let mut replacements = Vec::new();
        {
            let alleles = genome
                .alleles()
                .ok_or_else(|| EvolveError::config("the allele mutator needs an allele set"))?;
            for i in 0..genome.len() {
                if random::flip_coin(rng, pmut) {
                    let generator = alleles.get(i).ok_or_else(|| {
                        EvolveError::config(format!("no allele generator for position {i}"))
                    })?;
                    replacements.push((i, generator.random_allele(rng)));
                }
            }
        }
        let mutations = replacements.len();
        for (i, v) in replacements {
            genome.set(i, v);
        }
        Ok(mutations)
    }
}

// ============================================================================
// GP
// ============================================================================

/// With probability `pmut` per call, regrows the subtree under a random
/// node. The new subtree may reach `max_depth` minus the node's depth.
#[derive(Debug, Clone)]
pub struct GpSubtreeMutator {
    primitives: Arc<PrimitiveSet>,
}

impl GpSubtreeMutator {
    pub fn new(primitives: Arc<PrimitiveSet>) -> Self {
        Self { primitives }
    }
}

impl Mutator<GpTree> for GpSubtreeMutator {
    fn mutate(&self, genome: &mut GpTree, pmut: f64, rng: &mut EvoRng) -> Result<usize> {
        if !random::flip_coin(rng, pmut) {
            return Ok(0);
        }
        let max_depth = genome.params().require_count(MAX_DEPTH)?;
        let method = TreeMethod::from_params(genome.params())?;
        genome.ensure_processed();

        let Some(idx) = genome.random_node(rng, true) else {
            return Ok(0);
        };
        let depth = genome.depth_of(idx).unwrap_or(0);
        let subtree = build_gp_tree(
            &self.primitives,
            0,
            max_depth.saturating_sub(depth),
            method,
            rng,
        )?;
        genome.replace_subtree(idx, subtree)?;
        genome.process_nodes();
        Ok(1)
    }
}

/// Per node: replaces a terminal by a random terminal, or a function by a
/// random function of the same arity. Shapes never change.
#[derive(Debug, Clone)]
pub struct GpOperationMutator {
    primitives: Arc<PrimitiveSet>,
}

impl GpOperationMutator {
    pub fn new(primitives: Arc<PrimitiveSet>) -> Self {
        Self { primitives }
    }
}

impl Mutator<GpTree> for GpOperationMutator {
    fn mutate(&self, genome: &mut GpTree, pmut: f64, rng: &mut EvoRng) -> Result<usize> {
        genome.ensure_processed();
        let mut mutations = 0;
        for idx in 0..genome.node_count() {
            if !random::flip_coin(rng, pmut) {
                continue;
            }
            let Some(node) = genome.node_mut(idx) else {
                continue;
            };
            let replacement = match node.data.node_type {
                NodeType::Terminal => Some(self.primitives.random_terminal(rng)?),
                NodeType::NonTerminal => self
                    .primitives
                    .random_function_with_arity(node.children.len(), rng),
            };
            if let Some(data) = replacement {
                node.data = data;
                mutations += 1;
            }
        }
        Ok(mutations)
    }
}
