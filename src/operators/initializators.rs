//! Initializators: build genome content from scratch.
//!
//! Numeric initializators read `rangemin`/`rangemax` (default `0..=100`)
//! from the genome parameters. Tree initializators additionally read
//! `max_depth` (required), `max_siblings` (default 2) and `method`
//! (default grow).

use crate::error::{EvolveError, Result};
use crate::genome::params::{
    DEFAULT_MAX_SIBLINGS, DEFAULT_RANGE_MAX, DEFAULT_RANGE_MIN, MAX_DEPTH, MAX_SIBLINGS,
    RANGE_MAX, RANGE_MIN,
};
use crate::genome::{
    build_gp_tree, build_tree, Genome, GpTree, Initializator, ListGenome, MatrixGenome, Params,
    PrimitiveSet, TreeGenome, TreeMethod,
};
use crate::random::{self, EvoRng};
use rand::Rng;
use std::sync::Arc;

pub(crate) fn int_range(params: &Params) -> Result<(i64, i64)> {
    Ok((
        params.int_or(RANGE_MIN, DEFAULT_RANGE_MIN)?,
        params.int_or(RANGE_MAX, DEFAULT_RANGE_MAX)?,
    ))
}

pub(crate) fn real_range(params: &Params) -> Result<(f64, f64)> {
    Ok((
        params.real_or(RANGE_MIN, DEFAULT_RANGE_MIN as f64)?,
        params.real_or(RANGE_MAX, DEFAULT_RANGE_MAX as f64)?,
    ))
}

struct TreeShape {
    max_depth: usize,
    max_siblings: i64,
    method: TreeMethod,
}

fn tree_shape(params: &Params) -> Result<TreeShape> {
    Ok(TreeShape {
        max_depth: params.require_count(MAX_DEPTH)?,
        max_siblings: params.int_or(MAX_SIBLINGS, DEFAULT_MAX_SIBLINGS)?,
        method: TreeMethod::from_params(params)?,
    })
}

/// Uniform integers in `[rangemin, rangemax]`.
#[derive(Debug, Clone, Copy, Default)]
pub struct IntegerInitializator;

impl Initializator<ListGenome<i64>> for IntegerInitializator {
    fn initialize(&self, genome: &mut ListGenome<i64>, rng: &mut EvoRng) -> Result<()> {
        let (lo, hi) = int_range(genome.params())?;
        for v in genome.as_mut_slice() {
            *v = random::random_int(rng, lo, hi);
        }
        Ok(())
    }
}

impl Initializator<MatrixGenome<i64>> for IntegerInitializator {
    fn initialize(&self, genome: &mut MatrixGenome<i64>, rng: &mut EvoRng) -> Result<()> {
        let (lo, hi) = int_range(genome.params())?;
        for v in genome.as_mut_slice() {
            *v = random::random_int(rng, lo, hi);
        }
        Ok(())
    }
}

impl Initializator<TreeGenome<i64>> for IntegerInitializator {
    fn initialize(&self, genome: &mut TreeGenome<i64>, rng: &mut EvoRng) -> Result<()> {
        let (lo, hi) = int_range(genome.params())?;
        let shape = tree_shape(genome.params())?;
        let mut value = |rng: &mut EvoRng| random::random_int(rng, lo, hi);
        let root = build_tree(
            0,
            &mut value,
            shape.max_siblings,
            shape.max_depth,
            shape.method,
            rng,
        )?;
        genome.set_root(root);
        Ok(())
    }
}

/// Uniform reals in `[rangemin, rangemax]`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RealInitializator;

impl Initializator<ListGenome<f64>> for RealInitializator {
    fn initialize(&self, genome: &mut ListGenome<f64>, rng: &mut EvoRng) -> Result<()> {
        let (lo, hi) = real_range(genome.params())?;
        for v in genome.as_mut_slice() {
            *v = random::random_real(rng, lo, hi);
        }
        Ok(())
    }
}

impl Initializator<MatrixGenome<f64>> for RealInitializator {
    fn initialize(&self, genome: &mut MatrixGenome<f64>, rng: &mut EvoRng) -> Result<()> {
        let (lo, hi) = real_range(genome.params())?;
        for v in genome.as_mut_slice() {
            *v = random::random_real(rng, lo, hi);
        }
        Ok(())
    }
}

impl Initializator<TreeGenome<f64>> for RealInitializator {
    fn initialize(&self, genome: &mut TreeGenome<f64>, rng: &mut EvoRng) -> Result<()> {
        let (lo, hi) = real_range(genome.params())?;
        let shape = tree_shape(genome.params())?;
        let mut value = |rng: &mut EvoRng| random::random_real(rng, lo, hi);
        let root = build_tree(
            0,
            &mut value,
            shape.max_siblings,
            shape.max_depth,
            shape.method,
            rng,
        )?;
        genome.set_root(root);
        Ok(())
    }
}

/// Random bits.
#[derive(Debug, Clone, Copy, Default)]
pub struct BinaryInitializator;

impl Initializator<ListGenome<bool>> for BinaryInitializator {
    fn initialize(&self, genome: &mut ListGenome<bool>, rng: &mut EvoRng) -> Result<()> {
        for v in genome.as_mut_slice() {
            *v = rng.random_bool(0.5);
        }
        Ok(())
    }
}

impl Initializator<MatrixGenome<bool>> for BinaryInitializator {
    fn initialize(&self, genome: &mut MatrixGenome<bool>, rng: &mut EvoRng) -> Result<()> {
        for v in genome.as_mut_slice() {
            *v = rng.random_bool(0.5);
        }
        Ok(())
    }
}

/// Fills position `i` from the allele generator for `i`.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlleleInitializator;

impl<A> Initializator<ListGenome<A>> for AlleleInitializator
where
    A: Clone + Send + Sync + 'static,
{
    fn initialize(&self, genome: &mut ListGenome<A>, rng: &mut EvoRng) -> Result<()> {
        let alleles = genome
            .alleles()
            .ok_or_else(|| EvolveError::config("the allele initializator needs an allele set"))?;
        let values = (0..genome.len())
            .map(|i| {
                alleles
                    .get(i)
                    .map(|g| g.random_allele(rng))
                    .ok_or_else(|| EvolveError::config(format!("no allele generator for position {i}")))
            })
            .collect::<Result<Vec<A>>>()?;
        genome.replace_genes(values)
    }
}

/// Random GP trees over a primitive set.
#[derive(Debug, Clone)]
pub struct GpInitializator {
    primitives: Arc<PrimitiveSet>,
}

impl GpInitializator {
    pub fn new(primitives: Arc<PrimitiveSet>) -> Self {
        Self { primitives }
    }
}

impl Initializator<GpTree> for GpInitializator {
    fn initialize(&self, genome: &mut GpTree, rng: &mut EvoRng) -> Result<()> {
        let max_depth = genome.params().require_count(MAX_DEPTH)?;
        let method = TreeMethod::from_params(genome.params())?;
        let root = build_gp_tree(&self.primitives, 0, max_depth, method, rng)?;
        genome.set_root(root);
        Ok(())
    }
}
