//! Fixed-length sequence genome and allele sets.

use super::{Genome, GenomeBase};
use crate::error::{EvolveError, Result};
use crate::operators::{
    BinaryInitializator, FlipMutator, IntegerInitializator, RealGaussianMutator,
    RealInitializator, SinglePointCrossover, SwapMutator,
};
use crate::random::{self, EvoRng};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;
use std::sync::Arc;

/// Produces one random valid allele value.
pub trait AlleleGenerator<A>: Send + Sync {
    fn random_allele(&self, rng: &mut EvoRng) -> A;
}

/// Uniform choice among a fixed set of values.
#[derive(Debug, Clone, PartialEq)]
pub struct AlleleList<A> {
    options: Vec<A>,
}

impl<A> AlleleList<A> {
    /// # Errors
    /// Returns [`EvolveError::Configuration`] for an empty option list.
    pub fn new(options: Vec<A>) -> Result<Self> {
        if options.is_empty() {
            return Err(EvolveError::config("an allele list needs at least one option"));
        }
        Ok(Self { options })
    }

    pub fn options(&self) -> &[A] {
        &self.options
    }
}

impl<A: Clone + Send + Sync> AlleleGenerator<A> for AlleleList<A> {
    fn random_allele(&self, rng: &mut EvoRng) -> A {
        let i = rand::Rng::random_range(rng, 0..self.options.len());
        self.options[i].clone()
    }
}

/// Uniform value in the inclusive range `[min, max]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AlleleRange<T> {
    pub min: T,
    pub max: T,
}

impl<T> AlleleRange<T> {
    pub fn new(min: T, max: T) -> Self {
        Self { min, max }
    }
}

impl AlleleGenerator<i64> for AlleleRange<i64> {
    fn random_allele(&self, rng: &mut EvoRng) -> i64 {
        random::random_int(rng, self.min, self.max)
    }
}

impl AlleleGenerator<f64> for AlleleRange<f64> {
    fn random_allele(&self, rng: &mut EvoRng) -> f64 {
        random::random_real(rng, self.min, self.max)
    }
}

/// Per-position (or homogeneous) allele generators.
pub struct Alleles<A> {
    homogeneous: bool,
    generators: Vec<Arc<dyn AlleleGenerator<A>>>,
}

impl<A> Alleles<A> {
    /// One generator shared by every position.
    pub fn homogeneous<G: AlleleGenerator<A> + 'static>(generator: G) -> Self {
        Self {
            homogeneous: true,
            generators: vec![Arc::new(generator)],
        }
    }

    /// An empty per-position allele set; fill it with [`push`](Self::push).
    pub fn per_position() -> Self {
        Self {
            homogeneous: false,
            generators: Vec::new(),
        }
    }

    pub fn push<G: AlleleGenerator<A> + 'static>(&mut self, generator: G) {
        self.generators.push(Arc::new(generator));
    }

    pub fn with<G: AlleleGenerator<A> + 'static>(mut self, generator: G) -> Self {
        self.push(generator);
        self
    }

    pub fn is_homogeneous(&self) -> bool {
        self.homogeneous
    }

    pub fn len(&self) -> usize {
        self.generators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.generators.is_empty()
    }

    /// The generator for a position (position 0's for homogeneous specs).
    pub fn get(&self, position: usize) -> Option<&dyn AlleleGenerator<A>> {
        let idx = if self.homogeneous { 0 } else { position };
        self.generators.get(idx).map(|g| g.as_ref())
    }
}

impl<A> fmt::Debug for Alleles<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Alleles")
            .field("homogeneous", &self.homogeneous)
            .field("len", &self.generators.len())
            .finish()
    }
}

/// A fixed-length ordered sequence of alleles.
///
/// The length never changes after construction: mutable access is only
/// given through slices, and whole-content replacement checks the length.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(bound(
    serialize = "A: Serialize",
    deserialize = "A: serde::de::DeserializeOwned"
))]
pub struct ListGenome<A> {
    base: GenomeBase<ListGenome<A>>,
    genes: Vec<A>,
    #[serde(skip)]
    alleles: Option<Arc<Alleles<A>>>,
}

impl<A: Clone + Default> ListGenome<A> {
    /// A genome of `size` default values with empty operator slots.
    pub fn new(size: usize) -> Self {
        Self::from_vec(vec![A::default(); size])
    }
}

impl<A> ListGenome<A> {
    pub fn from_vec(genes: Vec<A>) -> Self {
        Self {
            base: GenomeBase::default(),
            genes,
            alleles: None,
        }
    }

    pub fn len(&self) -> usize {
        self.genes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.genes.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&A> {
        self.genes.get(index)
    }

    /// Sets one gene; returns `false` if `index` is out of range.
    pub fn set(&mut self, index: usize, value: A) -> bool {
        match self.genes.get_mut(index) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    pub fn as_slice(&self) -> &[A] {
        &self.genes
    }

    pub fn as_mut_slice(&mut self) -> &mut [A] {
        &mut self.genes
    }

    pub fn iter(&self) -> std::slice::Iter<'_, A> {
        self.genes.iter()
    }

    /// Replaces the whole content.
    ///
    /// # Errors
    /// Returns [`EvolveError::InvalidOperation`] if the length differs.
    pub fn replace_genes(&mut self, genes: Vec<A>) -> Result<()> {
        if genes.len() != self.genes.len() {
            return Err(EvolveError::invalid(format!(
                "list genome length must stay {}, got {}",
                self.genes.len(),
                genes.len()
            )));
        }
        self.genes = genes;
        Ok(())
    }

    pub fn alleles(&self) -> Option<&Alleles<A>> {
        self.alleles.as_deref()
    }

    pub fn set_alleles(&mut self, alleles: Alleles<A>) {
        self.alleles = Some(Arc::new(alleles));
    }
}

impl<A: Clone> ListGenome<A> {
    /// Slice assignment `self[range] = other[range]`.
    ///
    /// # Errors
    /// Returns [`EvolveError::InvalidOperation`] if the range falls outside
    /// either genome.
    pub fn copy_range_from(&mut self, other: &Self, range: Range<usize>) -> Result<()> {
        if range.start > range.end || range.end > self.len() || range.end > other.len() {
            return Err(EvolveError::invalid(format!(
                "range {range:?} is outside the list genomes ({} / {})",
                self.len(),
                other.len()
            )));
        }
        self.genes[range.clone()].clone_from_slice(&other.genes[range]);
        Ok(())
    }
}

impl<A: PartialEq> ListGenome<A> {
    pub fn contains(&self, value: &A) -> bool {
        self.genes.contains(value)
    }
}

impl<A: PartialEq> PartialEq for ListGenome<A> {
    fn eq(&self, other: &Self) -> bool {
        self.genes == other.genes
    }
}

impl<A> Genome for ListGenome<A>
where
    A: Clone + Send + Sync + 'static,
{
    fn base(&self) -> &GenomeBase<Self> {
        &self.base
    }

    fn base_mut(&mut self) -> &mut GenomeBase<Self> {
        &mut self.base
    }

    fn adopt_operators(&mut self, prototype: &Self) {
        self.base.operators = prototype.base.operators.clone();
        self.alleles = prototype.alleles.clone();
    }
}

impl ListGenome<i64> {
    /// Integer list with uniform initialization, swap mutation and
    /// single-point crossover.
    pub fn integer(size: usize) -> Self {
        let mut g = Self::new(size);
        g.set_initializator(IntegerInitializator);
        g.set_mutator(SwapMutator);
        g.set_crossover(SinglePointCrossover);
        g
    }
}

impl ListGenome<f64> {
    /// Real list with uniform initialization, gaussian mutation and
    /// single-point crossover.
    pub fn real(size: usize) -> Self {
        let mut g = Self::new(size);
        g.set_initializator(RealInitializator);
        g.set_mutator(RealGaussianMutator);
        g.set_crossover(SinglePointCrossover);
        g
    }
}

impl ListGenome<bool> {
    /// Binary string with random bits, flip mutation and single-point
    /// crossover.
    pub fn binary(size: usize) -> Self {
        let mut g = Self::new(size);
        g.set_initializator(BinaryInitializator);
        g.set_mutator(FlipMutator);
        g.set_crossover(SinglePointCrossover);
        g
    }
}
