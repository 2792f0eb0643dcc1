//! Population container, statistics and scaling.
//!
//! A [`Population`] owns the individuals of one generation and tracks two
//! orderings:
//!
//! - the primary order of `individuals`, by scaled fitness (or by raw score
//!   when [`SortType::Raw`] is selected)
//! - a secondary raw-score ranking so [`Population::best_raw`] is available
//!   regardless of the scaled order
//!
//! Statistics and sorting are cached and invalidated by any change to the
//! individuals or their scores.

mod scaling;
mod statistics;

pub use scaling::{
    BoltzmannScaling, Scaling, DEFAULT_BOLTZMANN_FACTOR, DEFAULT_BOLTZMANN_MIN,
    DEFAULT_BOLTZMANN_START, DEFAULT_LINEAR_MULTIPLIER, DEFAULT_POWER_EXPONENT,
    DEFAULT_SIGMA_MULTIPLIER,
};
pub use statistics::Statistics;

use crate::error::{EvolveError, Result};
use crate::genome::Genome;
use crate::random::EvoRng;
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Which value orders the population.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortType {
    /// Scale first, then sort by fitness.
    #[default]
    Scaled,
    /// Sort by raw score; scaling is skipped.
    Raw,
}

/// Direction of the search.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Minimax {
    Minimize,
    #[default]
    Maximize,
}

impl Minimax {
    /// Ordering that puts the better value first.
    pub fn best_first(self, a: f64, b: f64) -> Ordering {
        let ord = a.partial_cmp(&b).unwrap_or(Ordering::Equal);
        match self {
            Minimax::Minimize => ord,
            Minimax::Maximize => ord.reverse(),
        }
    }

    /// `true` if `a` is strictly better than `b`.
    pub fn is_better(self, a: f64, b: f64) -> bool {
        match self {
            Minimax::Minimize => a < b,
            Minimax::Maximize => a > b,
        }
    }
}

/// The individuals of one generation plus their ordering and statistics.
#[derive(Debug, Clone)]
pub struct Population<G: Genome> {
    individuals: Vec<G>,
    raw_order: Vec<usize>,
    size: usize,
    sort_type: SortType,
    minimax: Minimax,
    scaling: Scaling,
    parallel: bool,
    stats: Statistics,
    statted: bool,
    sorted: bool,
}

impl<G: Genome> Population<G> {
    /// An empty population that [`create`](Self::create) fills to `size`.
    pub fn new(size: usize) -> Self {
        Self {
            individuals: Vec::with_capacity(size),
            raw_order: Vec::new(),
            size,
            sort_type: SortType::default(),
            minimax: Minimax::default(),
            scaling: Scaling::default(),
            parallel: false,
            stats: Statistics::default(),
            statted: false,
            sorted: false,
        }
    }

    pub fn with_sort_type(mut self, sort_type: SortType) -> Self {
        self.sort_type = sort_type;
        self
    }

    pub fn with_minimax(mut self, minimax: Minimax) -> Self {
        self.minimax = minimax;
        self
    }

    pub fn with_scaling(mut self, scaling: Scaling) -> Self {
        self.scaling = scaling;
        self
    }

    /// Evaluates individuals on the rayon pool. Has no effect without the
    /// `parallel` feature.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// A population with the same settings (and scaling state) but no
    /// individuals.
    pub fn empty_like(&self) -> Self {
        Self {
            individuals: Vec::with_capacity(self.size),
            raw_order: Vec::new(),
            stats: Statistics::default(),
            statted: false,
            sorted: false,
            ..*self
        }
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Replaces the individuals with `size` clones of `prototype`.
    pub fn create(&mut self, prototype: &G) {
        self.individuals.clear();
        self.individuals
            .extend(std::iter::repeat_with(|| prototype.clone()).take(self.size));
        self.clear_flags();
    }

    /// Runs every individual's initializator slot.
    pub fn initialize(&mut self, rng: &mut EvoRng) -> Result<()> {
        for genome in &mut self.individuals {
            genome.initialize(rng)?;
        }
        self.clear_flags();
        Ok(())
    }

    /// Scores every individual.
    ///
    /// Each score is written back into its own individual, so the result is
    /// independent of the order in which the workers finish.
    pub fn evaluate(&mut self) -> Result<()> {
        self.clear_flags();

        #[cfg(feature = "parallel")]
        {
            if self.parallel {
                return self
                    .individuals
                    .par_iter_mut()
                    .try_for_each(|g| g.evaluate().map(|_| ()));
            }
        }

        for genome in &mut self.individuals {
            genome.evaluate()?;
        }
        Ok(())
    }

    /// Computes (or returns the cached) raw statistics.
    pub fn statistics(&mut self) -> Result<&Statistics> {
        if !self.statted {
            let scores = self.scores();
            let fitness: Vec<f64> = self.individuals.iter().map(Genome::fitness).collect();
            self.stats = Statistics::from_scores(&scores, &fitness)?;
            self.statted = true;
        }
        Ok(&self.stats)
    }

    /// Applies the scaling scheme to every individual.
    ///
    /// Stateful schemes (Boltzmann) advance once per call.
    pub fn scale(&mut self) -> Result<()> {
        self.statistics()?;
        let scores = self.scores();
        let fitness = self.scaling.scale(&scores, &self.stats)?;
        for (genome, f) in self.individuals.iter_mut().zip(&fitness) {
            genome.set_fitness(*f);
        }
        self.stats.update_fitness(&fitness);
        self.sorted = false;
        Ok(())
    }

    /// Orders the population best-first.
    ///
    /// With [`SortType::Scaled`] this scales first; the raw ranking is kept
    /// alongside. Sorting is stable and cached until the next change.
    pub fn sort(&mut self) -> Result<()> {
        if self.sorted {
            return Ok(());
        }
        if self.individuals.is_empty() {
            return Err(EvolveError::EmptyPopulation);
        }

        let minimax = self.minimax;
        match self.sort_type {
            SortType::Raw => {
                self.individuals
                    .sort_by(|a, b| minimax.best_first(a.score(), b.score()));
                self.raw_order = (0..self.individuals.len()).collect();
            }
            SortType::Scaled => {
                self.scale()?;
                self.individuals
                    .sort_by(|a, b| minimax.best_first(a.fitness(), b.fitness()));
                let mut order: Vec<usize> = (0..self.individuals.len()).collect();
                order.sort_by(|&a, &b| {
                    minimax.best_first(self.individuals[a].score(), self.individuals[b].score())
                });
                self.raw_order = order;
            }
        }

        self.sorted = true;
        Ok(())
    }

    /// The `index`-th best individual by the primary order.
    pub fn best_fitness(&mut self, index: usize) -> Result<&G> {
        self.sort()?;
        self.individuals
            .get(index)
            .ok_or_else(|| out_of_range(index, self.individuals.len()))
    }

    /// The `index`-th best individual by raw score.
    pub fn best_raw(&mut self, index: usize) -> Result<&G> {
        self.sort()?;
        let len = self.individuals.len();
        self.raw_order
            .get(index)
            .map(|&i| &self.individuals[i])
            .ok_or_else(|| out_of_range(index, len))
    }

    /// Value used by selection: fitness when scaled, raw score otherwise.
    pub fn selection_key(&self, genome: &G) -> f64 {
        match self.sort_type {
            SortType::Scaled => genome.fitness(),
            SortType::Raw => genome.score(),
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn len(&self) -> usize {
        self.individuals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.individuals.is_empty()
    }

    /// Target size used by [`create`](Self::create) and the engine.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn set_size(&mut self, size: usize) {
        self.size = size;
    }

    pub fn sort_type(&self) -> SortType {
        self.sort_type
    }

    pub fn minimax(&self) -> Minimax {
        self.minimax
    }

    pub fn scaling(&self) -> &Scaling {
        &self.scaling
    }

    pub fn is_parallel(&self) -> bool {
        self.parallel
    }

    pub fn is_sorted(&self) -> bool {
        self.sorted
    }

    /// Last computed statistics (may be stale if [`statistics`](Self::statistics)
    /// has not run since the last change).
    pub fn stats(&self) -> &Statistics {
        &self.stats
    }

    pub fn get(&self, index: usize) -> Option<&G> {
        self.individuals.get(index)
    }

    /// Mutable access; invalidates statistics and ordering.
    pub fn get_mut(&mut self, index: usize) -> Option<&mut G> {
        self.clear_flags();
        self.individuals.get_mut(index)
    }

    pub fn individuals(&self) -> &[G] {
        &self.individuals
    }

    pub fn iter(&self) -> std::slice::Iter<'_, G> {
        self.individuals.iter()
    }

    pub fn push(&mut self, genome: G) {
        self.individuals.push(genome);
        self.clear_flags();
    }

    /// Replaces all individuals at once.
    pub fn replace(&mut self, individuals: Vec<G>) {
        self.individuals = individuals;
        self.clear_flags();
    }

    pub fn clear(&mut self) {
        self.individuals.clear();
        self.raw_order.clear();
        self.clear_flags();
    }

    /// Summary line: fitness and raw when scaled, raw only otherwise.
    pub fn stats_line(&mut self) -> Result<String> {
        let stats = *self.statistics()?;
        Ok(match self.sort_type {
            SortType::Scaled => stats.to_string(),
            SortType::Raw => stats.raw_line(),
        })
    }

    fn scores(&self) -> Vec<f64> {
        self.individuals.iter().map(Genome::score).collect()
    }

    fn clear_flags(&mut self) {
        self.statted = false;
        self.sorted = false;
    }
}

fn out_of_range(index: usize, len: usize) -> EvolveError {
    EvolveError::invalid(format!(
        "rank {index} is out of range for a population of {len}"
    ))
}

impl<'a, G: Genome> IntoIterator for &'a Population<G> {
    type Item = &'a G;
    type IntoIter = std::slice::Iter<'a, G>;

    fn into_iter(self) -> Self::IntoIter {
        self.individuals.iter()
    }
}
