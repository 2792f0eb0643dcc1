//! Parent selection.
//!
//! Selection works on a population that has already been sorted best-first
//! ([`Population::sort`]). The compared value is the one the population
//! orders by: scaled fitness, or the raw score with [`SortType::Raw`]
//! (see [`Population::selection_key`]).
//!
//! # References
//!
//! - Baker (1985), "Adaptive Selection Methods for Genetic Algorithms"
//! - Blickle & Thiele (1996), "A Comparison of Selection Schemes used in
//!   Evolutionary Algorithms"
//!
//! [`SortType::Raw`]: crate::population::SortType::Raw

use crate::error::{EvolveError, Result};
use crate::genome::Genome;
use crate::population::{Minimax, Population};
use crate::random::{self, EvoRng};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Selection strategy for choosing parents.
///
/// # Examples
///
/// ```
/// use u_evolve::ga::Selection;
///
/// // Linear ranking over the sorted population (default)
/// let sel = Selection::default();
/// assert_eq!(sel, Selection::Rank);
///
/// // Tournament with size 3
/// let sel = Selection::Tournament(3);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Selection {
    /// Linear ranking: position `i` of `n` (best first) has weight `n - i`.
    ///
    /// # Complexity
    /// O(n) per selection
    #[default]
    Rank,

    /// Pick `k` individuals at random, keep the best.
    ///
    /// # Complexity
    /// O(k) per selection
    Tournament(usize),

    /// Fitness-proportionate selection.
    ///
    /// When maximizing the weight is the value itself (shifted up if any
    /// value is negative). When minimizing it is `max - value + epsilon`.
    ///
    /// # Complexity
    /// O(n) per selection
    Roulette,

    /// Uniform random pick, no selection pressure.
    Uniform,
}

impl Selection {
    /// Selects a parent and returns its index in `population`.
    ///
    /// # Errors
    /// Returns [`EvolveError::EmptyPopulation`] for an empty population.
    pub fn select<G: Genome>(&self, population: &Population<G>, rng: &mut EvoRng) -> Result<usize> {
        let n = population.len();
        if n == 0 {
            return Err(EvolveError::EmptyPopulation);
        }
        if n == 1 {
            return Ok(0);
        }

        let minimax = population.minimax();
        Ok(match self {
            Selection::Rank => rank(n, rng),
            Selection::Tournament(k) => {
                let individuals = population.individuals();
                tournament(n, |i| population.selection_key(&individuals[i]), *k, minimax, rng)
            }
            Selection::Roulette => {
                let keys: Vec<f64> = population
                    .iter()
                    .map(|g| population.selection_key(g))
                    .collect();
                roulette(&keys, minimax, rng)
            }
            Selection::Uniform => rng.random_range(0..n),
        })
    }
}

/// Assumes positions are already ranked best-first.
fn rank(n: usize, rng: &mut EvoRng) -> usize {
    let total = (n * (n + 1)) as f64 / 2.0;
    let threshold = rng.random_range(0.0..total);
    let mut cumulative = 0.0;
    for pos in 0..n {
        cumulative += (n - pos) as f64;
        if cumulative > threshold {
            return pos;
        }
    }
    n - 1 // floating-point fallback
}

fn tournament<F>(n: usize, key: F, k: usize, minimax: Minimax, rng: &mut EvoRng) -> usize
where
    F: Fn(usize) -> f64,
{
    let mut best = rng.random_range(0..n);
    let mut best_key = key(best);
    for _ in 1..k.max(1) {
        let idx = rng.random_range(0..n);
        let idx_key = key(idx);
        if minimax.is_better(idx_key, best_key) {
            best = idx;
            best_key = idx_key;
        }
    }
    best
}

fn roulette(keys: &[f64], minimax: Minimax, rng: &mut EvoRng) -> usize {
    const EPSILON: f64 = 1e-10;

    let weights: Vec<f64> = match minimax {
        Minimax::Maximize => {
            let min = keys.iter().copied().fold(f64::INFINITY, f64::min);
            let shift = if min < 0.0 { -min + EPSILON } else { 0.0 };
            keys.iter().map(|k| k + shift).collect()
        }
        Minimax::Minimize => {
            let max = keys.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            keys.iter().map(|k| (max - k + EPSILON).max(EPSILON)).collect()
        }
    };

    // choose_weighted only returns None for an empty slice
    random::choose_weighted(rng, &weights).unwrap_or(0)
}
