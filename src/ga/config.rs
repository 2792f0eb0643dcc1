//! GA configuration.
//!
//! [`GaConfig`] holds every parameter of the generational loop. It is
//! serde-enabled so a surrounding tool can load it from JSON; missing fields
//! take their defaults.

use super::selection::Selection;
use crate::error::{EvolveError, Result};
use crate::population::{Minimax, Scaling, SortType};
use serde::{Deserialize, Serialize};

/// Extra stopping rules checked after every generation, on top of the
/// generation limit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// Stop once the best raw score reaches the target (at or above it when
    /// maximizing, at or below when minimizing).
    RawScore(f64),
    /// Stop when every individual has the same raw score.
    Convergence,
    /// Stop after this many generations without a better best raw score.
    Stagnation(usize),
}

/// Configuration for the simple generational GA.
///
/// # Defaults
///
/// ```
/// use u_evolve::ga::{GaConfig, Selection};
///
/// let config = GaConfig::default();
/// assert_eq!(config.population_size, 80);
/// assert_eq!(config.generations, 100);
/// assert_eq!(config.selection, Selection::Rank);
/// ```
///
/// # Builder Pattern
///
/// ```
/// use u_evolve::ga::{GaConfig, Selection, Termination};
/// use u_evolve::population::Minimax;
///
/// let config = GaConfig::default()
///     .with_population_size(50)
///     .with_minimax(Minimax::Minimize)
///     .with_selection(Selection::Tournament(3))
///     .with_termination(Termination::RawScore(0.0))
///     .with_seed(42);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GaConfig {
    /// Number of individuals in every generation.
    pub population_size: usize,

    /// Maximum number of generations.
    pub generations: usize,

    /// Per-gene (or per-node) mutation probability.
    pub mutation_rate: f64,

    /// Probability of recombining a selected pair; otherwise the parents are
    /// cloned.
    pub crossover_rate: f64,

    /// Whether the best individuals are carried over unchanged.
    pub elitism: bool,

    /// How many individuals elitism carries over, ranked by raw score.
    pub elitism_count: usize,

    pub minimax: Minimax,

    pub selection: Selection,

    pub sort_type: SortType,

    pub scaling: Scaling,

    /// Evaluate on the rayon pool (requires the `parallel` feature).
    pub parallel: bool,

    /// Random seed for reproducibility. `None` uses a random seed.
    pub seed: Option<u64>,

    pub termination: Vec<Termination>,

    /// Log the population statistics every this many generations (0 = never).
    pub stats_frequency: usize,
}

impl Default for GaConfig {
    fn default() -> Self {
        Self {
            population_size: 80,
            generations: 100,
            mutation_rate: 0.02,
            crossover_rate: 0.9,
            elitism: true,
            elitism_count: 1,
            minimax: Minimax::default(),
            selection: Selection::default(),
            sort_type: SortType::default(),
            scaling: Scaling::default(),
            parallel: false,
            seed: None,
            termination: Vec::new(),
            stats_frequency: 0,
        }
    }
}

impl GaConfig {
    pub fn with_population_size(mut self, n: usize) -> Self {
        self.population_size = n;
        self
    }

    pub fn with_generations(mut self, n: usize) -> Self {
        self.generations = n;
        self
    }

    /// Sets the mutation rate, clamped to `[0, 1]`.
    pub fn with_mutation_rate(mut self, rate: f64) -> Self {
        self.mutation_rate = rate.clamp(0.0, 1.0);
        self
    }

    /// Sets the crossover rate, clamped to `[0, 1]`.
    pub fn with_crossover_rate(mut self, rate: f64) -> Self {
        self.crossover_rate = rate.clamp(0.0, 1.0);
        self
    }

    pub fn with_elitism(mut self, elitism: bool) -> Self {
        self.elitism = elitism;
        self
    }

    /// Sets the elite count and turns elitism on (or off for zero).
    pub fn with_elitism_count(mut self, count: usize) -> Self {
        self.elitism_count = count;
        self.elitism = count > 0;
        self
    }

    pub fn with_minimax(mut self, minimax: Minimax) -> Self {
        self.minimax = minimax;
        self
    }

    pub fn with_selection(mut self, selection: Selection) -> Self {
        self.selection = selection;
        self
    }

    pub fn with_sort_type(mut self, sort_type: SortType) -> Self {
        self.sort_type = sort_type;
        self
    }

    pub fn with_scaling(mut self, scaling: Scaling) -> Self {
        self.scaling = scaling;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Adds a stopping rule.
    pub fn with_termination(mut self, rule: Termination) -> Self {
        self.termination.push(rule);
        self
    }

    pub fn with_stats_frequency(mut self, every: usize) -> Self {
        self.stats_frequency = every;
        self
    }

    /// Elites carried per generation.
    pub fn elite_count(&self) -> usize {
        if self.elitism {
            self.elitism_count
        } else {
            0
        }
    }

    /// Parses a JSON configuration; absent fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    /// Returns [`EvolveError::Configuration`] describing the first invalid
    /// parameter.
    pub fn validate(&self) -> Result<()> {
        if self.population_size < 2 {
            return Err(EvolveError::config("population_size must be at least 2"));
        }
        if self.generations == 0 {
            return Err(EvolveError::config("generations must be at least 1"));
        }
        if !(0.0..=1.0).contains(&self.mutation_rate) {
            return Err(EvolveError::config("mutation_rate must be in [0, 1]"));
        }
        if !(0.0..=1.0).contains(&self.crossover_rate) {
            return Err(EvolveError::config("crossover_rate must be in [0, 1]"));
        }
        if self.elite_count() >= self.population_size {
            return Err(EvolveError::config(
                "elitism_count too high: elites fill the entire population",
            ));
        }
        if let Selection::Tournament(0) = self.selection {
            return Err(EvolveError::config("tournament size must be at least 1"));
        }
        if let Scaling::Boltzmann(b) = &self.scaling {
            if b.min_temperature.is_nan() || b.min_temperature <= 0.0 || b.factor < 0.0 {
                return Err(EvolveError::config(
                    "boltzmann scaling needs a positive minimum temperature and a non-negative factor",
                ));
            }
        }
        for rule in &self.termination {
            if let Termination::Stagnation(0) = rule {
                return Err(EvolveError::config("stagnation limit must be at least 1"));
            }
        }
        Ok(())
    }
}
