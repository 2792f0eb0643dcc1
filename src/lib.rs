//! Evolutionary computation engine.
//!
//! Provides the building blocks of a generational genetic algorithm and of
//! tree-based genetic programming:
//!
//! - **Genomes**: list, matrix and tree representations, plus typed GP
//!   trees over a primitive set. Each genome carries its own operator
//!   slots (evaluator, initializator, mutator, crossover) and a map of
//!   named parameters.
//! - **Operators**: initializers, mutators and crossovers for every
//!   representation, including depth-bounded subtree crossover.
//! - **Population**: statistics, fitness scaling (linear, sigma
//!   truncation, power law, Boltzmann) and cached best-first sorting.
//! - **GA engine**: selection, elitism, stopping rules, statistics sinks
//!   and island migration over in-process channels.
//! - **Wire format**: serde-based encoding for shipping individuals between
//!   islands.
//!
//! # Quick Start
//!
//! ```
//! use u_evolve::ga::{GaConfig, SimpleGa};
//! use u_evolve::genome::{Genome, ListGenome};
//! use u_evolve::genome::params::{RANGE_MAX, RANGE_MIN};
//!
//! let mut proto = ListGenome::<i64>::integer(10);
//! proto.set_param(RANGE_MIN, 0);
//! proto.set_param(RANGE_MAX, 10);
//! proto.set_evaluator(|g: &ListGenome<i64>| g.iter().map(|&x| x as f64).sum());
//!
//! let config = GaConfig::default().with_generations(20).with_seed(7);
//! let mut ga = SimpleGa::new(proto, config).unwrap();
//! let result = ga.evolve().unwrap();
//! assert!(result.best_score > 0.0);
//! ```
//!
//! # Architecture
//!
//! The engine knows nothing about the problem: everything problem-specific
//! lives in the prototype genome handed to [`ga::SimpleGa`]. Randomness is
//! always threaded explicitly through a seeded [`random::EvoRng`].

pub mod error;
pub mod ga;
pub mod genome;
pub mod operators;
pub mod population;
pub mod random;
pub mod wire;

pub use error::{EvolveError, Result};
