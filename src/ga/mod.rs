//! Generational genetic algorithm.
//!
//! [`SimpleGa`] evolves a [`Population`](crate::population::Population)
//! built from a prototype genome. The prototype carries the operators
//! (initializator, mutator, crossover, evaluator) and the operator
//! parameters; the engine only decides who reproduces and when to stop.
//!
//! # Key Types
//!
//! - [`GaConfig`]: loop parameters, serde-loadable, with `with_*` builders
//! - [`Selection`]: rank (default), tournament, roulette, uniform
//! - [`Termination`]: extra stopping rules (raw-score target, convergence,
//!   stagnation)
//! - [`SimpleGa`] / [`GaResult`]: the engine and its outcome
//!
//! # Collaborators
//!
//! Statistics sinks ([`StatsSink`]) and migration schemes
//! ([`MigrationScheme`]) are side channels. Their failures are reported as
//! [`CollaboratorError`], logged at warn level and never abort a run.
//!
//! # References
//!
//! - Holland (1975), *Adaptation in Natural and Artificial Systems*
//! - Goldberg (1989), *Genetic Algorithms in Search, Optimization, and Machine Learning*
//! - Cantú-Paz (2000), *Efficient and Accurate Parallel Genetic Algorithms*

mod config;
mod migration;
mod runner;
mod selection;
mod sink;

pub use config::{GaConfig, Termination};
pub use migration::{ChannelMigration, MigrationScheme};
pub use runner::{EngineState, GaResult, SimpleGa, TerminationReason};
pub use selection::Selection;
pub use sink::{GenerationRecord, HistorySink, LogSink, StatsSink};

/// Error type of external collaborators (sinks, migration).
pub type CollaboratorError = Box<dyn std::error::Error + Send + Sync>;
