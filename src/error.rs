//! Error types shared by genomes, operators, populations and the GA engine.

use thiserror::Error;

/// Errors raised by the evolutionary core.
///
/// Every variant is fatal for the operation that raised it. Failures of
/// external collaborators (statistics sinks, migration) are not represented
/// here; the engine logs and drops them.
#[derive(Debug, Error)]
pub enum EvolveError {
    /// A required parameter is missing or has an invalid value.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// An operator was applied to a genome that cannot support it.
    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    /// A scaling scheme that requires non-negative raw scores received a negative one.
    #[error("negative raw score {score} is not supported by {scheme} scaling")]
    NegativeScore {
        /// Name of the scaling scheme.
        scheme: &'static str,
        /// The offending raw score.
        score: f64,
    },

    /// The population holds no individuals.
    #[error("population is empty")]
    EmptyPopulation,

    /// A user evaluator reported a failure.
    #[error("evaluation failed: {0}")]
    Evaluation(String),

    /// Encoding or decoding an individual failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl EvolveError {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        EvolveError::Configuration(msg.into())
    }

    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        EvolveError::InvalidOperation(msg.into())
    }
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, EvolveError>;
