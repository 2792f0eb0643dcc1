//! Genetic operators.
//!
//! Every operator is a small strategy type implementing one of the
//! [`Initializator`](crate::genome::Initializator),
//! [`Mutator`](crate::genome::Mutator) or
//! [`Crossover`](crate::genome::Crossover) traits for the genome
//! representations it supports. Operators are stateless apart from their
//! configuration; per-genome settings come from the genome's
//! [`Params`](crate::genome::Params).
//!
//! | Operator | List | Matrix | Tree | GP |
//! |----------|------|--------|------|----|
//! | [`IntegerInitializator`] / [`RealInitializator`] | yes | yes | yes | |
//! | [`BinaryInitializator`] | `bool` | `bool` | | |
//! | [`AlleleInitializator`] | yes | | | |
//! | [`GpInitializator`] | | | | yes |
//! | [`SwapMutator`] | yes | yes | yes | |
//! | [`IntegerGaussianMutator`] / [`RealGaussianMutator`] | yes | yes | yes | |
//! | [`RangeMutator`] | yes | | yes | |
//! | [`FlipMutator`] | `bool` | `bool` | | |
//! | [`AlleleMutator`] | yes | | | |
//! | [`GpSubtreeMutator`] / [`GpOperationMutator`] | | | | yes |
//! | [`SinglePointCrossover`] / [`TwoPointCrossover`] / [`OrderCrossover`] | yes | | | |
//! | [`UniformCrossover`] | yes | yes | | |
//! | [`SingleVerticalPointCrossover`] / [`SingleHorizontalPointCrossover`] | | yes | | |
//! | [`TreeSinglePointCrossover`] / [`TreeStrictCrossover`] | | | yes | yes |

mod crossovers;
mod initializators;
mod mutators;

pub use crossovers::{
    OrderCrossover, SingleHorizontalPointCrossover, SinglePointCrossover,
    SingleVerticalPointCrossover, StrictSearch, TreeSinglePointCrossover, TreeStrictCrossover,
    TwoPointCrossover, UniformCrossover,
};
pub use initializators::{
    AlleleInitializator, BinaryInitializator, GpInitializator, IntegerInitializator,
    RealInitializator,
};
pub use mutators::{
    AlleleMutator, FlipMutator, GpOperationMutator, GpSubtreeMutator, IntegerGaussianMutator,
    RangeMutator, RealGaussianMutator, SwapMutator,
};
