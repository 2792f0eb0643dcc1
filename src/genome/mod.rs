//! Genome representations and the operator-slot contract.
//!
//! A genome carries a raw `score`, a scaled `fitness`, a map of named
//! [`Params`] and four operator slots. Each slot is an ordered list of
//! strategies:
//!
//! - **evaluator**: every strategy contributes to the raw score (sum)
//! - **initializator**: applied in order to build a genome from scratch
//! - **mutator**: applied in order; returns the number of mutations
//! - **crossover**: folded in order over a pair of parents
//!
//! Clones share the slot contents (strategies are reference counted), so a
//! prototype configured once is cloned into a whole population.
//!
//! # Representations
//!
//! - [`ListGenome`]: fixed-length sequence of alleles
//! - [`MatrixGenome`]: fixed-size 2D grid of alleles
//! - [`TreeGenome`]: rooted ordered tree with a flattened node index
//! - [`GpTree`]: typed tree over a [`PrimitiveSet`] for genetic programming

mod gp;
mod list;
mod matrix;
pub mod params;
mod tree;

pub use gp::{build_gp_tree, GpNode, GpTree, Instruction, NodeType, PrimitiveSet, Program};
pub use list::{AlleleGenerator, AlleleList, AlleleRange, Alleles, ListGenome};
pub use matrix::MatrixGenome;
pub use params::{ParamValue, Params};
pub use tree::{build_tree, DataMut, NodeRecord, PreOrder, TreeGenome, TreeMethod, TreeNode};

use crate::error::Result;
use crate::random::{self, EvoRng};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Up to two children produced by a crossover: `(sister, brother)`.
pub type Offspring<G> = (Option<G>, Option<G>);

/// Computes the raw score of a genome.
///
/// Closures `Fn(&G) -> f64` implement this trait directly. Implement it by
/// hand when the evaluation can fail; the error aborts the run.
pub trait Evaluator<G>: Send + Sync {
    fn evaluate(&self, genome: &G) -> Result<f64>;
}

impl<G, F> Evaluator<G> for F
where
    F: Fn(&G) -> f64 + Send + Sync,
{
    fn evaluate(&self, genome: &G) -> Result<f64> {
        Ok(self(genome))
    }
}

/// Fills a genome with random content.
pub trait Initializator<G>: Send + Sync {
    fn initialize(&self, genome: &mut G, rng: &mut EvoRng) -> Result<()>;
}

/// Perturbs a genome in place.
pub trait Mutator<G>: Send + Sync {
    /// Applies the mutation with probability `pmut` and returns how many
    /// genes/nodes changed.
    fn mutate(&self, genome: &mut G, pmut: f64, rng: &mut EvoRng) -> Result<usize>;
}

/// Recombines two parents.
pub trait Crossover<G>: Send + Sync {
    /// Produces the sister when `count >= 1` and the brother when
    /// `count == 2`. Some operators always return both.
    fn cross(&self, mom: &G, dad: &G, count: usize, rng: &mut EvoRng) -> Result<Offspring<G>>;
}

/// An ordered list of strategies.
///
/// When `random_apply` is set, each application picks one strategy at random
/// instead of running all of them.
pub struct Slot<T: ?Sized> {
    name: &'static str,
    items: Vec<Arc<T>>,
    random_apply: bool,
}

impl<T: ?Sized> Clone for Slot<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            items: self.items.clone(),
            random_apply: self.random_apply,
        }
    }
}

impl<T: ?Sized> fmt::Debug for Slot<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Slot [{}] ({} strategies", self.name, self.items.len())?;
        if self.random_apply {
            write!(f, ", random apply")?;
        }
        write!(f, ")")
    }
}

impl<T: ?Sized> Slot<T> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            items: Vec::new(),
            random_apply: false,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Replaces the slot content with a single strategy.
    pub fn set(&mut self, item: Arc<T>) {
        self.items.clear();
        self.items.push(item);
    }

    /// Appends a strategy.
    pub fn add(&mut self, item: Arc<T>) {
        self.items.push(item);
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<T>> {
        self.items.iter()
    }

    pub fn set_random_apply(&mut self, flag: bool) {
        self.random_apply = flag;
    }

    pub fn random_apply(&self) -> bool {
        self.random_apply
    }

    /// The strategies to run for one application.
    pub(crate) fn select(&self, rng: &mut EvoRng) -> Vec<Arc<T>> {
        if self.random_apply {
            random::choose(rng, &self.items).cloned().into_iter().collect()
        } else {
            self.items.clone()
        }
    }
}

/// The four operator slots of a genome.
pub struct Operators<G> {
    pub evaluator: Slot<dyn Evaluator<G>>,
    pub initializator: Slot<dyn Initializator<G>>,
    pub mutator: Slot<dyn Mutator<G>>,
    pub crossover: Slot<dyn Crossover<G>>,
}

impl<G> Default for Operators<G> {
    fn default() -> Self {
        Self {
            evaluator: Slot::new("Evaluator"),
            initializator: Slot::new("Initializator"),
            mutator: Slot::new("Mutator"),
            crossover: Slot::new("Crossover"),
        }
    }
}

impl<G> Clone for Operators<G> {
    fn clone(&self) -> Self {
        Self {
            evaluator: self.evaluator.clone(),
            initializator: self.initializator.clone(),
            mutator: self.mutator.clone(),
            crossover: self.crossover.clone(),
        }
    }
}

impl<G> fmt::Debug for Operators<G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entry(&self.evaluator)
            .entry(&self.initializator)
            .entry(&self.mutator)
            .entry(&self.crossover)
            .finish()
    }
}

/// State shared by every representation: scores, parameters, operator slots.
///
/// Only the scores and parameters are serialized. Operator slots hold
/// code and are re-attached from a prototype after decoding.
#[derive(Serialize, Deserialize)]
#[serde(bound = "")]
pub struct GenomeBase<G> {
    score: f64,
    fitness: f64,
    params: Params,
    #[serde(skip)]
    operators: Operators<G>,
}

impl<G> Default for GenomeBase<G> {
    fn default() -> Self {
        Self {
            score: 0.0,
            fitness: 0.0,
            params: Params::new(),
            operators: Operators::default(),
        }
    }
}

impl<G> Clone for GenomeBase<G> {
    fn clone(&self) -> Self {
        Self {
            score: self.score,
            fitness: self.fitness,
            params: self.params.clone(),
            operators: self.operators.clone(),
        }
    }
}

impl<G> fmt::Debug for GenomeBase<G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenomeBase")
            .field("score", &self.score)
            .field("fitness", &self.fitness)
            .field("params", &self.params)
            .field("operators", &self.operators)
            .finish()
    }
}

/// A candidate solution.
///
/// Implementors only provide access to their [`GenomeBase`]; scoring,
/// initialization, mutation and crossover are driven through the operator
/// slots by the provided methods.
pub trait Genome: Clone + Send + Sync + 'static {
    fn base(&self) -> &GenomeBase<Self>;

    fn base_mut(&mut self) -> &mut GenomeBase<Self>;

    /// Rebuilds derived state after the genome was decoded.
    fn rebuild(&mut self) {}

    /// Copies the operator slots (and any other non-serialized configuration)
    /// from `prototype`.
    fn adopt_operators(&mut self, prototype: &Self) {
        self.base_mut().operators = prototype.base().operators.clone();
    }

    fn score(&self) -> f64 {
        self.base().score
    }

    fn set_score(&mut self, score: f64) {
        self.base_mut().score = score;
    }

    fn fitness(&self) -> f64 {
        self.base().fitness
    }

    fn set_fitness(&mut self, fitness: f64) {
        self.base_mut().fitness = fitness;
    }

    /// Clears score and fitness.
    fn reset_stats(&mut self) {
        let base = self.base_mut();
        base.score = 0.0;
        base.fitness = 0.0;
    }

    fn params(&self) -> &Params {
        &self.base().params
    }

    fn params_mut(&mut self) -> &mut Params {
        &mut self.base_mut().params
    }

    fn set_param(&mut self, key: &str, value: impl Into<ParamValue>) {
        self.base_mut().params.set(key, value);
    }

    fn operators(&self) -> &Operators<Self> {
        &self.base().operators
    }

    fn operators_mut(&mut self) -> &mut Operators<Self> {
        &mut self.base_mut().operators
    }

    fn set_evaluator<E: Evaluator<Self> + 'static>(&mut self, evaluator: E) {
        self.operators_mut().evaluator.set(Arc::new(evaluator));
    }

    fn add_evaluator<E: Evaluator<Self> + 'static>(&mut self, evaluator: E) {
        self.operators_mut().evaluator.add(Arc::new(evaluator));
    }

    fn set_initializator<I: Initializator<Self> + 'static>(&mut self, init: I) {
        self.operators_mut().initializator.set(Arc::new(init));
    }

    fn add_initializator<I: Initializator<Self> + 'static>(&mut self, init: I) {
        self.operators_mut().initializator.add(Arc::new(init));
    }

    fn set_mutator<M: Mutator<Self> + 'static>(&mut self, mutator: M) {
        self.operators_mut().mutator.set(Arc::new(mutator));
    }

    fn add_mutator<M: Mutator<Self> + 'static>(&mut self, mutator: M) {
        self.operators_mut().mutator.add(Arc::new(mutator));
    }

    fn set_crossover<C: Crossover<Self> + 'static>(&mut self, crossover: C) {
        self.operators_mut().crossover.set(Arc::new(crossover));
    }

    fn add_crossover<C: Crossover<Self> + 'static>(&mut self, crossover: C) {
        self.operators_mut().crossover.add(Arc::new(crossover));
    }

    /// Resets the scores and sets the raw score to the sum of all evaluators.
    fn evaluate(&mut self) -> Result<f64> {
        self.reset_stats();
        let evaluators = self.operators().evaluator.clone();
        let mut total = 0.0;
        for evaluator in evaluators.iter() {
            total += evaluator.evaluate(self)?;
        }
        self.base_mut().score = total;
        Ok(total)
    }

    /// Runs the initializator slot.
    fn initialize(&mut self, rng: &mut EvoRng) -> Result<()> {
        let inits = self.operators().initializator.select(rng);
        for init in inits {
            init.initialize(self, rng)?;
        }
        Ok(())
    }

    /// Runs the mutator slot and returns the total number of mutations.
    fn mutate(&mut self, pmut: f64, rng: &mut EvoRng) -> Result<usize> {
        let mutators = self.operators().mutator.select(rng);
        let mut mutations = 0;
        for mutator in mutators {
            mutations += mutator.mutate(self, pmut, rng)?;
        }
        Ok(mutations)
    }

    /// Recombines `self` (mom) with `dad`.
    ///
    /// With several crossover strategies the offspring of one step become
    /// the parents of the next. An empty slot yields plain clones.
    fn crossover(&self, dad: &Self, count: usize, rng: &mut EvoRng) -> Result<Offspring<Self>> {
        let strategies = self.operators().crossover.select(rng);
        let Some((last, chain)) = strategies.split_last() else {
            return Ok(clone_offspring(self, dad, count));
        };

        let mut mom = self.clone();
        let mut dad = dad.clone();
        for strategy in chain {
            let (sister, brother) = strategy.cross(&mom, &dad, 2, rng)?;
            if let Some(s) = sister {
                mom = s;
            }
            if let Some(b) = brother {
                dad = b;
            }
        }
        last.cross(&mom, &dad, count, rng)
    }
}

/// Offspring made of score-reset clones of the parents.
pub fn clone_offspring<G: Genome>(mom: &G, dad: &G, count: usize) -> Offspring<G> {
    let sister = (count >= 1).then(|| {
        let mut s = mom.clone();
        s.reset_stats();
        s
    });
    let brother = (count >= 2).then(|| {
        let mut b = dad.clone();
        b.reset_stats();
        b
    });
    (sister, brother)
}
