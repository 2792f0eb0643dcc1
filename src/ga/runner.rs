//! The generational loop.
//!
//! [`SimpleGa`] drives a population through
//! `Created -> Initialized -> (evaluate, scale/sort, reproduce)* -> Terminated`.
//! Each [`step`](SimpleGa::step) builds a complete new generation before the
//! old one is replaced; generations never overlap.

use super::config::{GaConfig, Termination};
use super::migration::MigrationScheme;
use super::sink::StatsSink;
use crate::error::{EvolveError, Result};
use crate::genome::{clone_offspring, Genome};
use crate::population::{Population, Statistics};
use crate::random::{self, create_rng, EvoRng};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Lifecycle of an engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineState {
    Created,
    Initialized,
    Terminated,
}

/// Why a run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TerminationReason {
    /// The configured generation count was reached.
    Generations,
    /// The best raw score reached the [`Termination::RawScore`] target.
    TargetReached,
    /// Every individual had the same raw score.
    Converged,
    /// No raw-score improvement for the configured number of generations.
    Stagnated,
    /// The cancellation flag was set.
    Cancelled,
}

/// Result of a GA run.
#[derive(Debug, Clone)]
pub struct GaResult<G> {
    /// Best individual by raw score in the final population.
    pub best: G,

    /// Raw score of `best`.
    pub best_score: f64,

    /// Generations executed.
    pub generations: usize,

    pub reason: TerminationReason,

    /// Best raw score after initialization and after every generation.
    pub best_raw_history: Vec<f64>,

    /// Statistics of the final population.
    pub statistics: Statistics,
}

/// Simple generational genetic algorithm.
///
/// # Usage
///
/// ```
/// use u_evolve::ga::{GaConfig, SimpleGa};
/// use u_evolve::genome::{Genome, ListGenome};
/// use u_evolve::population::Minimax;
///
/// let mut proto = ListGenome::<i64>::integer(8);
/// proto.set_param("rangemin", 0);
/// proto.set_param("rangemax", 9);
/// proto.set_evaluator(|g: &ListGenome<i64>| g.iter().map(|&x| (x * x) as f64).sum());
///
/// let config = GaConfig::default()
///     .with_population_size(20)
///     .with_generations(10)
///     .with_minimax(Minimax::Minimize)
///     .with_seed(42);
///
/// let mut ga = SimpleGa::new(proto, config).unwrap();
/// let result = ga.evolve().unwrap();
/// assert_eq!(result.generations, 10);
/// ```
pub struct SimpleGa<G: Genome> {
    config: GaConfig,
    prototype: G,
    population: Population<G>,
    rng: EvoRng,
    generation: usize,
    state: EngineState,
    sinks: Vec<Box<dyn StatsSink<G>>>,
    migration: Option<Box<dyn MigrationScheme<G>>>,
    best_raw_history: Vec<f64>,
    stagnation: usize,
    reason: Option<TerminationReason>,
}

impl<G: Genome> SimpleGa<G> {
    /// Creates an engine around a configured prototype genome.
    ///
    /// # Errors
    /// Returns [`EvolveError::Configuration`] if the configuration is invalid.
    pub fn new(prototype: G, config: GaConfig) -> Result<Self> {
        config.validate()?;

        let rng = match config.seed {
            Some(seed) => create_rng(seed),
            None => create_rng(rand::random()),
        };

        let population = Population::new(config.population_size)
            .with_sort_type(config.sort_type)
            .with_minimax(config.minimax)
            .with_scaling(config.scaling)
            .with_parallel(config.parallel);

        Ok(Self {
            best_raw_history: Vec::with_capacity(config.generations + 1),
            config,
            prototype,
            population,
            rng,
            generation: 0,
            state: EngineState::Created,
            sinks: Vec::new(),
            migration: None,
            stagnation: 0,
            reason: None,
        })
    }

    /// Registers a statistics sink.
    pub fn add_sink<S: StatsSink<G> + 'static>(&mut self, sink: S) {
        self.sinks.push(Box::new(sink));
    }

    /// Installs a migration scheme.
    pub fn set_migration<M: MigrationScheme<G> + 'static>(&mut self, migration: M) {
        self.migration = Some(Box::new(migration));
    }

    pub fn config(&self) -> &GaConfig {
        &self.config
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Completed generations.
    pub fn generation(&self) -> usize {
        self.generation
    }

    pub fn population(&self) -> &Population<G> {
        &self.population
    }

    pub fn best_raw_history(&self) -> &[f64] {
        &self.best_raw_history
    }

    pub fn termination_reason(&self) -> Option<TerminationReason> {
        self.reason
    }

    /// Best individual by raw score in the current population.
    pub fn best_individual(&mut self) -> Result<&G> {
        self.population.best_raw(0)
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Builds, initializes, evaluates and sorts the first generation.
    pub fn initialize(&mut self) -> Result<()> {
        self.population.create(&self.prototype);
        self.population.initialize(&mut self.rng)?;
        self.population.evaluate()?;
        self.population.sort()?;

        self.generation = 0;
        self.stagnation = 0;
        self.reason = None;
        self.best_raw_history.clear();
        let best = self.population.best_raw(0)?.score();
        self.best_raw_history.push(best);

        self.state = EngineState::Initialized;
        self.report()?;
        Ok(())
    }

    /// Runs one generation and returns `true` once the run should stop.
    ///
    /// # Errors
    /// Any operator, evaluator or scaling error aborts the step; the current
    /// population is left untouched in that case.
    pub fn step(&mut self) -> Result<bool> {
        match self.state {
            EngineState::Created => {
                return Err(EvolveError::invalid("step() called before initialize()"))
            }
            EngineState::Terminated => return Ok(true),
            EngineState::Initialized => {}
        }

        let previous_best = self.population.best_raw(0)?.score();
        let next = self.reproduce()?;

        let mut population = self.population.empty_like();
        population.replace(next);
        population.evaluate()?;
        population.sort()?;
        self.population = population;
        self.generation += 1;

        if let Some(migration) = self.migration.as_mut() {
            if let Err(e) = migration.exchange(&mut self.population, self.generation) {
                log::warn!("migration failed at generation {}: {e}", self.generation);
            }
            // migrants may have replaced individuals
            self.population.sort()?;
        }

        let best = self.population.best_raw(0)?.score();
        if self.config.minimax.is_better(best, previous_best) {
            self.stagnation = 0;
        } else {
            self.stagnation += 1;
        }
        self.best_raw_history.push(best);

        self.report()?;

        if let Some(reason) = self.check_termination(best)? {
            self.reason = Some(reason);
            self.state = EngineState::Terminated;
            return Ok(true);
        }
        Ok(false)
    }

    /// Runs until a termination criterion is met.
    pub fn evolve(&mut self) -> Result<GaResult<G>> {
        self.run(None)
    }

    /// Runs until a termination criterion is met or `cancel` is set.
    ///
    /// The flag is checked between generations; a generation in progress is
    /// always completed.
    pub fn evolve_with_cancel(&mut self, cancel: Arc<AtomicBool>) -> Result<GaResult<G>> {
        self.run(Some(cancel))
    }

    fn run(&mut self, cancel: Option<Arc<AtomicBool>>) -> Result<GaResult<G>> {
        if self.state == EngineState::Created {
            self.initialize()?;
        }

        while self.state != EngineState::Terminated {
            if let Some(flag) = &cancel {
                if flag.load(Ordering::Relaxed) {
                    self.reason = Some(TerminationReason::Cancelled);
                    self.state = EngineState::Terminated;
                    break;
                }
            }
            self.step()?;
        }

        log::info!(
            "evolution stopped after {} generations ({:?})",
            self.generation,
            self.reason
        );
        self.result()
    }

    fn result(&mut self) -> Result<GaResult<G>> {
        let statistics = *self.population.statistics()?;
        let best = self.population.best_raw(0)?.clone();
        Ok(GaResult {
            best_score: best.score(),
            best,
            generations: self.generation,
            reason: self.reason.unwrap_or(TerminationReason::Generations),
            best_raw_history: self.best_raw_history.clone(),
            statistics,
        })
    }

    // ========================================================================
    // Generation internals
    // ========================================================================

    /// Elites plus offspring, `population_size` individuals in total.
    fn reproduce(&mut self) -> Result<Vec<G>> {
        let size = self.config.population_size;
        let elites = self.config.elite_count().min(self.population.len());
        let mut next: Vec<G> = Vec::with_capacity(size);

        for rank in 0..elites {
            next.push(self.population.best_raw(rank)?.clone());
        }

        // selection reads the scaled/sorted order computed above
        self.population.sort()?;
        while next.len() < size {
            let mom_idx = self.config.selection.select(&self.population, &mut self.rng)?;
            let dad_idx = self.config.selection.select(&self.population, &mut self.rng)?;
            let (mom, dad) = match (self.population.get(mom_idx), self.population.get(dad_idx)) {
                (Some(m), Some(d)) => (m, d),
                _ => return Err(EvolveError::invalid("selection returned an index out of range")),
            };

            let wanted = (size - next.len()).min(2);
            let (sister, brother) = if random::flip_coin(&mut self.rng, self.config.crossover_rate) {
                mom.crossover(dad, wanted, &mut self.rng)?
            } else {
                clone_offspring(mom, dad, wanted)
            };
            if sister.is_none() && brother.is_none() {
                return Err(EvolveError::invalid("crossover produced no offspring"));
            }

            for mut child in [sister, brother].into_iter().flatten() {
                if next.len() >= size {
                    break;
                }
                child.mutate(self.config.mutation_rate, &mut self.rng)?;
                next.push(child);
            }
        }
        Ok(next)
    }

    /// Logs and feeds sinks for the current generation.
    fn report(&mut self) -> Result<()> {
        let stats = *self.population.statistics()?;
        let generation = self.generation;

        let every = self.config.stats_frequency;
        if every > 0 && generation % every == 0 {
            log::info!("Gen. {generation}: {}", self.population.stats_line()?);
        }

        for sink in &mut self.sinks {
            let every = sink.frequency();
            if every == 0 || generation % every != 0 {
                continue;
            }
            if let Err(e) = sink.record(generation, &stats, &self.population) {
                log::warn!("statistics sink failed at generation {generation}: {e}");
            }
        }
        Ok(())
    }

    fn check_termination(&mut self, best: f64) -> Result<Option<TerminationReason>> {
        for rule in &self.config.termination {
            let hit = match *rule {
                Termination::RawScore(target) => {
                    best == target || self.config.minimax.is_better(best, target)
                }
                Termination::Convergence => {
                    let stats = self.population.statistics()?;
                    stats.raw_min == stats.raw_max
                }
                Termination::Stagnation(limit) => self.stagnation >= limit,
            };
            if hit {
                return Ok(Some(match rule {
                    Termination::RawScore(_) => TerminationReason::TargetReached,
                    Termination::Convergence => TerminationReason::Converged,
                    Termination::Stagnation(_) => TerminationReason::Stagnated,
                }));
            }
        }

        if self.generation >= self.config.generations {
            return Ok(Some(TerminationReason::Generations));
        }
        Ok(None)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ga::{HistorySink, Selection};
    use crate::genome::params::{GAUSS_SIGMA, MAX_DEPTH, METHOD, RANGE_MAX, RANGE_MIN};
    use crate::genome::{GpTree, ListGenome, PrimitiveSet, Program, TreeMethod};
    use crate::operators::{
        GpInitializator, GpSubtreeMutator, IntegerGaussianMutator, TreeStrictCrossover,
    };
    use crate::population::{Minimax, Scaling, SortType};

    /// `sum((x_i - 5)^2)` over a length-10 integer list in `[0, 10]`.
    fn target_five() -> ListGenome<i64> {
        let mut g = ListGenome::<i64>::integer(10);
        g.set_param(RANGE_MIN, 0);
        g.set_param(RANGE_MAX, 10);
        g.set_param(GAUSS_SIGMA, 1.5);
        g.set_mutator(IntegerGaussianMutator);
        g.set_evaluator(|g: &ListGenome<i64>| {
            g.iter().map(|&x| ((x - 5) * (x - 5)) as f64).sum()
        });
        g
    }

    fn target_config() -> GaConfig {
        GaConfig::default()
            .with_population_size(50)
            .with_generations(200)
            .with_mutation_rate(0.05)
            .with_crossover_rate(0.8)
            .with_elitism_count(1)
            .with_minimax(Minimax::Minimize)
            .with_seed(42)
    }

    // ---- Elitist monotonicity ----

    #[test]
    fn test_best_raw_never_worsens_with_elitism() {
        let mut ga = SimpleGa::new(target_five(), target_config()).unwrap();
        let result = ga.evolve().unwrap();

        assert_eq!(result.generations, 200);
        assert_eq!(result.reason, TerminationReason::Generations);
        assert_eq!(result.best_raw_history.len(), 201);
        for w in result.best_raw_history.windows(2) {
            assert!(w[1] <= w[0], "best raw got worse: {} -> {}", w[0], w[1]);
        }
        assert!(
            result.best_score < result.best_raw_history[0] || result.best_score == 0.0,
            "no progress: {:?}",
            &result.best_raw_history[..5]
        );
        assert!(result.best_score <= 5.0, "best raw {}", result.best_score);
    }

    #[test]
    fn test_every_selection_and_scaling_runs() {
        for selection in [
            Selection::Rank,
            Selection::Tournament(3),
            Selection::Roulette,
            Selection::Uniform,
        ] {
            for scaling in [
                Scaling::linear(),
                Scaling::sigma_truncation(),
                Scaling::power_law(),
                Scaling::boltzmann(),
            ] {
                let config = target_config()
                    .with_generations(15)
                    .with_selection(selection)
                    .with_scaling(scaling);
                let mut ga = SimpleGa::new(target_five(), config).unwrap();
                let result = ga.evolve().unwrap();
                assert_eq!(result.generations, 15, "{selection:?} / {scaling:?}");
                assert!(result.best_score <= result.best_raw_history[0]);
            }
        }
    }

    #[test]
    fn test_raw_sort_type() {
        let config = target_config()
            .with_generations(30)
            .with_sort_type(SortType::Raw);
        let mut ga = SimpleGa::new(target_five(), config).unwrap();
        let result = ga.evolve().unwrap();
        assert!(result.best_score < result.best_raw_history[0]);
    }

    #[test]
    fn test_same_seed_same_run() {
        let a = SimpleGa::new(target_five(), target_config().with_generations(20))
            .unwrap()
            .evolve()
            .unwrap();
        let b = SimpleGa::new(target_five(), target_config().with_generations(20))
            .unwrap()
            .evolve()
            .unwrap();
        assert_eq!(a.best_raw_history, b.best_raw_history);
        assert_eq!(a.best.as_slice(), b.best.as_slice());
    }

    // ---- Lifecycle ----

    #[test]
    fn test_step_before_initialize_is_error() {
        let mut ga = SimpleGa::new(target_five(), target_config()).unwrap();
        assert_eq!(ga.state(), EngineState::Created);
        assert!(matches!(ga.step(), Err(EvolveError::InvalidOperation(_))));

        ga.initialize().unwrap();
        assert_eq!(ga.state(), EngineState::Initialized);
        assert!(!ga.step().unwrap());
        assert_eq!(ga.generation(), 1);
        assert_eq!(ga.population().len(), 50);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = target_config().with_population_size(1);
        assert!(matches!(
            SimpleGa::new(target_five(), config),
            Err(EvolveError::Configuration(_))
        ));
    }

    #[test]
    fn test_evaluator_failure_aborts_run() {
        struct Failing;
        impl crate::genome::Evaluator<ListGenome<i64>> for Failing {
            fn evaluate(&self, _: &ListGenome<i64>) -> Result<f64> {
                Err(EvolveError::Evaluation("domain error".into()))
            }
        }
        let mut proto = target_five();
        proto.set_evaluator(Failing);
        let mut ga = SimpleGa::new(proto, target_config()).unwrap();
        assert!(matches!(ga.evolve(), Err(EvolveError::Evaluation(_))));
    }

    #[test]
    fn test_barren_crossover_is_error() {
        struct Barren;
        impl crate::genome::Crossover<ListGenome<i64>> for Barren {
            fn cross(
                &self,
                _: &ListGenome<i64>,
                _: &ListGenome<i64>,
                _: usize,
                _: &mut EvoRng,
            ) -> Result<crate::genome::Offspring<ListGenome<i64>>> {
                Ok((None, None))
            }
        }
        let mut proto = target_five();
        proto.set_crossover(Barren);
        let config = target_config()
            .with_population_size(10)
            .with_generations(2)
            .with_crossover_rate(1.0);
        let mut ga = SimpleGa::new(proto, config).unwrap();
        assert!(matches!(ga.evolve(), Err(EvolveError::InvalidOperation(_))));
    }

    // ---- Termination ----

    #[test]
    fn test_target_reached() {
        let config = target_config().with_termination(Termination::RawScore(10.0));
        let mut ga = SimpleGa::new(target_five(), config).unwrap();
        let result = ga.evolve().unwrap();
        assert_eq!(result.reason, TerminationReason::TargetReached);
        assert!(result.best_score <= 10.0);
        assert!(result.generations < 200);
    }

    #[test]
    fn test_convergence() {
        // constant evaluator: every generation is converged
        let mut proto = target_five();
        proto.set_evaluator(|_: &ListGenome<i64>| 1.0);
        let config = target_config().with_termination(Termination::Convergence);
        let result = SimpleGa::new(proto, config).unwrap().evolve().unwrap();
        assert_eq!(result.reason, TerminationReason::Converged);
        assert_eq!(result.generations, 1);
    }

    #[test]
    fn test_stagnation() {
        let mut proto = target_five();
        proto.set_evaluator(|_: &ListGenome<i64>| 1.0);
        let config = target_config().with_termination(Termination::Stagnation(5));
        let result = SimpleGa::new(proto, config).unwrap().evolve().unwrap();
        assert_eq!(result.reason, TerminationReason::Stagnated);
        assert_eq!(result.generations, 5);
    }

    #[test]
    fn test_cancellation() {
        let cancel = Arc::new(AtomicBool::new(true));
        let mut ga = SimpleGa::new(target_five(), target_config()).unwrap();
        let result = ga.evolve_with_cancel(cancel).unwrap();
        assert_eq!(result.reason, TerminationReason::Cancelled);
        assert_eq!(result.generations, 0);
        assert_eq!(result.best_raw_history.len(), 1);
    }

    // ---- Collaborators ----

    struct BrokenSink;

    impl StatsSink<ListGenome<i64>> for BrokenSink {
        fn record(
            &mut self,
            _: usize,
            _: &Statistics,
            _: &Population<ListGenome<i64>>,
        ) -> std::result::Result<(), crate::ga::CollaboratorError> {
            Err("disk full".into())
        }
    }

    struct BrokenMigration;

    impl MigrationScheme<ListGenome<i64>> for BrokenMigration {
        fn exchange(
            &mut self,
            _: &mut Population<ListGenome<i64>>,
            _: usize,
        ) -> std::result::Result<(), crate::ga::CollaboratorError> {
            Err("network unreachable".into())
        }
    }

    #[test]
    fn test_collaborator_failures_do_not_abort() {
        // surfaces the warn lines when run with RUST_LOG=warn
        let _ = env_logger::builder().is_test(true).try_init();
        let history = HistorySink::new(2);
        let mut ga = SimpleGa::new(target_five(), target_config().with_generations(10)).unwrap();
        ga.add_sink(BrokenSink);
        ga.add_sink(history.clone());
        ga.set_migration(BrokenMigration);

        let result = ga.evolve().unwrap();
        assert_eq!(result.generations, 10);

        let gens: Vec<usize> = history.records().iter().map(|r| r.generation).collect();
        assert_eq!(gens, vec![0, 2, 4, 6, 8, 10]);
    }

    #[test]
    fn test_channel_islands_run_side_by_side() {
        use crate::ga::ChannelMigration;

        let proto = target_five();
        let islands = ChannelMigration::islands(2, &proto);
        let handles: Vec<_> = islands
            .into_iter()
            .enumerate()
            .map(|(i, migration)| {
                let proto = proto.clone();
                std::thread::spawn(move || {
                    let config = target_config().with_generations(30).with_seed(i as u64);
                    let mut ga = SimpleGa::new(proto, config).unwrap();
                    ga.set_migration(migration.with_interval(5));
                    ga.evolve().unwrap()
                })
            })
            .collect();

        for h in handles {
            let result = h.join().unwrap();
            assert_eq!(result.generations, 30);
            for w in result.best_raw_history.windows(2) {
                assert!(w[1] <= w[0]);
            }
        }
    }

    // ---- Genetic programming ----

    #[test]
    fn test_gp_symbolic_regression() {
        let prims = Arc::new(
            PrimitiveSet::new()
                .with_function("add", 2, |a| a[0] + a[1])
                .with_function("sub", 2, |a| a[0] - a[1])
                .with_function("mul", 2, |a| a[0] * a[1])
                .with_terminal("x")
                .with_terminal("1"),
        );

        let eval_prims = prims.clone();
        let mut proto = GpTree::new();
        proto.set_param(MAX_DEPTH, 4);
        proto.set_param(METHOD, TreeMethod::Ramped.to_string());
        proto.set_initializator(GpInitializator::new(prims.clone()));
        proto.set_mutator(GpSubtreeMutator::new(prims.clone()));
        proto.set_crossover(TreeStrictCrossover::default());
        proto.set_evaluator(move |t: &GpTree| {
            let Ok(program) = Program::compile(t, &eval_prims) else {
                return 1e9;
            };
            (-5..=5)
                .map(|i| {
                    let x = i as f64;
                    let y = program.eval(&[x]).unwrap_or(f64::MAX);
                    (y - (x * x + x)).abs()
                })
                .sum::<f64>()
                .min(1e9)
        });

        let config = GaConfig::default()
            .with_population_size(60)
            .with_generations(40)
            .with_mutation_rate(0.1)
            .with_minimax(Minimax::Minimize)
            .with_termination(Termination::RawScore(0.0))
            .with_seed(7);

        let mut ga = SimpleGa::new(proto, config).unwrap();
        let result = ga.evolve().unwrap();

        for w in result.best_raw_history.windows(2) {
            assert!(w[1] <= w[0]);
        }
        assert!(result.best_score <= result.best_raw_history[0]);
        assert!(result.best.height() <= 4);
        result.best.validate(&prims).unwrap();
    }
}
