//! Criterion benchmarks for the u-evolve engine and operators.
//!
//! Uses synthetic problems (Sphere function, a fixed GP expression) to
//! measure engine and operator overhead independent of any domain.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::sync::Arc;
use u_evolve::ga::{GaConfig, SimpleGa};
use u_evolve::genome::params::{MAX_DEPTH, METHOD, RANGE_MAX, RANGE_MIN};
use u_evolve::genome::{Genome, GpTree, ListGenome, PrimitiveSet, Program};
use u_evolve::operators::{GpInitializator, TreeStrictCrossover};
use u_evolve::population::{Minimax, Scaling, Statistics};
use u_evolve::random::create_rng;

// ===========================================================================
// Sphere function: minimize sum(x_i^2)
// ===========================================================================

fn sphere(dim: usize) -> ListGenome<f64> {
    let mut g = ListGenome::<f64>::real(dim);
    g.set_param(RANGE_MIN, -5.0);
    g.set_param(RANGE_MAX, 5.0);
    g.set_evaluator(|g: &ListGenome<f64>| g.iter().map(|x| x * x).sum());
    g
}

fn primitives() -> Arc<PrimitiveSet> {
    Arc::new(
        PrimitiveSet::new()
            .with_function("add", 2, |a| a[0] + a[1])
            .with_function("sub", 2, |a| a[0] - a[1])
            .with_function("mul", 2, |a| a[0] * a[1])
            .with_terminal("x")
            .with_terminal("y")
            .with_terminal("2"),
    )
}

fn gp_tree(max_depth: i64, method: &str, seed: u64) -> GpTree {
    let mut t = GpTree::new();
    t.set_param(MAX_DEPTH, max_depth);
    t.set_param(METHOD, method);
    t.set_initializator(GpInitializator::new(primitives()));
    let mut rng = create_rng(seed);
    t.initialize(&mut rng).expect("gp initialization");
    t
}

// ===========================================================================
// Benchmarks
// ===========================================================================

fn bench_ga_sphere(c: &mut Criterion) {
    let mut group = c.benchmark_group("ga_sphere");
    group.sample_size(10);

    for (dim, pop, gen) in [(10usize, 50usize, 50usize), (50, 100, 30), (100, 100, 20)] {
        let config = GaConfig::default()
            .with_population_size(pop)
            .with_generations(gen)
            .with_minimax(Minimax::Minimize)
            .with_seed(42);
        group.bench_with_input(
            BenchmarkId::new(format!("d{}_p{}_g{}", dim, pop, gen), dim),
            &(sphere(dim), config),
            |b, (proto, cfg)| {
                b.iter(|| {
                    let mut ga = SimpleGa::new(proto.clone(), cfg.clone()).expect("valid config");
                    black_box(ga.evolve().expect("sphere run"))
                })
            },
        );
    }
    group.finish();
}

fn bench_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("scaling");
    let scores: Vec<f64> = (0..1000).map(|i| (i % 97) as f64).collect();
    let stats = Statistics::from_scores(&scores, &vec![0.0; scores.len()]).expect("non-empty");

    for scaling in [
        Scaling::linear(),
        Scaling::sigma_truncation(),
        Scaling::power_law(),
        Scaling::boltzmann(),
    ] {
        group.bench_function(scaling.name(), |b| {
            let mut s = scaling;
            b.iter(|| black_box(s.scale(black_box(&scores), &stats).expect("scaled")))
        });
    }
    group.finish();
}

fn bench_strict_crossover(c: &mut Criterion) {
    let mut group = c.benchmark_group("tree_strict_crossover");
    group.sample_size(20);

    for (name, strategy) in [
        ("exhaustive", TreeStrictCrossover::exhaustive()),
        ("bounded_retry", TreeStrictCrossover::bounded_retry()),
    ] {
        let mut mom = gp_tree(6, "full", 1);
        let mut dad = gp_tree(6, "full", 2);
        mom.set_crossover(strategy);
        dad.set_crossover(strategy);
        group.bench_function(name, |b| {
            let mut rng = create_rng(42);
            b.iter(|| black_box(mom.crossover(&dad, 2, &mut rng).expect("crossover")))
        });
    }
    group.finish();
}

fn bench_gp_eval(c: &mut Criterion) {
    let mut group = c.benchmark_group("gp_eval");
    let prims = primitives();

    for &depth in &[4i64, 6, 8] {
        let tree = gp_tree(depth, "full", 7);
        let program = Program::compile(&tree, &prims).expect("compiles");
        group.bench_with_input(BenchmarkId::new("interpreted", depth), &tree, |b, t| {
            b.iter(|| black_box(t.evaluate_with(&prims, black_box(&[1.5, -0.5]))))
        });
        group.bench_with_input(BenchmarkId::new("compiled", depth), &program, |b, p| {
            b.iter(|| black_box(p.eval(black_box(&[1.5, -0.5]))))
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_ga_sphere,
    bench_scaling,
    bench_strict_crossover,
    bench_gp_eval
);
criterion_main!(benches);
