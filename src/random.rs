//! Seeded randomness helpers.
//!
//! Every operator in the crate receives the generator explicitly as
//! `&mut EvoRng`; there is no global generator. Runs with the same seed and
//! configuration are therefore reproducible.

use crate::error::{EvolveError, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};

/// The generator type threaded through all genetic operators.
pub type EvoRng = StdRng;

/// Creates a deterministic generator from a seed.
pub fn create_rng(seed: u64) -> EvoRng {
    StdRng::seed_from_u64(seed)
}

/// Returns `true` with probability `p`.
///
/// `p >= 1.0` always returns `true` and `p <= 0.0` always returns `false`
/// without consuming randomness.
pub fn flip_coin<R: Rng + ?Sized>(rng: &mut R, p: f64) -> bool {
    if p >= 1.0 {
        return true;
    }
    if p <= 0.0 {
        return false;
    }
    rng.random::<f64>() <= p
}

/// Draws a value from `Normal(mu, sigma)`.
///
/// # Errors
/// Returns [`EvolveError::Configuration`] if `sigma` is negative or not finite.
pub fn gaussian<R: Rng + ?Sized>(rng: &mut R, mu: f64, sigma: f64) -> Result<f64> {
    let normal = Normal::new(mu, sigma)
        .map_err(|e| EvolveError::config(format!("invalid gaussian sigma {sigma}: {e}")))?;
    Ok(normal.sample(rng))
}

/// Uniform integer in `[min, max]` (bounds may be given in either order).
pub fn random_int<R: Rng + ?Sized>(rng: &mut R, min: i64, max: i64) -> i64 {
    let (lo, hi) = if min <= max { (min, max) } else { (max, min) };
    rng.random_range(lo..=hi)
}

/// Uniform real in `[min, max]` (bounds may be given in either order).
pub fn random_real<R: Rng + ?Sized>(rng: &mut R, min: f64, max: f64) -> f64 {
    let (lo, hi) = if min <= max { (min, max) } else { (max, min) };
    if lo == hi {
        return lo;
    }
    rng.random_range(lo..=hi)
}

/// Picks a uniformly random element, or `None` for an empty slice.
pub fn choose<'a, T, R: Rng + ?Sized>(rng: &mut R, items: &'a [T]) -> Option<&'a T> {
    if items.is_empty() {
        return None;
    }
    Some(&items[rng.random_range(0..items.len())])
}

/// Picks an index with probability proportional to its weight.
///
/// Negative and non-finite weights count as zero. If every weight is zero
/// the pick is uniform. Returns `None` for an empty slice.
pub fn choose_weighted<R: Rng + ?Sized>(rng: &mut R, weights: &[f64]) -> Option<usize> {
    let n = weights.len();
    if n == 0 {
        return None;
    }

    let clean = |w: f64| if w.is_finite() && w > 0.0 { w } else { 0.0 };
    let total: f64 = weights.iter().map(|&w| clean(w)).sum();
    if total <= 0.0 {
        return Some(rng.random_range(0..n));
    }

    let threshold = rng.random_range(0.0..total);
    let mut cumulative = 0.0;
    for (i, &w) in weights.iter().enumerate() {
        cumulative += clean(w);
        if cumulative > threshold {
            return Some(i);
        }
    }

    // floating-point fallback: last index with a positive weight
    weights.iter().rposition(|&w| clean(w) > 0.0)
}

/// Two distinct uniformly random indices in `0..n`, or `None` if `n < 2`.
pub fn distinct_pair<R: Rng + ?Sized>(rng: &mut R, n: usize) -> Option<(usize, usize)> {
    if n < 2 {
        return None;
    }
    let a = rng.random_range(0..n);
    let mut b = rng.random_range(0..n - 1);
    if b >= a {
        b += 1;
    }
    Some((a, b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_same_sequence() {
        let mut a = create_rng(7);
        let mut b = create_rng(7);
        for _ in 0..100 {
            assert_eq!(random_int(&mut a, 0, 1000), random_int(&mut b, 0, 1000));
        }
    }

    #[test]
    fn test_flip_coin_extremes() {
        let mut rng = create_rng(42);
        for _ in 0..100 {
            assert!(flip_coin(&mut rng, 1.0));
            assert!(!flip_coin(&mut rng, 0.0));
        }
    }

    #[test]
    fn test_flip_coin_rate() {
        let mut rng = create_rng(42);
        let hits = (0..10_000).filter(|_| flip_coin(&mut rng, 0.3)).count();
        assert!((2500..3500).contains(&hits), "got {hits}");
    }

    #[test]
    fn test_random_int_bounds() {
        let mut rng = create_rng(42);
        for _ in 0..1000 {
            let v = random_int(&mut rng, -3, 3);
            assert!((-3..=3).contains(&v));
            let w = random_int(&mut rng, 5, 1);
            assert!((1..=5).contains(&w));
        }
    }

    #[test]
    fn test_random_real_degenerate() {
        let mut rng = create_rng(42);
        assert_eq!(random_real(&mut rng, 2.5, 2.5), 2.5);
        for _ in 0..1000 {
            let v = random_real(&mut rng, -1.0, 1.0);
            assert!((-1.0..=1.0).contains(&v));
        }
    }

    #[test]
    fn test_gaussian_rejects_bad_sigma() {
        let mut rng = create_rng(42);
        assert!(gaussian(&mut rng, 0.0, -1.0).is_err());
        assert!(gaussian(&mut rng, 0.0, 1.0).is_ok());
    }

    #[test]
    fn test_gaussian_mean() {
        let mut rng = create_rng(42);
        let n = 10_000;
        let sum: f64 = (0..n).map(|_| gaussian(&mut rng, 3.0, 1.0).unwrap()).sum();
        let mean = sum / n as f64;
        assert!((mean - 3.0).abs() < 0.1, "mean {mean}");
    }

    #[test]
    fn test_choose() {
        let mut rng = create_rng(42);
        let empty: [u8; 0] = [];
        assert!(choose(&mut rng, &empty).is_none());
        let items = [1, 2, 3];
        for _ in 0..100 {
            assert!(items.contains(choose(&mut rng, &items).unwrap()));
        }
    }

    #[test]
    fn test_choose_weighted_favors_heavy() {
        let mut rng = create_rng(42);
        let weights = [1.0, 0.0, 9.0];
        let mut counts = [0u32; 3];
        for _ in 0..10_000 {
            counts[choose_weighted(&mut rng, &weights).unwrap()] += 1;
        }
        assert_eq!(counts[1], 0);
        assert!(counts[2] > counts[0] * 5, "counts: {counts:?}");
    }

    #[test]
    fn test_choose_weighted_all_zero_is_uniform() {
        let mut rng = create_rng(42);
        let weights = [0.0, 0.0, 0.0, 0.0];
        let mut counts = [0u32; 4];
        for _ in 0..10_000 {
            counts[choose_weighted(&mut rng, &weights).unwrap()] += 1;
        }
        for &c in &counts {
            assert!(c > 2000, "counts: {counts:?}");
        }
    }

    #[test]
    fn test_distinct_pair() {
        let mut rng = create_rng(42);
        assert!(distinct_pair(&mut rng, 1).is_none());
        for _ in 0..1000 {
            let (a, b) = distinct_pair(&mut rng, 4).unwrap();
            assert_ne!(a, b);
            assert!(a < 4 && b < 4);
        }
    }
}
