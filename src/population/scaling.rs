//! Scaling schemes: raw score to selection fitness.
//!
//! # References
//!
//! - Goldberg (1989), *Genetic Algorithms in Search, Optimization, and
//!   Machine Learning*, ch. 3 (linear scaling, sigma truncation)
//! - Gillies (1985), power law scaling
//! - de la Maza & Tidor (1993), "An Analysis of Selection Procedures with
//!   Particular Attention Paid to Proportional and Boltzmann Selection"

use super::statistics::Statistics;
use crate::error::{EvolveError, Result};
use serde::{Deserialize, Serialize};

pub const DEFAULT_LINEAR_MULTIPLIER: f64 = 1.2;
pub const DEFAULT_SIGMA_MULTIPLIER: f64 = 2.0;
pub const DEFAULT_POWER_EXPONENT: f64 = 1.0005;
pub const DEFAULT_BOLTZMANN_START: f64 = 40.0;
pub const DEFAULT_BOLTZMANN_FACTOR: f64 = 0.05;
pub const DEFAULT_BOLTZMANN_MIN: f64 = 1.0;

/// Annealed temperature for [`Scaling::Boltzmann`].
///
/// The temperature is part of the scheme itself and survives across
/// generations. Each application first lowers it by `factor`, floored at
/// `min_temperature`, and then scales with the new value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoltzmannScaling {
    pub temperature: f64,
    pub factor: f64,
    pub min_temperature: f64,
}

impl Default for BoltzmannScaling {
    fn default() -> Self {
        Self {
            temperature: DEFAULT_BOLTZMANN_START,
            factor: DEFAULT_BOLTZMANN_FACTOR,
            min_temperature: DEFAULT_BOLTZMANN_MIN,
        }
    }
}

impl BoltzmannScaling {
    pub fn new(start: f64, factor: f64, min_temperature: f64) -> Self {
        Self {
            temperature: start,
            factor,
            min_temperature,
        }
    }

    fn cool(&mut self) -> f64 {
        self.temperature = (self.temperature - self.factor).max(self.min_temperature);
        self.temperature
    }
}

/// How raw scores are turned into fitness.
///
/// Linear and power law scaling reject negative raw scores with
/// [`EvolveError::NegativeScore`]; no fitness is written in that case.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scaling {
    /// Affine map keeping the average and putting the best at
    /// `multiplier` times the average.
    Linear { multiplier: f64 },
    /// `max(0, score - mean + multiplier * stddev)`. Accepts negative scores.
    SigmaTruncation { multiplier: f64 },
    /// `score ^ exponent`.
    PowerLaw { exponent: f64 },
    /// `exp(score / T) / mean(exp(score / T))` with a cooling `T`.
    Boltzmann(BoltzmannScaling),
}

impl Default for Scaling {
    fn default() -> Self {
        Scaling::linear()
    }
}

impl Scaling {
    pub fn linear() -> Self {
        Scaling::Linear {
            multiplier: DEFAULT_LINEAR_MULTIPLIER,
        }
    }

    pub fn sigma_truncation() -> Self {
        Scaling::SigmaTruncation {
            multiplier: DEFAULT_SIGMA_MULTIPLIER,
        }
    }

    pub fn power_law() -> Self {
        Scaling::PowerLaw {
            exponent: DEFAULT_POWER_EXPONENT,
        }
    }

    pub fn boltzmann() -> Self {
        Scaling::Boltzmann(BoltzmannScaling::default())
    }

    pub fn name(&self) -> &'static str {
        match self {
            Scaling::Linear { .. } => "linear",
            Scaling::SigmaTruncation { .. } => "sigma truncation",
            Scaling::PowerLaw { .. } => "power law",
            Scaling::Boltzmann(_) => "boltzmann",
        }
    }

    /// Current Boltzmann temperature, if this is a Boltzmann scheme.
    pub fn temperature(&self) -> Option<f64> {
        match self {
            Scaling::Boltzmann(b) => Some(b.temperature),
            _ => None,
        }
    }

    /// Computes the fitness of every score.
    ///
    /// `stats` must describe `scores`. Boltzmann scaling advances its
    /// temperature on every call.
    pub fn scale(&mut self, scores: &[f64], stats: &Statistics) -> Result<Vec<f64>> {
        if scores.is_empty() {
            return Err(EvolveError::EmptyPopulation);
        }
        log::debug!("running {} scaling", self.name());

        match self {
            Scaling::Linear { multiplier } => {
                reject_negative("linear", scores)?;
                let (a, b) = linear_coefficients(*multiplier, stats);
                Ok(scores.iter().map(|s| (s * a + b).max(0.0)).collect())
            }
            Scaling::SigmaTruncation { multiplier } => {
                let offset = *multiplier * stats.raw_dev - stats.raw_ave;
                Ok(scores.iter().map(|s| (s + offset).max(0.0)).collect())
            }
            Scaling::PowerLaw { exponent } => {
                reject_negative("power law", scores)?;
                Ok(scores.iter().map(|s| s.powf(*exponent)).collect())
            }
            Scaling::Boltzmann(state) => {
                let t = state.cool();
                // shifting by the max cancels out in the ratio and keeps exp finite
                let top = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                let e: Vec<f64> = scores.iter().map(|s| ((s - top) / t).exp()).collect();
                let mean = e.iter().sum::<f64>() / e.len() as f64;
                Ok(e.into_iter().map(|v| v / mean).collect())
            }
        }
    }
}

fn reject_negative(scheme: &'static str, scores: &[f64]) -> Result<()> {
    match scores.iter().find(|s| **s < 0.0) {
        Some(&score) => Err(EvolveError::NegativeScore { scheme, score }),
        None => Ok(()),
    }
}

/// Slope and intercept of linear scaling.
fn linear_coefficients(c: f64, stats: &Statistics) -> (f64, f64) {
    let (ave, max, min) = (stats.raw_ave, stats.raw_max, stats.raw_min);

    // equal scores may still leave rounding noise in the average
    if max - ave <= f64::EPSILON * max.abs().max(1.0) {
        return (1.0, 0.0);
    }

    if min > c * ave - max / c - 1.0 {
        let delta = max - ave;
        let a = (c - 1.0) * ave / delta;
        let b = ave * (max - c * ave) / delta;
        (a, b)
    } else {
        let delta = ave - min;
        let a = ave / delta;
        let b = -min * ave / delta;
        (a, b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(scores: &[f64]) -> Statistics {
        Statistics::from_scores(scores, &vec![0.0; scores.len()]).unwrap()
    }

    // ---- Linear ----

    #[test]
    fn test_linear_equal_scores_unchanged() {
        let scores = [0.1; 7];
        let mut s = Scaling::linear();
        let fit = s.scale(&scores, &stats(&scores)).unwrap();
        assert_eq!(fit, scores.to_vec());
    }

    #[test]
    fn test_linear_preserves_average_and_stretches_best() {
        let scores = [10.0, 11.0, 12.0, 13.0];
        let st = stats(&scores);
        let mut s = Scaling::linear();
        let fit = s.scale(&scores, &st).unwrap();
        let ave: f64 = fit.iter().sum::<f64>() / fit.len() as f64;
        assert!((ave - st.raw_ave).abs() < 1e-9);
        let best = fit.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        assert!((best - 1.2 * st.raw_ave).abs() < 1e-9);
        assert!(fit.iter().all(|f| *f >= 0.0));
    }

    #[test]
    fn test_linear_low_outlier_maps_to_zero() {
        // min is far below the average, so the worst lands on zero
        let scores = [5.0, 100.0, 100.0, 100.0];
        let mut s = Scaling::linear();
        let fit = s.scale(&scores, &stats(&scores)).unwrap();
        assert!(fit[0].abs() < 1e-9);
        assert!(fit[1] > 100.0);
        assert!(fit.iter().all(|f| *f >= 0.0));
    }

    #[test]
    fn test_linear_rejects_negative_without_writing() {
        let scores = [1.0, -2.0, 3.0];
        let mut s = Scaling::linear();
        let err = s.scale(&scores, &stats(&scores)).unwrap_err();
        assert!(matches!(
            err,
            EvolveError::NegativeScore {
                scheme: "linear",
                score
            } if score == -2.0
        ));
    }

    // ---- Sigma truncation ----

    #[test]
    fn test_sigma_truncation_accepts_negative() {
        let scores = [-5.0, 0.0, 5.0];
        let st = stats(&scores);
        let mut s = Scaling::sigma_truncation();
        let fit = s.scale(&scores, &st).unwrap();
        for (f, raw) in fit.iter().zip(scores) {
            let expected = (raw - st.raw_ave + 2.0 * st.raw_dev).max(0.0);
            assert!((f - expected).abs() < 1e-12);
        }
    }

    // ---- Power law ----

    #[test]
    fn test_power_law() {
        let scores = [0.0, 1.0, 4.0];
        let mut s = Scaling::PowerLaw { exponent: 2.0 };
        let fit = s.scale(&scores, &stats(&scores)).unwrap();
        assert_eq!(fit, vec![0.0, 1.0, 16.0]);

        let bad = [1.0, -0.1];
        assert!(s.scale(&bad, &stats(&bad)).is_err());
    }

    // ---- Boltzmann ----

    #[test]
    fn test_boltzmann_cools_each_call() {
        let scores = [1.0, 2.0, 3.0];
        let st = stats(&scores);
        let mut s = Scaling::Boltzmann(BoltzmannScaling::new(1.1, 0.05, 1.0));
        s.scale(&scores, &st).unwrap();
        assert!((s.temperature().unwrap() - 1.05).abs() < 1e-12);
        s.scale(&scores, &st).unwrap();
        assert!((s.temperature().unwrap() - 1.0).abs() < 1e-12);
        s.scale(&scores, &st).unwrap();
        assert!((s.temperature().unwrap() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_boltzmann_mean_is_one() {
        let scores = [1.0, 2.0, 3.0, 50.0];
        let mut s = Scaling::boltzmann();
        let fit = s.scale(&scores, &stats(&scores)).unwrap();
        let mean = fit.iter().sum::<f64>() / fit.len() as f64;
        assert!((mean - 1.0).abs() < 1e-9);
        assert!(fit[3] > fit[0]);
        // exp(s/T)/mean(exp(s/T)) computed directly for comparison
        let t = s.temperature().unwrap();
        let raw: Vec<f64> = scores.iter().map(|x| (x / t).exp()).collect();
        let m = raw.iter().sum::<f64>() / raw.len() as f64;
        for (f, r) in fit.iter().zip(raw) {
            assert!((f - r / m).abs() < 1e-9);
        }
    }

    #[test]
    fn test_boltzmann_large_scores_stay_finite() {
        let scores = [1e5, 2e5];
        let mut s = Scaling::Boltzmann(BoltzmannScaling::new(2.0, 0.0, 1.0));
        let fit = s.scale(&scores, &stats(&scores)).unwrap();
        assert!(fit.iter().all(|f| f.is_finite()));
    }

    #[test]
    fn test_serde_round_trip() {
        let s = Scaling::Boltzmann(BoltzmannScaling::new(10.0, 0.5, 2.0));
        let json = serde_json::to_string(&s).unwrap();
        let back: Scaling = serde_json::from_str(&json).unwrap();
        assert_eq!(s, back);
    }
}
