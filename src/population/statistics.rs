//! Per-generation population statistics.

use crate::error::{EvolveError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Summary of raw scores and scaled fitness across a population.
///
/// Raw variance uses Bessel's correction (`n - 1` denominator). A
/// single-individual population reports zero variance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    pub raw_max: f64,
    pub raw_min: f64,
    pub raw_ave: f64,
    pub raw_tot: f64,
    pub raw_dev: f64,
    pub raw_var: f64,
    pub fit_max: f64,
    pub fit_min: f64,
    pub fit_ave: f64,
    pub fit_tot: f64,
}

impl Statistics {
    /// Computes the raw-score fields and the fitness total.
    ///
    /// The fitness extremes and average are left at zero; they are filled in
    /// by [`Statistics::update_fitness`] once the population is scaled.
    ///
    /// # Errors
    /// Returns [`EvolveError::EmptyPopulation`] for an empty input.
    pub fn from_scores(scores: &[f64], fitness: &[f64]) -> Result<Self> {
        let n = scores.len();
        if n == 0 {
            return Err(EvolveError::EmptyPopulation);
        }

        let raw_tot: f64 = scores.iter().sum();
        let raw_ave = raw_tot / n as f64;
        let raw_max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let raw_min = scores.iter().copied().fold(f64::INFINITY, f64::min);

        let raw_var = if n > 1 {
            let ss: f64 = scores.iter().map(|s| (s - raw_ave).powi(2)).sum();
            ss / (n - 1) as f64
        } else {
            0.0
        };

        Ok(Self {
            raw_max,
            raw_min,
            raw_ave,
            raw_tot,
            raw_dev: raw_var.sqrt(),
            raw_var,
            fit_tot: fitness.iter().sum(),
            ..Self::default()
        })
    }

    /// Refreshes the fitness fields after scaling.
    pub fn update_fitness(&mut self, fitness: &[f64]) {
        if fitness.is_empty() {
            return;
        }
        self.fit_tot = fitness.iter().sum();
        self.fit_ave = self.fit_tot / fitness.len() as f64;
        self.fit_max = fitness.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        self.fit_min = fitness.iter().copied().fold(f64::INFINITY, f64::min);
    }

    /// The raw-only summary line.
    pub fn raw_line(&self) -> String {
        format!(
            "Max/Min/Avg Raw [{:.2}/{:.2}/{:.2}]",
            self.raw_max, self.raw_min, self.raw_ave
        )
    }
}

impl fmt::Display for Statistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Max/Min/Avg Fitness(Raw) [{:.2}({:.2})/{:.2}({:.2})/{:.2}({:.2})]",
            self.fit_max, self.raw_max, self.fit_min, self.raw_min, self.fit_ave, self.raw_ave
        )
    }
}
