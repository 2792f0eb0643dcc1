//! Named genome parameters.
//!
//! Operators read their settings (value ranges, gaussian parameters, tree
//! limits) from the genome they act on. Parameters are stored once on the
//! prototype genome and copied into every clone.

use crate::error::{EvolveError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Lower bound of the value range used by numeric initializators and mutators.
pub const RANGE_MIN: &str = "rangemin";
/// Upper bound of the value range used by numeric initializators and mutators.
pub const RANGE_MAX: &str = "rangemax";
/// Mean of the gaussian perturbation.
pub const GAUSS_MU: &str = "gauss_mu";
/// Standard deviation of the gaussian perturbation.
pub const GAUSS_SIGMA: &str = "gauss_sigma";
/// Maximum tree depth (root at depth 0).
pub const MAX_DEPTH: &str = "max_depth";
/// Maximum number of children per tree node; negative means "exactly".
pub const MAX_SIBLINGS: &str = "max_siblings";
/// Tree construction method (`grow`, `full` or `ramped`).
pub const METHOD: &str = "method";
/// Per-position swap probability of the uniform crossovers.
pub const UNIFORM_PROB: &str = "uniform_prob";
/// Attempt budget of the bounded-retry strict tree crossover.
pub const MAX_ATTEMPTS: &str = "max_attempts";

pub const DEFAULT_RANGE_MIN: i64 = 0;
pub const DEFAULT_RANGE_MAX: i64 = 100;
pub const DEFAULT_INT_GAUSS_MU: f64 = 0.0;
pub const DEFAULT_INT_GAUSS_SIGMA: f64 = 10.0;
pub const DEFAULT_REAL_GAUSS_MU: f64 = 0.0;
pub const DEFAULT_REAL_GAUSS_SIGMA: f64 = 1.0;
pub const DEFAULT_MAX_SIBLINGS: i64 = 2;
pub const DEFAULT_UNIFORM_PROB: f64 = 0.5;
pub const DEFAULT_MAX_ATTEMPTS: usize = 10;

/// A single parameter value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Real(f64),
    Text(String),
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Bool(v) => write!(f, "{v}"),
            ParamValue::Int(v) => write!(f, "{v}"),
            ParamValue::Real(v) => write!(f, "{v}"),
            ParamValue::Text(v) => write!(f, "{v}"),
        }
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        ParamValue::Bool(v)
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        ParamValue::Int(v)
    }
}

impl From<i32> for ParamValue {
    fn from(v: i32) -> Self {
        ParamValue::Int(v as i64)
    }
}

impl From<usize> for ParamValue {
    fn from(v: usize) -> Self {
        ParamValue::Int(v as i64)
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Real(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::Text(v.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        ParamValue::Text(v)
    }
}

/// Ordered map of named parameters with typed accessors.
///
/// Accessors return `Ok(None)` for a missing key and a
/// [`EvolveError::Configuration`] for a value of the wrong type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Params(BTreeMap<String, ParamValue>);

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets (or overwrites) a parameter.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<ParamValue>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.0.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<ParamValue> {
        self.0.remove(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Reads a real value. Integers are widened.
    pub fn real(&self, key: &str) -> Result<Option<f64>> {
        match self.0.get(key) {
            None => Ok(None),
            Some(ParamValue::Real(v)) => Ok(Some(*v)),
            Some(ParamValue::Int(v)) => Ok(Some(*v as f64)),
            Some(other) => Err(type_error(key, "a number", other)),
        }
    }

    /// Reads an integer value. Reals with no fractional part are accepted.
    pub fn int(&self, key: &str) -> Result<Option<i64>> {
        match self.0.get(key) {
            None => Ok(None),
            Some(ParamValue::Int(v)) => Ok(Some(*v)),
            Some(ParamValue::Real(v)) if v.fract() == 0.0 && v.is_finite() => Ok(Some(*v as i64)),
            Some(other) => Err(type_error(key, "an integer", other)),
        }
    }

    /// Reads a non-negative integer value.
    pub fn count(&self, key: &str) -> Result<Option<usize>> {
        match self.int(key)? {
            None => Ok(None),
            Some(v) if v >= 0 => Ok(Some(v as usize)),
            Some(v) => Err(EvolveError::config(format!(
                "parameter '{key}' must be non-negative, got {v}"
            ))),
        }
    }

    pub fn text(&self, key: &str) -> Result<Option<&str>> {
        match self.0.get(key) {
            None => Ok(None),
            Some(ParamValue::Text(v)) => Ok(Some(v.as_str())),
            Some(other) => Err(type_error(key, "a string", other)),
        }
    }

    pub fn flag(&self, key: &str) -> Result<Option<bool>> {
        match self.0.get(key) {
            None => Ok(None),
            Some(ParamValue::Bool(v)) => Ok(Some(*v)),
            Some(other) => Err(type_error(key, "a boolean", other)),
        }
    }

    pub fn real_or(&self, key: &str, default: f64) -> Result<f64> {
        Ok(self.real(key)?.unwrap_or(default))
    }

    pub fn int_or(&self, key: &str, default: i64) -> Result<i64> {
        Ok(self.int(key)?.unwrap_or(default))
    }

    pub fn count_or(&self, key: &str, default: usize) -> Result<usize> {
        Ok(self.count(key)?.unwrap_or(default))
    }

    /// Reads a non-negative integer that must be present.
    pub fn require_count(&self, key: &str) -> Result<usize> {
        self.count(key)?.ok_or_else(|| {
            EvolveError::config(format!("the '{key}' genome parameter is required"))
        })
    }
}

fn type_error(key: &str, expected: &str, got: &ParamValue) -> EvolveError {
    EvolveError::config(format!("parameter '{key}' must be {expected}, got '{got}'"))
}
