//! Statistics sinks.
//!
//! A sink receives a read-only view of the population every
//! [`StatsSink::frequency`] generations. Sinks are best-effort: an error
//! returned from [`StatsSink::record`] is logged and the run continues.

use super::CollaboratorError;
use crate::genome::Genome;
use crate::population::{Population, SortType, Statistics};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

/// Consumer of per-generation statistics.
pub trait StatsSink<G: Genome>: Send {
    /// Call cadence in generations. Zero disables the sink.
    fn frequency(&self) -> usize {
        1
    }

    fn record(
        &mut self,
        generation: usize,
        stats: &Statistics,
        population: &Population<G>,
    ) -> Result<(), CollaboratorError>;
}

/// Logs the population summary line at info level.
#[derive(Debug, Clone, Copy)]
pub struct LogSink {
    every: usize,
}

impl LogSink {
    pub fn new(every: usize) -> Self {
        Self { every }
    }
}

impl<G: Genome> StatsSink<G> for LogSink {
    fn frequency(&self) -> usize {
        self.every
    }

    fn record(
        &mut self,
        generation: usize,
        stats: &Statistics,
        population: &Population<G>,
    ) -> Result<(), CollaboratorError> {
        let line = match population.sort_type() {
            SortType::Scaled => stats.to_string(),
            SortType::Raw => stats.raw_line(),
        };
        log::info!("Gen. {generation}: {line}");
        Ok(())
    }
}

/// One stored snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenerationRecord {
    pub generation: usize,
    pub stats: Statistics,
    pub best_raw: f64,
}

/// Keeps every snapshot in memory.
///
/// Clones share the same storage, so keep a clone to read the history after
/// handing the sink to the engine.
#[derive(Debug, Clone)]
pub struct HistorySink {
    every: usize,
    records: Arc<Mutex<Vec<GenerationRecord>>>,
}

impl HistorySink {
    pub fn new(every: usize) -> Self {
        Self {
            every,
            records: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Snapshot of the records stored so far.
    pub fn records(&self) -> Vec<GenerationRecord> {
        self.records
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }
}

impl<G: Genome> StatsSink<G> for HistorySink {
    fn frequency(&self) -> usize {
        self.every
    }

    fn record(
        &mut self,
        generation: usize,
        stats: &Statistics,
        population: &Population<G>,
    ) -> Result<(), CollaboratorError> {
        let minimax = population.minimax();
        let best_raw = population
            .iter()
            .map(Genome::score)
            .reduce(|a, b| if minimax.is_better(b, a) { b } else { a })
            .unwrap_or(stats.raw_max);

        self.records
            .lock()
            .map_err(|_| "history storage is poisoned")?
            .push(GenerationRecord {
                generation,
                stats: *stats,
                best_raw,
            });
        Ok(())
    }
}
