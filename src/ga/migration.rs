//! Island migration.
//!
//! A [`MigrationScheme`] is called by the engine after each generation has
//! been sorted. Migration is best-effort: lost packets, late packets and
//! errors never stop the local run.

use super::CollaboratorError;
use crate::genome::Genome;
use crate::population::Population;
use crate::wire;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::mpsc::{channel, Receiver, Sender, TryRecvError};

/// Exchanges individuals with other islands.
pub trait MigrationScheme<G: Genome>: Send {
    /// Called once per generation with the sorted population.
    fn exchange(
        &mut self,
        population: &mut Population<G>,
        generation: usize,
    ) -> Result<(), CollaboratorError>;
}

/// In-process islands connected by channels.
///
/// Every `interval` generations an island sends its `migrants` best raw
/// individuals (wire-encoded) to every peer and replaces its worst
/// individuals with whatever has arrived since. Receiving never blocks;
/// packets that fail to decode are dropped.
pub struct ChannelMigration<G> {
    peers: Vec<Sender<Vec<u8>>>,
    inbox: Receiver<Vec<u8>>,
    prototype: G,
    interval: usize,
    migrants: usize,
}

impl<G> ChannelMigration<G>
where
    G: Genome + Serialize + DeserializeOwned,
{
    /// Creates `count` fully connected islands. Decoded immigrants take
    /// their operators from `prototype`.
    pub fn islands(count: usize, prototype: &G) -> Vec<Self> {
        let (senders, receivers): (Vec<_>, Vec<_>) = (0..count).map(|_| channel()).unzip();

        receivers
            .into_iter()
            .enumerate()
            .map(|(me, inbox)| Self {
                peers: senders
                    .iter()
                    .enumerate()
                    .filter(|(other, _)| *other != me)
                    .map(|(_, tx)| tx.clone())
                    .collect(),
                inbox,
                prototype: prototype.clone(),
                interval: 1,
                migrants: 1,
            })
            .collect()
    }

    /// Migrate every `interval` generations (minimum 1).
    pub fn with_interval(mut self, interval: usize) -> Self {
        self.interval = interval.max(1);
        self
    }

    /// Number of individuals sent to each peer per exchange.
    pub fn with_migrants(mut self, migrants: usize) -> Self {
        self.migrants = migrants;
        self
    }

    fn send_best(&self, population: &mut Population<G>) -> Result<(), CollaboratorError> {
        let count = self.migrants.min(population.len());
        for rank in 0..count {
            let bytes = wire::encode(population.best_raw(rank)?)?;
            for peer in &self.peers {
                // a finished peer has dropped its receiver
                if peer.send(bytes.clone()).is_err() {
                    log::debug!("migration peer is gone, dropping packet");
                }
            }
        }
        Ok(())
    }

    fn receive(&self) -> Vec<G> {
        let mut arrivals = Vec::new();
        loop {
            match self.inbox.try_recv() {
                Ok(bytes) => match wire::decode_adopting(&bytes, &self.prototype) {
                    Ok(genome) => arrivals.push(genome),
                    Err(e) => log::debug!("dropping undecodable migrant: {e}"),
                },
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => break,
            }
        }
        arrivals
    }
}

impl<G> MigrationScheme<G> for ChannelMigration<G>
where
    G: Genome + Serialize + DeserializeOwned,
{
    fn exchange(
        &mut self,
        population: &mut Population<G>,
        generation: usize,
    ) -> Result<(), CollaboratorError> {
        if generation % self.interval != 0 || population.is_empty() {
            return Ok(());
        }

        self.send_best(population)?;

        let arrivals = self.receive();
        if arrivals.is_empty() {
            return Ok(());
        }

        // the population is sorted best-first, so the tail holds the worst
        let len = population.len();
        let take = arrivals.len().min(len);
        for (offset, genome) in arrivals.into_iter().take(take).enumerate() {
            if let Some(slot) = population.get_mut(len - 1 - offset) {
                *slot = genome;
            }
        }
        log::debug!("generation {generation}: {take} migrants arrived");
        Ok(())
    }
}
