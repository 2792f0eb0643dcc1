//! Serialized individual format.
//!
//! An individual travels as an opaque JSON byte blob holding its genes (or
//! tree), raw score, fitness and parameters. Operator slots and allele
//! generators hold code and are not part of the blob; use
//! [`decode_adopting`] to re-attach them from a local prototype.

use crate::error::Result;
use crate::genome::Genome;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Encodes an individual.
pub fn encode<G: Genome + Serialize>(genome: &G) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(genome)?)
}

/// Decodes an individual and rebuilds its derived state.
///
/// The result has empty operator slots.
pub fn decode<G: Genome + DeserializeOwned>(bytes: &[u8]) -> Result<G> {
    let mut genome: G = serde_json::from_slice(bytes)?;
    genome.rebuild();
    Ok(genome)
}

/// Decodes an individual and gives it the operators of `prototype`.
pub fn decode_adopting<G: Genome + DeserializeOwned>(bytes: &[u8], prototype: &G) -> Result<G> {
    let mut genome: G = decode(bytes)?;
    genome.adopt_operators(prototype);
    Ok(genome)
}
