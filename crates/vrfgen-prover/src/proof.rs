//! Proof generation for a single seed

use std::sync::Arc;

use vrfgen_core::{KeyMaterial, Proof, ProofConstruction};

use crate::error::{ProverError, Result};
use crate::seed::FinalSeed;

/// Thin wrapper over a proof constructor that classifies its failures
pub struct ProofGenerator<P: ProofConstruction> {
    constructor: Arc<P>,
}

impl<P: ProofConstruction> Clone for ProofGenerator<P> {
    fn clone(&self) -> Self {
        Self {
            constructor: Arc::clone(&self.constructor),
        }
    }
}

impl<P: ProofConstruction> ProofGenerator<P> {
    pub fn new(constructor: Arc<P>) -> Self {
        Self { constructor }
    }

    /// Produce the proof for `seed`. Any constructor failure is a
    /// [`ProverError::ProofGeneration`].
    pub fn generate(&self, key: &KeyMaterial, seed: &FinalSeed) -> Result<Proof> {
        self.constructor
            .generate_proof(key, seed.as_h256())
            .map_err(|e| ProverError::ProofGeneration(e.to_string()))
    }
}
