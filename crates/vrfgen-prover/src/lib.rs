//! vrfgen Prover - batch VRF proofs with on-chain verifier witnesses
//!
//! For every nonce in a batch the prover:
//! 1. derives the request's pre-seed and final seed
//! 2. builds a VRF proof for the final seed
//! 3. precomputes the witnesses a Solidity verifier takes alongside the proof
//!
//! Nonces are spread across blocking worker tasks and merged back in nonce
//! order into a [`RecordTable`].

pub mod config;
pub mod error;
pub mod partition;
pub mod pipeline;
pub mod proof;
pub mod record;
pub mod request;
pub mod seed;
pub mod witness;

pub use config::ProverConfig;
pub use error::{ProverError, Result};
pub use partition::{partition, NonceRange};
pub use pipeline::ProofPipeline;
pub use proof::ProofGenerator;
pub use record::{RecordTable, ResultRecord, HEADER};
pub use request::BatchRequest;
pub use seed::{FinalSeed, PreSeed, RequestContext, SeedScheme};
pub use witness::{precompute, SolidityWitness};
