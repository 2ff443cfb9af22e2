//! vrfgen Core - keys, curve arithmetic, and VRF proofs
//!
//! This crate provides the building blocks the batch prover consumes through
//! narrow capability seams:
//!
//! - [`keyfile::KeyDecryptor`] opens a password-encrypted key export, either
//!   the native Argon2id format or a Chainlink node's keystore ([`keystore`])
//! - [`curve::Secp256k1`] is the curve context (group operations, hash-to-curve,
//!   the verifier's projective addition, field inversion)
//! - [`vrf::ProofConstruction`] builds and checks VRF proofs
//! - [`abi::encode`] produces the canonical encoding hashed into seeds

pub mod abi;
pub mod crypto;
pub mod curve;
pub mod error;
pub mod key;
pub mod keyfile;
pub mod keystore;
pub mod types;
pub mod vrf;

pub use abi::Token;
pub use curve::{ProjectiveSum, Secp256k1};
pub use error::{Error, Result};
pub use key::KeyMaterial;
pub use keyfile::{EncryptedKeyExport, KdfCosts, KeyDecryptor, PasswordKeyDecryptor};
pub use keystore::{ChainlinkKeyExport, KeyFile, KeyFileDecryptor, KeystoreDecryptor};
pub use types::{Address, H256};
pub use vrf::{Proof, ProofConstruction, Secp256k1Vrf};

/// Re-exported so downstream crates name the same point and field types
pub use k256::{AffinePoint, FieldElement, Scalar};
