//! Per-request seed derivation
//!
//! A pre-seed identifies one request from one consumer; the final seed mixes
//! in the block the request landed in. Both are pure functions of their
//! inputs.

use std::fmt;

use serde::{Deserialize, Serialize};
use vrfgen_core::{
    abi::{self, Token},
    crypto::{keccak256, keccak256_multi},
    Address, H256,
};

use crate::error::Result;

/// Request fields shared by every nonce in a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestContext {
    pub sender: Address,
    pub subscription_id: u64,
    pub block_hash: H256,
    pub block_number: u64,
    pub callback_gas_limit: u32,
    pub num_words: u32,
}

/// `keccak256(abi.encode(keyHash, sender, subId, nonce))`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PreSeed(pub H256);

impl PreSeed {
    pub fn as_h256(&self) -> &H256 {
        &self.0
    }
}

impl fmt::Display for PreSeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// The seed a proof is generated for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FinalSeed(pub H256);

impl FinalSeed {
    pub fn as_h256(&self) -> &H256 {
        &self.0
    }
}

impl fmt::Display for FinalSeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// How the final seed is derived from the pre-seed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum SeedScheme {
    /// Hash the pre-seed with every request context field
    #[default]
    FullContext,
    /// `keccak256(preSeed || blockHash)`, as a V2 coordinator recomputes it
    Coordinator,
}

impl SeedScheme {
    pub fn derive(&self, pre_seed: &PreSeed, context: &RequestContext) -> Result<FinalSeed> {
        match self {
            SeedScheme::FullContext => derive_final_seed(pre_seed, context),
            SeedScheme::Coordinator => Ok(derive_coordinator_seed(pre_seed, &context.block_hash)),
        }
    }
}

/// Derive the pre-seed for one nonce
pub fn derive_pre_seed(
    key_hash: &H256,
    sender: &Address,
    subscription_id: u64,
    nonce: u64,
) -> Result<PreSeed> {
    let encoded = abi::encode(&[
        Token::FixedBytes(*key_hash),
        Token::Address(*sender),
        Token::uint64(subscription_id),
        Token::uint64(nonce),
    ])?;
    Ok(PreSeed(H256(keccak256(&encoded))))
}

/// Derive the final seed from the pre-seed and the full request context
pub fn derive_final_seed(pre_seed: &PreSeed, context: &RequestContext) -> Result<FinalSeed> {
    let encoded = abi::encode(&[
        Token::FixedBytes(pre_seed.0),
        Token::FixedBytes(context.block_hash),
        Token::uint64(context.block_number),
        Token::uint64(context.subscription_id),
        Token::uint32(context.callback_gas_limit as u64),
        Token::uint32(context.num_words as u64),
        Token::Address(context.sender),
    ])?;
    Ok(FinalSeed(H256(keccak256(&encoded))))
}

/// Coordinator-compatible final seed: `keccak256(preSeed || blockHash)`
pub fn derive_coordinator_seed(pre_seed: &PreSeed, block_hash: &H256) -> FinalSeed {
    FinalSeed(H256(keccak256_multi(&[
        pre_seed.0.as_bytes(),
        block_hash.as_bytes(),
    ])))
}
