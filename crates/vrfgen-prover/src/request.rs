//! Batch request inputs

use serde::{Deserialize, Serialize};
use vrfgen_core::{Address, H256};

use crate::error::{ProverError, Result};
use crate::partition::NonceRange;
use crate::seed::RequestContext;

pub const DEFAULT_NONCE_COUNT: u64 = 100;
pub const DEFAULT_CALLBACK_GAS_LIMIT: u64 = 100_000;
pub const DEFAULT_NUM_WORDS: u64 = 1;

/// One batch: nonces `1..=nonce_count` for a single requester and block.
///
/// Numeric inputs are taken wide and narrowed when the context is built.
/// The key password is never part of a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchRequest {
    #[serde(default = "default_nonce_count")]
    pub nonce_count: u64,
    pub sender: Address,
    pub subscription_id: u64,
    pub block_hash: H256,
    pub block_number: u64,
    #[serde(default = "default_callback_gas_limit")]
    pub callback_gas_limit: u64,
    #[serde(default = "default_num_words")]
    pub num_words: u64,
    /// Overrides the configured worker count
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workers: Option<usize>,
}

fn default_nonce_count() -> u64 {
    DEFAULT_NONCE_COUNT
}

fn default_callback_gas_limit() -> u64 {
    DEFAULT_CALLBACK_GAS_LIMIT
}

fn default_num_words() -> u64 {
    DEFAULT_NUM_WORDS
}

impl BatchRequest {
    /// Request with default count, gas limit and word count
    pub fn new(sender: Address, subscription_id: u64, block_hash: H256, block_number: u64) -> Self {
        Self {
            nonce_count: DEFAULT_NONCE_COUNT,
            sender,
            subscription_id,
            block_hash,
            block_number,
            callback_gas_limit: DEFAULT_CALLBACK_GAS_LIMIT,
            num_words: DEFAULT_NUM_WORDS,
            workers: None,
        }
    }

    /// Narrow to the fixed-width context hashed into every final seed
    pub fn context(&self) -> Result<RequestContext> {
        Ok(RequestContext {
            sender: self.sender,
            subscription_id: self.subscription_id,
            block_hash: self.block_hash,
            block_number: self.block_number,
            callback_gas_limit: narrow_u32("callback_gas_limit", self.callback_gas_limit)?,
            num_words: narrow_u32("num_words", self.num_words)?,
        })
    }

    /// The nonces this request covers
    pub fn nonce_range(&self) -> Result<NonceRange> {
        NonceRange::first(self.nonce_count)
    }
}

fn narrow_u32(field: &str, value: u64) -> Result<u32> {
    u32::try_from(value)
        .map_err(|_| ProverError::Encoding(format!("{} = {} does not fit in uint32", field, value)))
}
