//! Hash primitives

use sha3::{Digest, Keccak256};

/// Hash data using Keccak-256 (the pre-standard variant Ethereum uses)
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Hash multiple pieces of data using Keccak-256
pub fn keccak256_multi(data: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    for d in data {
        hasher.update(d);
    }
    hasher.finalize().into()
}
