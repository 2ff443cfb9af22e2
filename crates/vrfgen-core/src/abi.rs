//! Solidity ABI encoding for the static types used in seed derivation
//!
//! Only head encoding of static values is supported: every token occupies one
//! 32-byte word, matching `abi.encode(...)` for `bytes32`, `address`, and
//! `uintN` arguments.

use crate::error::{Error, Result};
use crate::types::{Address, H256};

/// Size of one ABI word
pub const WORD_SIZE: usize = 32;

/// A typed value to be ABI-encoded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token {
    /// `bytes32`
    FixedBytes(H256),
    /// `address`
    Address(Address),
    /// `uintN`, where `bits` is a multiple of 8 in `8..=256`
    Uint { bits: u16, value: u128 },
}

impl Token {
    pub fn uint64(value: u64) -> Self {
        Token::Uint {
            bits: 64,
            value: value as u128,
        }
    }

    /// A `uint32` argument supplied from a wider integer; width is checked at
    /// encoding time
    pub fn uint32(value: u64) -> Self {
        Token::Uint {
            bits: 32,
            value: value as u128,
        }
    }

    /// Solidity type name, for error messages
    pub fn type_name(&self) -> String {
        match self {
            Token::FixedBytes(_) => "bytes32".to_string(),
            Token::Address(_) => "address".to_string(),
            Token::Uint { bits, .. } => format!("uint{}", bits),
        }
    }

    fn encode_word(&self) -> Result<[u8; WORD_SIZE]> {
        let mut word = [0u8; WORD_SIZE];
        match self {
            Token::FixedBytes(h) => word.copy_from_slice(h.as_bytes()),
            Token::Address(a) => word[12..].copy_from_slice(a.as_bytes()),
            Token::Uint { bits, value } => {
                if *bits == 0 || *bits > 256 || bits % 8 != 0 {
                    return Err(Error::Encoding(format!("invalid integer width: {}", bits)));
                }
                if *bits < 128 && *value >> bits != 0 {
                    return Err(Error::Encoding(format!(
                        "value {} does not fit in {}",
                        value,
                        self.type_name()
                    )));
                }
                word[16..].copy_from_slice(&value.to_be_bytes());
            }
        }
        Ok(word)
    }
}

/// Encode a list of tokens as `abi.encode(...)` would
pub fn encode(tokens: &[Token]) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(tokens.len() * WORD_SIZE);
    for token in tokens {
        out.extend_from_slice(&token.encode_word()?);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_is_left_padded() {
        let encoded = encode(&[Token::Address(Address::new([0xff; 20]))]).unwrap();
        assert_eq!(encoded.len(), 32);
        assert!(encoded[..12].iter().all(|&b| b == 0));
        assert!(encoded[12..].iter().all(|&b| b == 0xff));
    }

    #[test]
    fn test_uint_is_right_aligned() {
        let encoded = encode(&[Token::uint64(258)]).unwrap();
        assert_eq!(encoded[30], 0x01);
        assert_eq!(encoded[31], 0x02);
        assert!(encoded[..30].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_multiple_tokens_concatenate() {
        let tokens = [
            Token::FixedBytes(H256::new([7u8; 32])),
            Token::Address(Address::new([1u8; 20])),
            Token::uint64(1),
            Token::uint64(2),
        ];
        let encoded = encode(&tokens).unwrap();
        assert_eq!(encoded.len(), 4 * WORD_SIZE);
        assert_eq!(&encoded[..32], &[7u8; 32]);
        assert_eq!(encoded[127], 2);
    }

    #[test]
    fn test_uint32_overflow_is_rejected() {
        let result = encode(&[Token::uint32(u32::MAX as u64 + 1)]);
        assert!(matches!(result, Err(Error::Encoding(_))));
        assert!(encode(&[Token::uint32(u32::MAX as u64)]).is_ok());
    }

    #[test]
    fn test_invalid_width_is_rejected() {
        let result = encode(&[Token::Uint { bits: 12, value: 1 }]);
        assert!(matches!(result, Err(Error::Encoding(_))));
    }
}
