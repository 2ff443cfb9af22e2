//! Chainlink node VRF key exports
//!
//! A Chainlink node exports a VRF key as its compressed public key next to a
//! go-ethereum v3 keystore entry holding the secret. The keystore is opened
//! with the same prefixed password as [`crate::keyfile`] files.
//!
//! # File Format
//!
//! ```json
//! {
//!   "PublicKey": "0x<x, 64 hex digits><parity, 00 or 01>",
//!   "vrf_key": {
//!     "address": "<hex, 20 bytes>",
//!     "crypto": {
//!       "cipher": "aes-128-ctr",
//!       "ciphertext": "<hex>",
//!       "cipherparams": { "iv": "<hex, 16 bytes>" },
//!       "kdf": "scrypt",
//!       "kdfparams": { "dklen": 32, "n": 262144, "p": 1, "r": 8, "salt": "<hex>" },
//!       "mac": "<hex, keccak256(derivedKey[16..32] || ciphertext)>"
//!     },
//!     "version": 3
//!   }
//! }
//! ```

use aes::Aes128;
use ctr::cipher::{KeyIvInit, StreamCipher};
use k256::AffinePoint;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::crypto::keccak256_multi;
use crate::curve::{ethereum_address, parity_unmarshal};
use crate::error::{Error, Result};
use crate::key::KeyMaterial;
use crate::keyfile::{
    adulterated_password, EncryptedKeyExport, KeyDecryptor, PasswordKeyDecryptor,
};
use crate::types::{hex_bytes_32, hex_vec, Address};

type Aes128Ctr = ctr::Ctr128BE<Aes128>;

pub const KEYSTORE_CIPHER: &str = "aes-128-ctr";
pub const KEYSTORE_KDF: &str = "scrypt";
pub const KEYSTORE_VERSION: u32 = 3;

/// Largest scrypt working set accepted from a key file, `128·r·n` bytes.
/// Covers go-ethereum's standard `n = 2^18, r = 8`.
pub const MAX_SCRYPT_MEMORY: u64 = 256 * 1024 * 1024;
pub const MAX_SCRYPT_P: u32 = 16;

const DERIVED_KEY_SIZE: usize = 32;
const IV_SIZE: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScryptParams {
    pub dklen: u32,
    pub n: u64,
    pub p: u32,
    pub r: u32,
    #[serde(with = "hex_vec")]
    pub salt: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CtrParams {
    #[serde(with = "hex_vec")]
    pub iv: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeystoreCrypto {
    pub cipher: String,
    #[serde(with = "hex_vec")]
    pub ciphertext: Vec<u8>,
    pub cipherparams: CtrParams,
    pub kdf: String,
    pub kdfparams: ScryptParams,
    #[serde(with = "hex_bytes_32")]
    pub mac: [u8; 32],
}

/// go-ethereum v3 keystore entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeystoreEntry {
    #[serde(default)]
    pub address: String,
    pub crypto: KeystoreCrypto,
    pub version: u32,
}

/// VRF key as exported by a Chainlink node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainlinkKeyExport {
    #[serde(rename = "PublicKey")]
    pub public_key: String,
    pub vrf_key: KeystoreEntry,
}

impl ChainlinkKeyExport {
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// The declared public key
    pub fn public_key(&self) -> Result<AffinePoint> {
        let digits = self
            .public_key
            .strip_prefix("0x")
            .unwrap_or(&self.public_key);
        let bytes = hex::decode(digits).map_err(|e| Error::InvalidPoint(e.to_string()))?;
        parity_unmarshal(&bytes)
    }

    /// The keystore's recorded address, if present
    pub fn address(&self) -> Result<Option<Address>> {
        if self.vrf_key.address.is_empty() {
            return Ok(None);
        }
        Address::from_hex(&self.vrf_key.address).map(Some)
    }
}

/// Opens Chainlink VRF key exports (scrypt + AES-128-CTR + keccak MAC)
#[derive(Debug, Clone, Copy, Default)]
pub struct KeystoreDecryptor;

impl KeyDecryptor for KeystoreDecryptor {
    type Export = ChainlinkKeyExport;

    fn decrypt(&self, export: &ChainlinkKeyExport, password: &str) -> Result<KeyMaterial> {
        let entry = &export.vrf_key;
        if entry.version != KEYSTORE_VERSION {
            return Err(Error::Decryption(format!(
                "unsupported keystore version: {}",
                entry.version
            )));
        }
        let crypto = &entry.crypto;
        if crypto.cipher != KEYSTORE_CIPHER {
            return Err(Error::Decryption(format!(
                "unsupported cipher: {}",
                crypto.cipher
            )));
        }
        if crypto.kdf != KEYSTORE_KDF {
            return Err(Error::Decryption(format!("unsupported kdf: {}", crypto.kdf)));
        }
        if crypto.cipherparams.iv.len() != IV_SIZE {
            return Err(Error::Decryption("malformed iv".to_string()));
        }

        let declared = export
            .public_key()
            .map_err(|e| Error::Decryption(format!("bad public key: {}", e)))?;

        let derived = derive_keystore_key(password, &crypto.kdfparams)?;
        let mac = keccak256_multi(&[&derived[16..32], crypto.ciphertext.as_slice()]);
        if mac != crypto.mac {
            return Err(Error::Decryption(
                "wrong password or corrupt keystore".to_string(),
            ));
        }

        let mut plaintext = Zeroizing::new(crypto.ciphertext.clone());
        let mut cipher = Aes128Ctr::new_from_slices(&derived[..16], &crypto.cipherparams.iv)
            .map_err(|e| Error::Decryption(format!("Invalid key: {}", e)))?;
        cipher.apply_keystream(plaintext.as_mut_slice());

        let key = KeyMaterial::from_secret_bytes(&plaintext)
            .map_err(|_| Error::Decryption("decrypted secret is not a valid scalar".to_string()))?;
        if *key.public_key() != declared {
            return Err(Error::Decryption(format!(
                "decrypted key does not match public key {}",
                export.public_key
            )));
        }
        let recorded = export
            .address()
            .map_err(|e| Error::Decryption(format!("bad address: {}", e)))?;
        if let Some(address) = recorded {
            if ethereum_address(key.public_key())? != address {
                return Err(Error::Decryption(format!(
                    "decrypted key does not match address {}",
                    address
                )));
            }
        }
        Ok(key)
    }
}

/// Any key file the prover can open
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyFile {
    /// Argon2id + ChaCha20-Poly1305 export written by `vrfgen keygen`
    Native(EncryptedKeyExport),
    /// geth v3 keystore exported from a Chainlink node
    Chainlink(ChainlinkKeyExport),
}

impl KeyFile {
    /// Parse either format. Chainlink exports are recognised by their
    /// `PublicKey` field.
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_slice(bytes)?;
        if value.get("PublicKey").is_some() {
            Ok(KeyFile::Chainlink(serde_json::from_value(value)?))
        } else {
            Ok(KeyFile::Native(serde_json::from_value(value)?))
        }
    }

    /// The declared public key
    pub fn public_key(&self) -> Result<AffinePoint> {
        match self {
            KeyFile::Native(export) => export.public_key(),
            KeyFile::Chainlink(export) => export.public_key(),
        }
    }

    pub fn format_name(&self) -> &'static str {
        match self {
            KeyFile::Native(_) => "argon2id",
            KeyFile::Chainlink(_) => "chainlink",
        }
    }
}

/// Opens a [`KeyFile`] with the decryptor for its format
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyFileDecryptor;

impl KeyDecryptor for KeyFileDecryptor {
    type Export = KeyFile;

    fn decrypt(&self, export: &KeyFile, password: &str) -> Result<KeyMaterial> {
        match export {
            KeyFile::Native(export) => PasswordKeyDecryptor.decrypt(export, password),
            KeyFile::Chainlink(export) => KeystoreDecryptor.decrypt(export, password),
        }
    }
}

fn derive_keystore_key(
    password: &str,
    params: &ScryptParams,
) -> Result<Zeroizing<[u8; DERIVED_KEY_SIZE]>> {
    if params.dklen as usize != DERIVED_KEY_SIZE {
        return Err(Error::Decryption(format!(
            "unsupported dklen: {}",
            params.dklen
        )));
    }
    if params.n < 2 || !params.n.is_power_of_two() {
        return Err(Error::Decryption(format!(
            "scrypt n must be a power of two, got {}",
            params.n
        )));
    }
    let memory = 128u64
        .checked_mul(params.r as u64)
        .and_then(|m| m.checked_mul(params.n));
    if params.r == 0
        || params.p == 0
        || params.p > MAX_SCRYPT_P
        || memory.map_or(true, |m| m > MAX_SCRYPT_MEMORY)
    {
        return Err(Error::Decryption(format!(
            "scrypt costs n={} r={} p={} exceed the supported maximum",
            params.n, params.r, params.p
        )));
    }

    let log_n = params.n.trailing_zeros() as u8;
    let scrypt_params = scrypt::Params::new(log_n, params.r, params.p, DERIVED_KEY_SIZE)
        .map_err(|e| Error::Decryption(format!("Invalid KDF parameters: {}", e)))?;

    let adulterated = adulterated_password(password);
    let mut key = Zeroizing::new([0u8; DERIVED_KEY_SIZE]);
    scrypt::scrypt(
        adulterated.as_bytes(),
        &params.salt,
        &scrypt_params,
        key.as_mut_slice(),
    )
    .map_err(|e| Error::Decryption(format!("Key derivation failed: {}", e)))?;
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curve::long_marshal;

    /// Export embedded in the original browser generator. Its password is not
    /// published, so only the public half can be checked.
    const NODE_EXPORT: &str = r#"{"PublicKey":"0x8f5bbd639829c8b5ad8724d96cf93a15cf6d8ed5f2cf7304899776ef8252d22800","vrf_key":{"address":"d87b7ec9a37ee5a4a7252b3ef924b204b24f3ec5","crypto":{"cipher":"aes-128-ctr","ciphertext":"8db11174e5d37f535be561c0fd9363a68b383916543d9cf8ce1c04102c65a398","cipherparams":{"iv":"4b176326b2f24d14b2cb870e813f28a0"},"kdf":"scrypt","kdfparams":{"dklen":32,"n":262144,"p":1,"r":8,"salt":"aa07a44029657fdd14cebfd0644a8e7505fbf7b6f9010ab6d45ff4b954a90da6"},"mac":"5382bd72094469d28a6d47862b1df0e7dce4293e6c1c9235163acca37ae5df61"},"version":3}}"#;

    /// Secret 0x42..42 under "correct horse battery staple", scrypt n = 4096,
    /// built with Python's hashlib.scrypt and OpenSSL AES-128-CTR
    const FIXTURE_EXPORT: &str = r#"{"PublicKey":"0x24653eac434488002cc06bbfb7f10fe18991e35f9fe4302dbea6d2353dc0ab1c01","vrf_key":{"address":"17c5185167401ed00cf5f5b2fc97d9bbfdb7d025","crypto":{"cipher":"aes-128-ctr","ciphertext":"fbf9d76894be51f4bb62f6962c3531413e0d7764e90aadeddea76f7ad5ed0d81","cipherparams":{"iv":"a0a1a2a3a4a5a6a7a8a9aaabacadaeaf"},"kdf":"scrypt","kdfparams":{"dklen":32,"n":4096,"p":1,"r":8,"salt":"000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f"},"mac":"b68e5f2ba27974e725a7b7be82e3f421dfbcfbbeb7696137ec2cedbf83a29184"},"version":3}}"#;

    const FIXTURE_PASSWORD: &str = "correct horse battery staple";

    fn fixture() -> ChainlinkKeyExport {
        ChainlinkKeyExport::from_json(FIXTURE_EXPORT.as_bytes()).unwrap()
    }

    #[test]
    fn test_node_export_public_key_matches_address() {
        let export = ChainlinkKeyExport::from_json(NODE_EXPORT.as_bytes()).unwrap();
        let pk = export.public_key().unwrap();
        assert_eq!(
            ethereum_address(&pk).unwrap(),
            export.address().unwrap().unwrap()
        );
        assert_eq!(export.vrf_key.crypto.kdfparams.n, 262_144);
    }

    #[test]
    fn test_fixture_decrypts() {
        let key = KeystoreDecryptor.decrypt(&fixture(), FIXTURE_PASSWORD).unwrap();
        assert_eq!(key, KeyMaterial::from_secret_bytes(&[0x42; 32]).unwrap());
        assert_eq!(
            key.key_hash().to_string(),
            "0xd885744b9cb252077d755ad317c5185167401ed00cf5f5b2fc97d9bbfdb7d025"
        );
        assert_eq!(
            hex::encode(long_marshal(key.public_key()).unwrap()),
            "24653eac434488002cc06bbfb7f10fe18991e35f9fe4302dbea6d2353dc0ab1c\
             119fc5009a032aa9fe47f5e149bb8442f71f884ccb516590686d8ff6ab91c613"
        );
    }

    #[test]
    fn test_wrong_password_fails_mac() {
        let result = KeystoreDecryptor.decrypt(&fixture(), "correct horse battery stapler");
        assert!(matches!(result, Err(Error::Decryption(ref msg)) if msg.contains("wrong password")));
    }

    #[test]
    fn test_tampered_ciphertext_fails_mac() {
        let mut export = fixture();
        export.vrf_key.crypto.ciphertext[0] ^= 0x01;
        let result = KeystoreDecryptor.decrypt(&export, FIXTURE_PASSWORD);
        assert!(matches!(result, Err(Error::Decryption(_))));
    }

    #[test]
    fn test_mismatched_public_key_fails() {
        let mut export = fixture();
        export.public_key = ChainlinkKeyExport::from_json(NODE_EXPORT.as_bytes())
            .unwrap()
            .public_key;
        let result = KeystoreDecryptor.decrypt(&export, FIXTURE_PASSWORD);
        assert!(matches!(result, Err(Error::Decryption(ref msg)) if msg.contains("public key")));
    }

    #[test]
    fn test_excessive_scrypt_costs_are_rejected() {
        for (n, r, p) in [(1u64 << 40, 8, 1), (1 << 18, 16, 1), (4096, 8, 1000), (3000, 8, 1)] {
            let mut export = fixture();
            export.vrf_key.crypto.kdfparams.n = n;
            export.vrf_key.crypto.kdfparams.r = r;
            export.vrf_key.crypto.kdfparams.p = p;
            let result = KeystoreDecryptor.decrypt(&export, FIXTURE_PASSWORD);
            assert!(matches!(result, Err(Error::Decryption(_))), "n={} r={} p={}", n, r, p);
        }
    }

    #[test]
    fn test_unsupported_versions_and_ciphers() {
        let mut export = fixture();
        export.vrf_key.version = 1;
        assert!(KeystoreDecryptor.decrypt(&export, FIXTURE_PASSWORD).is_err());

        let mut export = fixture();
        export.vrf_key.crypto.kdf = "pbkdf2".to_string();
        assert!(KeystoreDecryptor.decrypt(&export, FIXTURE_PASSWORD).is_err());
    }

    #[test]
    fn test_key_file_detects_format() {
        let file = KeyFile::from_json(FIXTURE_EXPORT.as_bytes()).unwrap();
        assert_eq!(file.format_name(), "chainlink");
        let key = KeyFileDecryptor.decrypt(&file, FIXTURE_PASSWORD).unwrap();
        assert_eq!(key.public_key(), &file.public_key().unwrap());

        let native = PasswordKeyDecryptor
            .encrypt(
                &key,
                "pw",
                crate::KdfCosts {
                    m_cost: 64,
                    t_cost: 1,
                    p_cost: 1,
                },
                &mut rand::rngs::OsRng,
            )
            .unwrap();
        let file = KeyFile::from_json(native.to_json_pretty().unwrap().as_bytes()).unwrap();
        assert_eq!(file.format_name(), "argon2id");
        assert_eq!(KeyFileDecryptor.decrypt(&file, "pw").unwrap(), key);
    }

    #[test]
    fn test_key_file_rejects_unknown_shapes() {
        assert!(matches!(
            KeyFile::from_json(br#"{"address":"00"}"#),
            Err(Error::Json(_))
        ));
        assert!(KeyFile::from_json(b"not json").is_err());
    }
}
