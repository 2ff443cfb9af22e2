//! Password-encrypted VRF key export
//!
//! The secret scalar is encrypted with ChaCha20-Poly1305 under a key derived
//! from the password via Argon2id. Passwords are prefixed with a fixed string
//! before derivation so a VRF key file cannot be opened as a wallet key with
//! the same password, and vice versa.
//!
//! # File Format
//!
//! ```json
//! {
//!   "public_key": "0x<x || y, 128 hex digits>",
//!   "vrf_key": {
//!     "crypto": {
//!       "cipher": "chacha20-poly1305",
//!       "ciphertext": "<hex>",
//!       "cipherparams": { "nonce": "<hex, 12 bytes>" },
//!       "kdf": "argon2id",
//!       "kdfparams": { "m_cost": 19456, "t_cost": 2, "p_cost": 1, "salt": "<hex, 32 bytes>" }
//!     },
//!     "version": 1
//!   }
//! }
//! ```

use argon2::{Algorithm, Argon2, Params, Version};
use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Nonce,
};
use k256::AffinePoint;
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::curve::{long_marshal, long_unmarshal};
use crate::error::{Error, Result};
use crate::key::KeyMaterial;
use crate::types::{hex_bytes_32, hex_vec};

/// Prepended to every password before key derivation
pub const PASSWORD_PREFIX: &str = "don't mix VRF and Ethereum keys!";

pub const CIPHER_NAME: &str = "chacha20-poly1305";
pub const KDF_NAME: &str = "argon2id";
pub const EXPORT_VERSION: u32 = 1;

/// Size of the nonce for ChaCha20-Poly1305
const NONCE_SIZE: usize = 12;

/// Size of the Argon2 salt
const SALT_SIZE: usize = 32;

/// Upper bounds on Argon2 costs read from a key file
pub const MAX_M_COST: u32 = 1 << 20;
pub const MAX_T_COST: u32 = 64;
pub const MAX_P_COST: u32 = 16;

/// Argon2id cost parameters and salt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KdfParams {
    /// Memory cost in KiB
    pub m_cost: u32,
    /// Iterations
    pub t_cost: u32,
    /// Parallelism
    pub p_cost: u32,
    #[serde(with = "hex_bytes_32")]
    pub salt: [u8; SALT_SIZE],
}

/// Argon2id costs without a salt, used when creating an export
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KdfCosts {
    pub m_cost: u32,
    pub t_cost: u32,
    pub p_cost: u32,
}

impl Default for KdfCosts {
    fn default() -> Self {
        Self {
            m_cost: Params::DEFAULT_M_COST,
            t_cost: Params::DEFAULT_T_COST,
            p_cost: Params::DEFAULT_P_COST,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CipherParams {
    #[serde(with = "hex_vec")]
    pub nonce: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CryptoJson {
    pub cipher: String,
    #[serde(with = "hex_vec")]
    pub ciphertext: Vec<u8>,
    pub cipherparams: CipherParams,
    pub kdf: String,
    pub kdfparams: KdfParams,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedKeyBody {
    pub crypto: CryptoJson,
    pub version: u32,
}

/// Encrypted key file contents
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedKeyExport {
    /// Public key as `0x` + hex of `x || y`
    pub public_key: String,
    pub vrf_key: EncryptedKeyBody,
}

impl EncryptedKeyExport {
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// The declared public key
    pub fn public_key(&self) -> Result<AffinePoint> {
        let digits = self
            .public_key
            .strip_prefix("0x")
            .unwrap_or(&self.public_key);
        let bytes = hex::decode(digits).map_err(|e| Error::InvalidPoint(e.to_string()))?;
        long_unmarshal(&bytes)
    }
}

/// Capability to open an encrypted key export
pub trait KeyDecryptor: Send + Sync {
    /// Key file representation this decryptor opens
    type Export;

    fn decrypt(&self, export: &Self::Export, password: &str) -> Result<KeyMaterial>;
}

/// Argon2id + ChaCha20-Poly1305 key file codec
#[derive(Debug, Clone, Copy, Default)]
pub struct PasswordKeyDecryptor;

impl PasswordKeyDecryptor {
    /// Encrypt `key` under `password` with fresh salt and nonce
    pub fn encrypt<R: RngCore + CryptoRng>(
        &self,
        key: &KeyMaterial,
        password: &str,
        costs: KdfCosts,
        rng: &mut R,
    ) -> Result<EncryptedKeyExport> {
        let mut salt = [0u8; SALT_SIZE];
        rng.fill_bytes(&mut salt);
        let mut nonce_bytes = [0u8; NONCE_SIZE];
        rng.fill_bytes(&mut nonce_bytes);

        let kdfparams = KdfParams {
            m_cost: costs.m_cost,
            t_cost: costs.t_cost,
            p_cost: costs.p_cost,
            salt,
        };
        let encryption_key = derive_encryption_key(password, &kdfparams)?;

        let cipher = ChaCha20Poly1305::new_from_slice(encryption_key.as_slice())
            .map_err(|e| Error::Decryption(format!("Invalid key: {}", e)))?;
        let secret = key.secret_bytes();
        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&nonce_bytes), secret.as_slice())
            .map_err(|e| Error::Decryption(format!("Encryption failed: {}", e)))?;

        Ok(EncryptedKeyExport {
            public_key: format!("0x{}", hex::encode(long_marshal(key.public_key())?)),
            vrf_key: EncryptedKeyBody {
                crypto: CryptoJson {
                    cipher: CIPHER_NAME.to_string(),
                    ciphertext,
                    cipherparams: CipherParams {
                        nonce: nonce_bytes.to_vec(),
                    },
                    kdf: KDF_NAME.to_string(),
                    kdfparams,
                },
                version: EXPORT_VERSION,
            },
        })
    }
}

impl KeyDecryptor for PasswordKeyDecryptor {
    type Export = EncryptedKeyExport;

    fn decrypt(&self, export: &EncryptedKeyExport, password: &str) -> Result<KeyMaterial> {
        let crypto = &export.vrf_key.crypto;
        if crypto.cipher != CIPHER_NAME {
            return Err(Error::Decryption(format!(
                "unsupported cipher: {}",
                crypto.cipher
            )));
        }
        if crypto.kdf != KDF_NAME {
            return Err(Error::Decryption(format!("unsupported kdf: {}", crypto.kdf)));
        }
        if crypto.cipherparams.nonce.len() != NONCE_SIZE {
            return Err(Error::Decryption("malformed nonce".to_string()));
        }

        let declared = export
            .public_key()
            .map_err(|e| Error::Decryption(format!("bad public key: {}", e)))?;

        let encryption_key = derive_encryption_key(password, &crypto.kdfparams)?;
        let cipher = ChaCha20Poly1305::new_from_slice(encryption_key.as_slice())
            .map_err(|e| Error::Decryption(format!("Invalid key: {}", e)))?;

        let plaintext = Zeroizing::new(
            cipher
                .decrypt(
                    Nonce::from_slice(&crypto.cipherparams.nonce),
                    crypto.ciphertext.as_slice(),
                )
                .map_err(|_| {
                    Error::Decryption("wrong password or corrupt ciphertext".to_string())
                })?,
        );

        let key = KeyMaterial::from_secret_bytes(&plaintext)
            .map_err(|_| Error::Decryption("decrypted secret is not a valid scalar".to_string()))?;
        if *key.public_key() != declared {
            return Err(Error::Decryption(format!(
                "decrypted key does not match public key {}",
                export.public_key
            )));
        }
        Ok(key)
    }
}

/// Password as fed to the key derivation function
pub(crate) fn adulterated_password(password: &str) -> Zeroizing<String> {
    Zeroizing::new(format!("{}{}", PASSWORD_PREFIX, password))
}

fn derive_encryption_key(password: &str, params: &KdfParams) -> Result<Zeroizing<[u8; 32]>> {
    if params.m_cost > MAX_M_COST || params.t_cost > MAX_T_COST || params.p_cost > MAX_P_COST {
        return Err(Error::Decryption(format!(
            "KDF costs m={} t={} p={} exceed the supported maximum",
            params.m_cost, params.t_cost, params.p_cost
        )));
    }
    let argon_params = Params::new(params.m_cost, params.t_cost, params.p_cost, Some(32))
        .map_err(|e| Error::Decryption(format!("Invalid KDF parameters: {}", e)))?;
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, argon_params);

    let adulterated = adulterated_password(password);
    let mut key = Zeroizing::new([0u8; 32]);
    argon2
        .hash_password_into(adulterated.as_bytes(), &params.salt, key.as_mut_slice())
        .map_err(|e| Error::Decryption(format!("Key derivation failed: {}", e)))?;
    Ok(key)
}
