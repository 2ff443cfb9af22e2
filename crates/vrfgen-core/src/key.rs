//! Decrypted VRF signing key

use k256::{elliptic_curve::sec1::ToEncodedPoint, AffinePoint, Scalar, SecretKey};
use rand::{CryptoRng, RngCore};
use zeroize::Zeroizing;

use crate::crypto::keccak256;
use crate::error::{Error, Result};
use crate::types::H256;

/// A VRF key pair. Immutable once constructed; the secret is zeroized on drop.
#[derive(Clone)]
pub struct KeyMaterial {
    secret: SecretKey,
    public_key: AffinePoint,
    key_hash: H256,
}

impl KeyMaterial {
    pub fn from_secret_key(secret: SecretKey) -> Self {
        let public = secret.public_key();
        let encoded = public.to_encoded_point(false);
        // uncompressed SEC1: 0x04 || x || y
        let key_hash = H256(keccak256(&encoded.as_bytes()[1..]));
        Self {
            public_key: *public.as_affine(),
            secret,
            key_hash,
        }
    }

    /// Build from a 32-byte big-endian secret scalar
    pub fn from_secret_bytes(bytes: &[u8]) -> Result<Self> {
        let secret = SecretKey::from_slice(bytes)
            .map_err(|_| Error::Curve("invalid secret scalar".to_string()))?;
        Ok(Self::from_secret_key(secret))
    }

    /// Generate a fresh random key
    pub fn generate<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        Self::from_secret_key(SecretKey::random(rng))
    }

    pub fn public_key(&self) -> &AffinePoint {
        &self.public_key
    }

    /// keccak256 of the public key's `x || y` form; identifies the key on-chain
    pub fn key_hash(&self) -> H256 {
        self.key_hash
    }

    pub fn secret_scalar(&self) -> Scalar {
        *self.secret.to_nonzero_scalar()
    }

    pub fn secret_bytes(&self) -> Zeroizing<[u8; 32]> {
        Zeroizing::new(self.secret.to_bytes().into())
    }
}

impl PartialEq for KeyMaterial {
    fn eq(&self, other: &Self) -> bool {
        self.public_key == other.public_key
    }
}

impl Eq for KeyMaterial {}

impl core::fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("key_hash", &self.key_hash)
            .field("secret", &"[REDACTED]")
            .finish()
    }
}
