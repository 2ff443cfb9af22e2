//! secp256k1 VRF proofs in the form the Solidity verifier consumes
//!
//! Given secret `sk`, public key `PK = sk·G` and a seed:
//!
//! - `H = hash_to_curve(PK, seed)`, `Gamma = sk·H`
//! - `U = k·G`, `V = k·H` for a nonce `k`
//! - `c = keccak256(2 || H || PK || Gamma || V || address(U))`
//! - `s = k - c·sk mod n`
//! - `output = keccak256(3 || Gamma)`
//!
//! Verification recomputes `U = c·PK + s·G` and `V = c·Gamma + s·H` and checks
//! that they hash back to `c`.

use k256::{AffinePoint, Scalar};
use zeroize::Zeroizing;

use crate::crypto::{keccak256, keccak256_multi};
use crate::curve::{
    ethereum_address, long_marshal, scalar_canonical, scalar_reduced, scalar_to_h256, Secp256k1,
};
use crate::error::{Error, Result};
use crate::key::KeyMaterial;
use crate::types::{Address, H256};

/// Domain separator for the challenge hash
pub const SCALAR_FROM_CURVE_POINTS_PREFIX: u64 = 2;

/// Domain separator for the random output hash
pub const RANDOM_OUTPUT_PREFIX: u64 = 3;

/// A VRF proof for one seed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Proof {
    pub public_key: AffinePoint,
    pub gamma: AffinePoint,
    /// Challenge, kept as the full 256-bit hash
    pub c: H256,
    /// Response, below the group order
    pub s: H256,
    pub seed: H256,
    pub output: H256,
}

/// Capability to build and check VRF proofs
pub trait ProofConstruction: Send + Sync {
    /// Build a proof for `seed` under `key`
    fn generate_proof(&self, key: &KeyMaterial, seed: &H256) -> Result<Proof>;

    /// Check a proof. Degenerate proofs that an on-chain verifier cannot
    /// process are reported as errors.
    fn verify_proof(&self, proof: &Proof) -> Result<bool>;
}

/// Chainlink-compatible VRF over secp256k1 with deterministic nonces
#[derive(Debug, Clone, Default)]
pub struct Secp256k1Vrf {
    curve: Secp256k1,
}

impl Secp256k1Vrf {
    pub fn new(curve: Secp256k1) -> Self {
        Self { curve }
    }

    pub fn curve(&self) -> &Secp256k1 {
        &self.curve
    }

    /// `k = keccak256(sk || seed || counter) mod n`, first non-zero value
    fn nonce(&self, key: &KeyMaterial, seed: &H256) -> Scalar {
        let secret = key.secret_bytes();
        let mut counter: u64 = 0;
        loop {
            let digest = Zeroizing::new(keccak256_multi(&[
                secret.as_slice(),
                seed.as_bytes(),
                &counter.to_be_bytes(),
            ]));
            let k = scalar_reduced(&H256(*digest));
            if !bool::from(k.is_zero()) {
                return k;
            }
            counter += 1;
        }
    }
}

impl ProofConstruction for Secp256k1Vrf {
    fn generate_proof(&self, key: &KeyMaterial, seed: &H256) -> Result<Proof> {
        let sk = key.secret_scalar();
        let public_key = *key.public_key();

        let hash = self.curve.hash_to_curve(&public_key, seed)?;
        let gamma = self.curve.mul(&sk, &hash);

        let k = self.nonce(key, seed);
        let u_witness = ethereum_address(&self.curve.mul_generator(&k))?;
        let v = self.curve.mul(&k, &hash);

        let c = scalar_from_curve_points(&hash, &public_key, &gamma, &u_witness, &v)?;
        let s = k - scalar_reduced(&c) * sk;

        let proof = Proof {
            public_key,
            gamma,
            c,
            s: scalar_to_h256(&s),
            seed: *seed,
            output: random_output(&gamma)?,
        };

        if !self.verify_proof(&proof)? {
            return Err(Error::ProofConstruction(
                "constructed proof failed verification".to_string(),
            ));
        }
        Ok(proof)
    }

    fn verify_proof(&self, proof: &Proof) -> Result<bool> {
        let hash = self.curve.hash_to_curve(&proof.public_key, &proof.seed)?;
        let c = scalar_reduced(&proof.c);
        let s = scalar_canonical(&proof.s)?;

        let c_gamma = self.curve.mul(&c, &proof.gamma);
        let s_hash = self.curve.mul(&s, &hash);
        if c_gamma == s_hash {
            return Err(Error::ProofConstruction(
                "c·gamma equals s·hash; proof cannot be verified on-chain".to_string(),
            ));
        }

        let u = self
            .curve
            .linear_combination(&c, &proof.public_key, &s, &self.curve.generator());
        let v = self.curve.add(&c_gamma, &s_hash);
        let u_witness = ethereum_address(&u)?;

        let c_prime = scalar_from_curve_points(&hash, &proof.public_key, &proof.gamma, &u_witness, &v)?;
        Ok(c_prime == proof.c && random_output(&proof.gamma)? == proof.output)
    }
}

/// Challenge hash over the proof's curve points and the `U` witness address
pub fn scalar_from_curve_points(
    hash: &AffinePoint,
    public_key: &AffinePoint,
    gamma: &AffinePoint,
    u_witness: &Address,
    v: &AffinePoint,
) -> Result<H256> {
    let mut msg = Vec::with_capacity(32 + 4 * 64 + 20);
    msg.extend_from_slice(H256::from_u64(SCALAR_FROM_CURVE_POINTS_PREFIX).as_bytes());
    for point in [hash, public_key, gamma, v] {
        msg.extend_from_slice(&long_marshal(point)?);
    }
    msg.extend_from_slice(u_witness.as_bytes());
    Ok(H256(keccak256(&msg)))
}

/// VRF output derived from `Gamma`
pub fn random_output(gamma: &AffinePoint) -> Result<H256> {
    Ok(H256(keccak256_multi(&[
        H256::from_u64(RANDOM_OUTPUT_PREFIX).as_bytes(),
        &long_marshal(gamma)?,
    ])))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_key() -> KeyMaterial {
        KeyMaterial::from_secret_bytes(&[0x42; 32]).unwrap()
    }

    #[test]
    fn test_generated_proof_verifies() {
        let vrf = Secp256k1Vrf::default();
        let proof = vrf.generate_proof(&test_key(), &H256::from_u64(1)).unwrap();
        assert!(vrf.verify_proof(&proof).unwrap());
        assert_eq!(proof.public_key, *test_key().public_key());
        assert_eq!(proof.seed, H256::from_u64(1));
    }

    #[test]
    fn test_proofs_are_deterministic() {
        let vrf = Secp256k1Vrf::default();
        let a = vrf.generate_proof(&test_key(), &H256::from_u64(7)).unwrap();
        let b = vrf.generate_proof(&test_key(), &H256::from_u64(7)).unwrap();
        assert_eq!(a, b);

        let c = vrf.generate_proof(&test_key(), &H256::from_u64(8)).unwrap();
        assert_ne!(a.output, c.output);
    }

    #[test]
    fn test_tampered_proofs_fail() {
        let vrf = Secp256k1Vrf::default();
        let proof = vrf.generate_proof(&test_key(), &H256::from_u64(3)).unwrap();

        let mut bad_c = proof;
        bad_c.c.0[31] ^= 1;
        assert!(!vrf.verify_proof(&bad_c).unwrap_or(false));

        let mut bad_s = proof;
        bad_s.s.0[31] ^= 1;
        assert!(!vrf.verify_proof(&bad_s).unwrap_or(false));

        let mut bad_output = proof;
        bad_output.output.0[0] ^= 1;
        assert!(!vrf.verify_proof(&bad_output).unwrap());

        let mut bad_gamma = proof;
        bad_gamma.gamma = vrf.curve().generator();
        assert!(!vrf.verify_proof(&bad_gamma).unwrap_or(false));
    }

    #[test]
    fn test_output_is_hash_of_gamma() {
        let vrf = Secp256k1Vrf::default();
        let proof = vrf.generate_proof(&test_key(), &H256::from_u64(11)).unwrap();
        assert_eq!(proof.output, random_output(&proof.gamma).unwrap());
    }

    // Values computed with a separate big-integer implementation of the
    // VRF.sol formulas (plain Python integers and a from-scratch keccak256),
    // not with this crate.
    #[test]
    fn test_known_answer_vector() {
        let vrf = Secp256k1Vrf::default();
        let key = test_key();
        let seed = H256::from_u64(1);

        assert_eq!(
            hex::encode(long_marshal(key.public_key()).unwrap()),
            "24653eac434488002cc06bbfb7f10fe18991e35f9fe4302dbea6d2353dc0ab1c\
             119fc5009a032aa9fe47f5e149bb8442f71f884ccb516590686d8ff6ab91c613"
        );
        let hash = vrf.curve().hash_to_curve(key.public_key(), &seed).unwrap();
        assert_eq!(
            hex::encode(long_marshal(&hash).unwrap()),
            "7d8bd4a24e5f7ccd34fcb70efb15266367ff04f8a5a6c2245ee52409c57fa9ea\
             aea078c1b213b3789f8d3b42b0d36fea129e19160935a0637f6399f1c9acab46"
        );

        let proof = vrf.generate_proof(&key, &seed).unwrap();
        assert_eq!(
            hex::encode(long_marshal(&proof.gamma).unwrap()),
            "52d071b93498469cd3027c31d1b47daed9414b123d183df66cabb60d1baae4ce\
             f4e8cd36b6b466145f64e6bb7b8a7274f8d6d89370a7c25ef863c0d4aa753ff0"
        );
        assert_eq!(
            proof.c.to_hex(),
            "9ef65bfca12c699655a363bc263531e51e022b512856c921dd7908240123ccbc"
        );
        assert_eq!(
            proof.s.to_hex(),
            "e0b7d8aa336280c0c70c35b9253cd4aef5d46d95676f9467e4b24a0c306ae42e"
        );
        assert_eq!(
            proof.output.to_hex(),
            "a9edd630a4a1563a27f1fee47ad0eb76fcd2e19fa540b75bb73e7b9b0614a182"
        );
    }
}
