//! Auxiliary values that let the on-chain verifier check a proof cheaply
//!
//! The verifier avoids scalar multiplications and field inversions by taking
//! their results as inputs and checking them with `ecrecover` and a single
//! multiplication. Everything here is derived from a [`Proof`] alone.

use vrfgen_core::{
    curve::{ethereum_address, field_to_h256, scalar_canonical, scalar_reduced},
    Address, AffinePoint, Proof, Secp256k1, H256,
};

use crate::error::{ProverError, Result};

/// Precomputed verifier inputs for one proof
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SolidityWitness {
    /// `address(c·PK + s·G)`
    pub u_witness: Address,
    /// `c·Gamma`
    pub c_gamma_witness: AffinePoint,
    /// `s·H` where `H = hashToCurve(PK, seed)`
    pub s_hash_witness: AffinePoint,
    /// Inverse of the `Z` coordinate of `c·Gamma + s·H` as the verifier adds them
    pub z_inverse: H256,
}

/// Derive the verifier witnesses for `proof`.
///
/// Fails with [`ProverError::NonInvertibleZ`] when `c·Gamma` and `s·H` share an
/// x-coordinate, which includes the case where they are equal.
pub fn precompute(curve: &Secp256k1, proof: &Proof) -> Result<SolidityWitness> {
    let c = scalar_reduced(&proof.c);
    let s = scalar_canonical(&proof.s)?;

    let u = curve.linear_combination(&c, &proof.public_key, &s, &curve.generator());
    let u_witness = ethereum_address(&u)?;

    let hash = curve.hash_to_curve(&proof.public_key, &proof.seed)?;
    let c_gamma_witness = curve.mul(&c, &proof.gamma);
    let s_hash_witness = curve.mul(&s, &hash);

    let sum = curve.projective_add(&c_gamma_witness, &s_hash_witness)?;
    let z_inverse = curve.invert(&sum.z).ok_or(ProverError::NonInvertibleZ)?;

    Ok(SolidityWitness {
        u_witness,
        c_gamma_witness,
        s_hash_witness,
        z_inverse: field_to_h256(&z_inverse),
    })
}
