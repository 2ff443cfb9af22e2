//! secp256k1 arithmetic used by proof construction and witness precomputation
//!
//! Points cross this module as k256 [`AffinePoint`]s. The hashing and
//! projective-addition routines follow the conventions of the Solidity VRF
//! verifier, so values computed here can be checked on-chain:
//!
//! - points are hashed in their 64-byte `x || y` form ("long marshal")
//! - hash-to-curve picks the even `y` root
//! - the projective sum uses the verifier's homogenized secant formula, whose
//!   `Z` coordinate is what the verifier expects an inverse for

use k256::{
    elliptic_curve::{
        ops::Reduce,
        sec1::{FromEncodedPoint, ToEncodedPoint},
        PrimeField,
    },
    AffinePoint, EncodedPoint, FieldBytes, FieldElement, ProjectivePoint, Scalar, U256,
};

use std::ops::Add;

use crate::crypto::keccak256;
use crate::error::{Error, Result};
use crate::types::{Address, H256};

/// secp256k1 base field prime, big-endian
pub const FIELD_SIZE: [u8; 32] = [
    0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
    0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xfe, 0xff, 0xff, 0xfc, 0x2f,
];

/// Domain separator prepended (as a uint256 word) when hashing to the curve
pub const HASH_TO_CURVE_PREFIX: u64 = 1;

/// Size of a point in `x || y` form
pub const LONG_POINT_SIZE: usize = 64;

/// A point in homogeneous projective coordinates `(X, Y, Z)`
#[derive(Debug, Clone, Copy)]
pub struct ProjectiveSum {
    pub x: FieldElement,
    pub y: FieldElement,
    pub z: FieldElement,
}

impl ProjectiveSum {
    /// Convert to affine form given a precomputed `Z⁻¹`
    pub fn to_affine(&self, z_inverse: &FieldElement) -> Result<AffinePoint> {
        let one = fe_mul(&self.z, z_inverse);
        if !fe_eq(&one, &FieldElement::ONE) {
            return Err(Error::Curve("Z inverse does not match Z".to_string()));
        }
        affine_from_field(&fe_mul(&self.x, z_inverse), &fe_mul(&self.y, z_inverse))
    }
}

/// Curve context: group operations over secp256k1 with a fixed generator
#[derive(Debug, Clone, Copy)]
pub struct Secp256k1 {
    generator: AffinePoint,
}

impl Default for Secp256k1 {
    fn default() -> Self {
        Self::new()
    }
}

impl Secp256k1 {
    pub fn new() -> Self {
        Self {
            generator: AffinePoint::GENERATOR,
        }
    }

    pub fn generator(&self) -> AffinePoint {
        self.generator
    }

    /// `k·P`
    pub fn mul(&self, k: &Scalar, point: &AffinePoint) -> AffinePoint {
        (ProjectivePoint::from(*point) * *k).to_affine()
    }

    /// `k·G`
    pub fn mul_generator(&self, k: &Scalar) -> AffinePoint {
        self.mul(k, &self.generator)
    }

    /// `P + Q`
    pub fn add(&self, p: &AffinePoint, q: &AffinePoint) -> AffinePoint {
        (ProjectivePoint::from(*p) + ProjectivePoint::from(*q)).to_affine()
    }

    /// `a·P + b·Q`
    pub fn linear_combination(
        &self,
        a: &Scalar,
        p: &AffinePoint,
        b: &Scalar,
        q: &AffinePoint,
    ) -> AffinePoint {
        (ProjectivePoint::from(*p) * *a + ProjectivePoint::from(*q) * *b).to_affine()
    }

    /// Deterministically map `(pk, seed)` to a curve point with even `y`
    pub fn hash_to_curve(&self, public_key: &AffinePoint, seed: &H256) -> Result<AffinePoint> {
        let mut msg = Vec::with_capacity(32 + LONG_POINT_SIZE + 32);
        msg.extend_from_slice(H256::from_u64(HASH_TO_CURVE_PREFIX).as_bytes());
        msg.extend_from_slice(&long_marshal(public_key)?);
        msg.extend_from_slice(seed.as_bytes());

        let mut x = field_hash(&msg);
        loop {
            if let Some(point) = even_point_with_x(&x) {
                return Ok(point);
            }
            x = field_hash(&x);
        }
    }

    /// Sum of two affine points in projective form, using the on-chain
    /// verifier's formula. Neither input may be the identity.
    ///
    /// `Z` is zero exactly when the two points share an x-coordinate.
    pub fn projective_add(&self, p: &AffinePoint, q: &AffinePoint) -> Result<ProjectiveSum> {
        let (px, py) = field_coordinates(p)?;
        let (qx, qy) = field_coordinates(q)?;
        let one = FieldElement::ONE;

        // gradient of the secant line, (qy - py) / (qx - px)
        let lx = fe_sub(&qy, &py);
        let lz = fe_sub(&qx, &px);

        // sx = gradient² - px - qx
        let (sx, dx) = projective_mul(&lx, &lz, &lx, &lz);
        let (sx, dx) = projective_sub(&sx, &dx, &px, &one);
        let (sx, dx) = projective_sub(&sx, &dx, &qx, &one);

        // sy = gradient·(px - sx) - py
        let (sy, dy) = projective_sub(&px, &one, &sx, &dx);
        let (sy, dy) = projective_mul(&sy, &dy, &lx, &lz);
        let (sy, dy) = projective_sub(&sy, &dy, &py, &one);

        if fe_eq(&dx, &dy) {
            Ok(ProjectiveSum {
                x: sx,
                y: sy,
                z: dx,
            })
        } else {
            Ok(ProjectiveSum {
                x: fe_mul(&sx, &dy),
                y: fe_mul(&sy, &dx),
                z: fe_mul(&dx, &dy),
            })
        }
    }

    /// Multiplicative inverse modulo the field prime; `None` for zero
    pub fn invert(&self, z: &FieldElement) -> Option<FieldElement> {
        let z = z.normalize();
        if bool::from(z.normalizes_to_zero()) {
            return None;
        }
        Option::from(z.invert()).map(|inv: FieldElement| inv.normalize())
    }
}

/// Hash `msg` uniformly into `[0, p)` by rehashing until below the field prime
pub fn field_hash(msg: &[u8]) -> [u8; 32] {
    let mut h = keccak256(msg);
    while h >= FIELD_SIZE {
        h = keccak256(&h);
    }
    h
}

/// Even-`y` point with the given x-coordinate, if `x³ + 7` is a square
fn even_point_with_x(x: &[u8; 32]) -> Option<AffinePoint> {
    point_with_x(x, false)
}

fn point_with_x(x: &[u8; 32], y_odd: bool) -> Option<AffinePoint> {
    let mut compressed = [0u8; 33];
    compressed[0] = if y_odd { 0x03 } else { 0x02 };
    compressed[1..].copy_from_slice(x);
    let encoded = EncodedPoint::from_bytes(compressed).ok()?;
    Option::from(AffinePoint::from_encoded_point(&encoded))
}

/// Size of a point in `x || parity` form
pub const COMPRESSED_POINT_SIZE: usize = 33;

/// Parse the 33-byte `x || parity` encoding used by Chainlink VRF keys, where
/// the trailing byte is `0` for even `y` and `1` for odd `y`
pub fn parity_unmarshal(bytes: &[u8]) -> Result<AffinePoint> {
    if bytes.len() != COMPRESSED_POINT_SIZE {
        return Err(Error::InvalidPoint(format!(
            "expected {} bytes, got {}",
            COMPRESSED_POINT_SIZE,
            bytes.len()
        )));
    }
    let y_odd = match bytes[32] {
        0 => false,
        1 => true,
        other => {
            return Err(Error::InvalidPoint(format!("invalid parity byte {}", other)));
        }
    };
    let mut x = [0u8; 32];
    x.copy_from_slice(&bytes[..32]);
    point_with_x(&x, y_odd).ok_or_else(|| Error::InvalidPoint("not on secp256k1".to_string()))
}

/// 33-byte `x || parity` encoding
pub fn parity_marshal(point: &AffinePoint) -> Result<[u8; COMPRESSED_POINT_SIZE]> {
    let (x, y) = coordinates(point)?;
    let mut out = [0u8; COMPRESSED_POINT_SIZE];
    out[..32].copy_from_slice(&x);
    out[32] = y[31] & 1;
    Ok(out)
}

/// Affine coordinates as big-endian bytes; fails for the identity
pub fn coordinates(point: &AffinePoint) -> Result<([u8; 32], [u8; 32])> {
    let encoded = point.to_encoded_point(false);
    let (x, y) = match (encoded.x(), encoded.y()) {
        (Some(x), Some(y)) => (x, y),
        _ => return Err(Error::InvalidPoint("point at infinity".to_string())),
    };
    let mut xb = [0u8; 32];
    let mut yb = [0u8; 32];
    xb.copy_from_slice(x);
    yb.copy_from_slice(y);
    Ok((xb, yb))
}

/// 64-byte `x || y` encoding
pub fn long_marshal(point: &AffinePoint) -> Result<[u8; LONG_POINT_SIZE]> {
    let (x, y) = coordinates(point)?;
    let mut out = [0u8; LONG_POINT_SIZE];
    out[..32].copy_from_slice(&x);
    out[32..].copy_from_slice(&y);
    Ok(out)
}

/// Parse a 64-byte `x || y` encoding, checking the point is on the curve
pub fn long_unmarshal(bytes: &[u8]) -> Result<AffinePoint> {
    if bytes.len() != LONG_POINT_SIZE {
        return Err(Error::InvalidPoint(format!(
            "expected {} bytes, got {}",
            LONG_POINT_SIZE,
            bytes.len()
        )));
    }
    let encoded = EncodedPoint::from_affine_coordinates(
        FieldBytes::from_slice(&bytes[..32]),
        FieldBytes::from_slice(&bytes[32..]),
        false,
    );
    Option::from(AffinePoint::from_encoded_point(&encoded))
        .ok_or_else(|| Error::InvalidPoint("not on secp256k1".to_string()))
}

/// Ethereum address of a point: last 20 bytes of `keccak256(x || y)`
pub fn ethereum_address(point: &AffinePoint) -> Result<Address> {
    let hash = keccak256(&long_marshal(point)?);
    let mut addr = [0u8; 20];
    addr.copy_from_slice(&hash[12..]);
    Ok(Address::new(addr))
}

/// Interpret a 256-bit big-endian value as a scalar, reducing modulo n
pub fn scalar_reduced(value: &H256) -> Scalar {
    <Scalar as Reduce<U256>>::reduce_bytes(&FieldBytes::from(value.0))
}

/// Interpret a 256-bit big-endian value as a scalar; fails unless below n
pub fn scalar_canonical(value: &H256) -> Result<Scalar> {
    Option::from(Scalar::from_repr(FieldBytes::from(value.0)))
        .ok_or_else(|| Error::Curve(format!("{} is not a canonical scalar", value)))
}

pub fn scalar_to_h256(scalar: &Scalar) -> H256 {
    H256(scalar.to_bytes().into())
}

pub fn field_to_h256(fe: &FieldElement) -> H256 {
    H256(fe.normalize().to_bytes().into())
}

/// Parse a field element; fails unless below p
pub fn field_from_h256(value: &H256) -> Result<FieldElement> {
    Option::from(FieldElement::from_bytes(&FieldBytes::from(value.0)))
        .ok_or_else(|| Error::Curve(format!("{} is not a field element", value)))
}

fn field_coordinates(point: &AffinePoint) -> Result<(FieldElement, FieldElement)> {
    let (x, y) = coordinates(point)?;
    Ok((field_from_h256(&H256(x))?, field_from_h256(&H256(y))?))
}

fn affine_from_field(x: &FieldElement, y: &FieldElement) -> Result<AffinePoint> {
    let encoded = EncodedPoint::from_affine_coordinates(
        &x.normalize().to_bytes(),
        &y.normalize().to_bytes(),
        false,
    );
    Option::from(AffinePoint::from_encoded_point(&encoded))
        .ok_or_else(|| Error::InvalidPoint("coordinates not on secp256k1".to_string()))
}

// Field helpers keep every intermediate normalized so magnitudes stay at 1.

fn fe_mul(a: &FieldElement, b: &FieldElement) -> FieldElement {
    a.mul(b).normalize()
}

fn fe_sub(a: &FieldElement, b: &FieldElement) -> FieldElement {
    a.normalize().add(&b.normalize().negate(1)).normalize()
}

fn fe_eq(a: &FieldElement, b: &FieldElement) -> bool {
    a.normalize().to_bytes() == b.normalize().to_bytes()
}

/// `x1/z1 - x2/z2` as a projective fraction
fn projective_sub(
    x1: &FieldElement,
    z1: &FieldElement,
    x2: &FieldElement,
    z2: &FieldElement,
) -> (FieldElement, FieldElement) {
    let num1 = fe_mul(z2, x1);
    let num2 = fe_mul(z1, x2);
    (fe_sub(&num1, &num2), fe_mul(z1, z2))
}

/// `(x1/z1)·(x2/z2)` as a projective fraction
fn projective_mul(
    x1: &FieldElement,
    z1: &FieldElement,
    x2: &FieldElement,
    z2: &FieldElement,
) -> (FieldElement, FieldElement) {
    (fe_mul(x1, x2), fe_mul(z1, z2))
}
