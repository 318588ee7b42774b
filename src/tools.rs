// Copyright 2019 Stichting Organism
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The Extra Sauce
//! secp256k1 point tooling shared by the signing and verification paths.
//!
//! We provide a `PointBoth` type that contains an uncompressed
//! `AffinePoint` alongside its matching SEC1 compressed encoding,
//! which helps the challenge hashes avoid duplicate point compressions.
//!
//! Verification lives here too: a `ScratchSpace`-bounded variable-time
//! multi-scalar multiplication that streams its coefficients from a
//! caller-supplied closure, plus the quadratic-residue tests used to
//! normalize nonces so that signatures carry only an x coordinate.

use core::fmt::Debug;
use k256::elliptic_curve::point::DecompressPoint;
use k256::elliptic_curve::sec1::{FromEncodedPoint, ToEncodedPoint};
use k256::elliptic_curve::Group;
use k256::{AffinePoint, EncodedPoint, FieldBytes, FieldElement, ProjectivePoint, Scalar};
use subtle::Choice;

use crate::errors::SchnorrError;

//
// secp256k1 Helper Abstraction
//

/// SEC1 compressed point length
pub const COMPRESSED_POINT_LENGTH: usize = 33;

/// A `PointBoth` contains both an uncompressed `AffinePoint`
/// as well as the corresponding SEC1 compressed encoding.  It provides
/// a convenient middle ground for protocols that both hash compressed
/// points to derive scalars for use with uncompressed points.
///
/// The identity has no 33-byte encoding and is never representable here.
#[derive(Copy, Clone, Eq)] // PartialEq optimized below
pub struct PointBoth {
    compressed: [u8; COMPRESSED_POINT_LENGTH],
    point: AffinePoint,
}

impl Debug for PointBoth {
    fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
        write!(f, "PointBoth( {:?} )", &self.compressed[..])
    }
}

impl PointBoth {
    const DESCRIPTION: &'static str = "A secp256k1 point represented as a 33-byte compressed point";

    /// Access the compressed SEC1 form
    pub fn as_compressed(&self) -> &[u8; COMPRESSED_POINT_LENGTH] {
        &self.compressed
    }

    /// Access the point form
    pub fn as_point(&self) -> &AffinePoint {
        &self.point
    }

    /// Extract the point form
    pub fn into_point(self) -> AffinePoint {
        self.point
    }

    /// Compress into the `PointBoth` format that also retains the
    /// uncompressed form. The point must not be the identity.
    pub fn from_point(point: AffinePoint) -> PointBoth {
        debug_assert!(point != AffinePoint::IDENTITY);
        let encoded = point.to_encoded_point(true);
        let mut compressed = [0u8; COMPRESSED_POINT_LENGTH];
        compressed.copy_from_slice(encoded.as_bytes());
        PointBoth { compressed, point }
    }

    /// Convert this point to a byte array.
    #[inline]
    pub fn to_bytes(&self) -> [u8; COMPRESSED_POINT_LENGTH] {
        self.compressed
    }

    /// View this point as a byte array.
    #[inline]
    pub fn as_bytes<'a>(&'a self) -> &'a [u8; COMPRESSED_POINT_LENGTH] {
        &self.compressed
    }

    /// Construct a `PointBoth` from a slice of bytes.
    #[inline]
    pub fn from_bytes(bytes: &[u8]) -> Result<PointBoth, SchnorrError> {
        PointBoth::from_bytes_ser("PointBoth", PointBoth::DESCRIPTION, bytes)
    }

    /// Variant of `PointBoth::from_bytes` that propagates more informative errors.
    #[inline]
    pub fn from_bytes_ser(
        name: &'static str,
        description: &'static str,
        bytes: &[u8],
    ) -> Result<PointBoth, SchnorrError> {
        if bytes.len() != COMPRESSED_POINT_LENGTH {
            return Err(SchnorrError::BytesLengthError {
                name,
                description,
                length: COMPRESSED_POINT_LENGTH,
            });
        }

        let encoded = EncodedPoint::from_bytes(bytes)
            .map_err(|_| SchnorrError::PointDecompressionError)?;
        let point = Option::<AffinePoint>::from(AffinePoint::from_encoded_point(&encoded))
            .ok_or(SchnorrError::PointDecompressionError)?;

        let mut compressed = [0u8; COMPRESSED_POINT_LENGTH];
        compressed.copy_from_slice(bytes);
        Ok(PointBoth { compressed, point })
    }
}

serde_boilerplate!(PointBoth);

/// We hide fields largely so that only comparing the compressed forms works.
impl PartialEq<Self> for PointBoth {
    fn eq(&self, other: &Self) -> bool {
        let r = self.compressed.eq(&other.compressed);
        debug_assert_eq!(r, self.point.eq(&other.point));
        r
    }
}

//
// Quadratic residue tooling
//
// Signatures transmit only R's x coordinate; the missing sign bit is
// replaced by the convention that every R on the wire has a y coordinate
// that is a quadratic residue mod p. These tests run on public values
// only and are variable-time.
//

fn fe_is_quad_var(fe: &FieldElement) -> bool {
    fe.sqrt().is_some().into()
}

fn affine_has_quad_y_var(point: &AffinePoint) -> bool {
    if point == &AffinePoint::IDENTITY {
        return false;
    }
    let encoded = point.to_encoded_point(false);
    let y = match encoded.y() {
        Some(y) => y,
        None => return false,
    };
    match Option::<FieldElement>::from(FieldElement::from_bytes(y)) {
        Some(fe) => fe_is_quad_var(&fe),
        None => false,
    }
}

/// Does the point's affine y coordinate lie in the set of quadratic
/// residues mod p? The identity has no y and answers false.
pub fn has_quad_y_var(point: &ProjectivePoint) -> bool {
    if bool::from(point.is_identity()) {
        return false;
    }
    affine_has_quad_y_var(&point.to_affine())
}

/// Reconstruct from an x coordinate the unique curve point whose y
/// coordinate is a quadratic residue. Returns `None` when x is not on
/// the curve.
pub fn lift_x_quad(x: &FieldElement) -> Option<AffinePoint> {
    let x_bytes = x.to_bytes();
    let point = Option::<AffinePoint>::from(AffinePoint::decompress(&x_bytes, Choice::from(0)))?;
    if affine_has_quad_y_var(&point) {
        Some(point)
    } else {
        Some(-point)
    }
}

/// The normalized affine x coordinate of a non-identity point.
pub(crate) fn affine_x_bytes(point: &AffinePoint) -> Option<[u8; 32]> {
    if point == &AffinePoint::IDENTITY {
        return None;
    }
    let encoded = point.to_encoded_point(false);
    let x = encoded.x()?;
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(x);
    Some(bytes)
}

/// The normalized affine x coordinate of a non-identity point, parsed
/// back into a field element.
pub(crate) fn affine_x_fe(point: &AffinePoint) -> Option<FieldElement> {
    let bytes = affine_x_bytes(point)?;
    Option::from(FieldElement::from_bytes(&bytes.into()))
}

/// The acceptance check shared by every verification path: the
/// reconstructed nonce sum must match the signature's x coordinate and
/// carry a quadratic-residue y. Both conditions are required; an
/// x-match alone would also admit the negated point.
pub(crate) fn matches_x_with_quad_y_var(sum: &ProjectivePoint, rx: &FieldElement) -> bool {
    if bool::from(sum.is_identity()) {
        return false;
    }
    let x_bytes = match affine_x_bytes(&sum.to_affine()) {
        Some(x) => x,
        None => return false,
    };
    x_bytes[..] == rx.to_bytes()[..] && has_quad_y_var(sum)
}

//
// Bounded-scratch multi-scalar multiplication
//

/// Byte budget handed to the one-shot verification helpers.
pub const SCRATCH_SPACE_SIZE: usize = 4096;

/// Footprint charged per (coefficient, point) term when deriving a
/// scratch capacity from a byte budget.
const SCRATCH_TERM_SIZE: usize = 160;

/// A reusable term buffer for `multiscalar_mul_var`, bounded by a byte
/// budget fixed at construction. Verification is scratch-agnostic:
/// callers may reuse one `ScratchSpace` across many calls.
pub struct ScratchSpace {
    terms: Vec<(FieldBytes, ProjectivePoint)>,
    capacity: usize,
}

impl ScratchSpace {
    /// Allocate a scratch region able to hold `bytes / 160` terms per
    /// batch (at least one).
    pub fn with_size(bytes: usize) -> ScratchSpace {
        let capacity = ::core::cmp::max(1, bytes / SCRATCH_TERM_SIZE);
        ScratchSpace {
            terms: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// How many terms fit in one batch.
    pub fn max_terms(&self) -> usize {
        self.capacity
    }
}

/// Compute `g_scalar·G + Σ lookup(i).0 · lookup(i).1` over `i < n_terms`.
///
/// Coefficients are streamed from the closure, so callers never
/// materialize the full scalar array. Terms beyond the scratch capacity
/// are folded in as additional batches. Returns `None` as soon as the
/// closure fails.
///
/// Variable-time: every input here is public.
pub(crate) fn multiscalar_mul_var<F>(
    scratch: &mut ScratchSpace,
    g_scalar: &Scalar,
    n_terms: usize,
    mut lookup: F,
) -> Option<ProjectivePoint>
where
    F: FnMut(usize) -> Option<(Scalar, AffinePoint)>,
{
    let mut total = ProjectivePoint::IDENTITY;
    let mut base = Some(*g_scalar);
    let mut index = 0;

    while base.is_some() || index < n_terms {
        scratch.terms.clear();
        if let Some(coeff) = base.take() {
            scratch
                .terms
                .push((coeff.to_bytes(), ProjectivePoint::GENERATOR));
        }
        while index < n_terms && scratch.terms.len() < scratch.capacity {
            let (coeff, point) = lookup(index)?;
            scratch
                .terms
                .push((coeff.to_bytes(), ProjectivePoint::from(point)));
            index += 1;
        }
        total += batch_sum_var(&scratch.terms);
    }

    Some(total)
}

/// One batch of the sum, sharing the 256 doublings across all terms.
fn batch_sum_var(terms: &[(FieldBytes, ProjectivePoint)]) -> ProjectivePoint {
    let mut acc = ProjectivePoint::IDENTITY;
    for byte_index in 0..32 {
        for bit in (0..8).rev() {
            acc = acc.double();
            for (coeff, point) in terms.iter() {
                if (coeff[byte_index] >> bit) & 1 == 1 {
                    acc += point;
                }
            }
        }
    }
    acc
}
