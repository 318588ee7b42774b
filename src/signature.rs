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

//! A Rust implementation of Schnorr signing

use clear_on_drop::clear::Clear;
use core::fmt::Debug;
use k256::elliptic_curve::PrimeField;
use k256::{FieldElement, ProjectivePoint, Scalar};

use crate::challenge::single_challenge;
use crate::errors::SchnorrError;
use crate::keys::{PublicKey, SecretKey};
use crate::rng::{draw_nonce, NonceRng};
use crate::tools::{
    affine_x_fe, has_quad_y_var, lift_x_quad, matches_x_with_quad_y_var, multiscalar_mul_var,
    ScratchSpace, SCRATCH_SPACE_SIZE,
};

/// The length of a secp256k1 Schnorr `Signature`, in bytes.
pub const SIGNATURE_LENGTH: usize = 64;

/// The length of a cosigner's `PartialSignature`, in bytes.
pub const PARTIAL_SIGNATURE_LENGTH: usize = 32;

/// A Schnorr signature.
///
/// # Note
///
/// These signatures are "detached"—that is, they do **not** include a copy
/// of the message which has been signed.
#[derive(Copy, Clone)]
pub struct Signature {
    /// `s` is a `Scalar`, formed by s = k + ex
    ///
    /// - the `k` is the secret nonce (or the sum of the cosigners'
    ///   secret nonces),
    /// - the 'x' is the secret key signing,
    /// - the `e` is the challenge hash.
    pub(crate) s: Scalar,

    /// The x coordinate of the public nonce `R = k·G`.
    ///
    /// Only the x coordinate travels; by convention the point behind it
    /// is the one whose y coordinate is a quadratic residue mod p.
    pub(crate) rx: FieldElement,
}

impl Debug for Signature {
    fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
        write!(f, "Signature( s: {:?}, R_x: {:?} )", &self.s, &self.rx)
    }
}

impl Eq for Signature {}
impl PartialEq for Signature {
    fn eq(&self, other: &Self) -> bool {
        self.s == other.s && self.rx.to_bytes() == other.rx.to_bytes()
    }
}

impl Signature {
    const DESCRIPTION: &'static str = "A 64 byte secp256k1 Schnorr signature";

    /// Convert this `Signature` to a byte array: the scalar `s` followed
    /// by the nonce x coordinate, both big-endian.
    #[inline]
    pub fn to_bytes(&self) -> [u8; SIGNATURE_LENGTH] {
        let mut signature_bytes: [u8; SIGNATURE_LENGTH] = [0u8; SIGNATURE_LENGTH];

        signature_bytes[..32].copy_from_slice(&self.s.to_bytes());
        signature_bytes[32..].copy_from_slice(&self.rx.to_bytes());
        signature_bytes
    }

    /// Construct a `Signature` from a slice of bytes.
    ///
    /// Both halves are range-checked: `s` against the group order and
    /// the x coordinate against the field modulus.
    #[inline]
    pub fn from_bytes(bytes: &[u8]) -> Result<Signature, SchnorrError> {
        if bytes.len() != SIGNATURE_LENGTH {
            return Err(SchnorrError::BytesLengthError {
                name: "Signature",
                description: Signature::DESCRIPTION,
                length: SIGNATURE_LENGTH,
            });
        }
        let mut lower: [u8; 32] = [0u8; 32];
        let mut upper: [u8; 32] = [0u8; 32];

        lower.copy_from_slice(&bytes[..32]);
        upper.copy_from_slice(&bytes[32..]);

        let s = Option::<Scalar>::from(Scalar::from_repr(lower.into()))
            .ok_or(SchnorrError::ScalarFormatError)?;
        let rx = Option::<FieldElement>::from(FieldElement::from_bytes(&upper.into()))
            .ok_or(SchnorrError::FieldFormatError)?;

        Ok(Signature { s, rx })
    }
}

serde_boilerplate!(Signature);

/// A single cosigner's scalar contribution to an aggregate signature.
///
/// Carried as raw big-endian bytes with no framing; range checking
/// happens when the partials are combined.
#[derive(Copy, Clone, Eq, PartialEq)]
pub struct PartialSignature(pub(crate) [u8; PARTIAL_SIGNATURE_LENGTH]);

impl Debug for PartialSignature {
    fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
        write!(f, "PartialSignature( {:?} )", &self.0[..])
    }
}

impl PartialSignature {
    const DESCRIPTION: &'static str = "A 32 byte partial Schnorr signature";

    /// Convert this `PartialSignature` to a byte array.
    #[inline]
    pub fn to_bytes(&self) -> [u8; PARTIAL_SIGNATURE_LENGTH] {
        self.0
    }

    /// View this `PartialSignature` as a byte array.
    #[inline]
    pub fn as_bytes<'a>(&'a self) -> &'a [u8; PARTIAL_SIGNATURE_LENGTH] {
        &self.0
    }

    /// Construct a `PartialSignature` from a slice of bytes.
    #[inline]
    pub fn from_bytes(bytes: &[u8]) -> Result<PartialSignature, SchnorrError> {
        if bytes.len() != PARTIAL_SIGNATURE_LENGTH {
            return Err(SchnorrError::BytesLengthError {
                name: "PartialSignature",
                description: PartialSignature::DESCRIPTION,
                length: PARTIAL_SIGNATURE_LENGTH,
            });
        }
        let mut bits: [u8; 32] = [0u8; 32];
        bits.copy_from_slice(&bytes[..32]);
        Ok(PartialSignature(bits))
    }
}

serde_boilerplate!(PartialSignature);

// === Implement signing and verification operations on key types === //

impl SecretKey {
    /// Sign a 32-byte message digest with this `SecretKey`.
    ///
    /// With `secnonce` absent, the secret nonce is drawn from a
    /// deterministic HMAC-SHA256 stream seeded with `seed`. A
    /// caller-supplied `secnonce` (see [`export_secnonce_single`]) is
    /// re-normalized before use, so both paths produce bit-identical
    /// signatures for the same nonce.
    ///
    /// `pubnonce` substitutes another public nonce into the challenge
    /// hash in place of our own; protocols that pre-negotiate a joint
    /// nonce use this to bind the final nonce rather than a fragment.
    ///
    /// [`export_secnonce_single`]: crate::export_secnonce_single
    #[allow(non_snake_case)]
    pub fn sign_single(
        &self,
        msg: &[u8; 32],
        secnonce: Option<&SecretKey>,
        pubnonce: Option<&PublicKey>,
        seed: &[u8; 32],
    ) -> Result<Signature, SchnorrError> {
        // Obtain the nonce pair, normalized so R's y is a quadratic residue.
        let (mut k, R) = match secnonce {
            None => {
                let mut rng = NonceRng::new(seed);
                draw_nonce(&mut rng)
            }
            Some(supplied) => {
                let mut k = supplied.0;
                let mut R = ProjectivePoint::GENERATOR * k;
                if !has_quad_y_var(&R) {
                    k = -k;
                    R = -R;
                }
                (k, R)
            }
        };

        // The identity has no x coordinate; only a zero supplied nonce
        // can get here.
        let R_ge = R.to_affine();
        let rx = match affine_x_fe(&R_ge) {
            Some(rx) => rx,
            None => {
                k.clear();
                return Err(SchnorrError::BadArguments);
            }
        };

        // e = H(R || m), over the caller's nonce point when given one.
        let challenge = match pubnonce {
            Some(supplied) => single_challenge(supplied, msg),
            None => single_challenge(&PublicKey::from_point(R_ge), msg),
        };
        let e = match challenge {
            Some(e) => e,
            None => {
                k.clear();
                return Err(SchnorrError::ScalarFormatError);
            }
        };

        // s = k + e·x
        let s = e * self.0 + k;
        k.clear();

        Ok(Signature { s, rx })
    }
}

impl PublicKey {
    /// Verify a single-signer signature on a 32-byte message digest.
    ///
    /// When `pubnonce` is absent the nonce point is reconstructed from
    /// the signature's x coordinate under the quadratic-residue
    /// convention. Accepts iff `s·G − e·P` lands on the signature's x
    /// coordinate with a quadratic-residue y.
    pub fn verify_single(
        &self,
        msg: &[u8; 32],
        signature: &Signature,
        pubnonce: Option<&PublicKey>,
    ) -> bool {
        let challenge = match pubnonce {
            Some(supplied) => single_challenge(supplied, msg),
            None => match lift_x_quad(&signature.rx) {
                Some(point) => single_challenge(&PublicKey::from_point(point), msg),
                None => return false,
            },
        };
        let e = match challenge {
            Some(e) => e,
            None => return false,
        };

        let point = *self.as_point();
        let mut scratch = ScratchSpace::with_size(SCRATCH_SPACE_SIZE);
        let sum = multiscalar_mul_var(&mut scratch, &signature.s, 1, |_| Some((-e, point)));

        match sum {
            Some(sum) => matches_x_with_quad_y_var(&sum, &signature.rx),
            None => false,
        }
    }
}
