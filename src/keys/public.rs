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

//! Schnorr Public Key handling

use core::fmt::Debug;
use k256::{AffinePoint, ProjectivePoint};

use crate::errors::SchnorrError;
use crate::keys::SecretKey;
use crate::tools::{PointBoth, COMPRESSED_POINT_LENGTH};

/// The length of a secp256k1 Schnorr `PublicKey`, in bytes.
pub const PUBLIC_KEY_LENGTH: usize = COMPRESSED_POINT_LENGTH;

/// A Schnorr public key.
///
/// Holds the curve point together with its SEC1 compressed encoding, so
/// the challenge hashes never re-compress. The point at infinity is not
/// representable.
#[derive(Copy, Clone, Eq, PartialEq)]
pub struct PublicKey(pub(crate) PointBoth);

impl Debug for PublicKey {
    fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
        write!(f, "PublicKey( {:?} )", self.0)
    }
}

impl PublicKey {
    const DESCRIPTION: &'static str = "A secp256k1 Schnorr public key as a 33-byte SEC1 compressed point.";

    /// Access the compressed SEC1 form
    pub fn as_compressed(&self) -> &[u8; PUBLIC_KEY_LENGTH] {
        self.0.as_compressed()
    }

    /// Access the point form
    pub fn as_point(&self) -> &AffinePoint {
        self.0.as_point()
    }

    /// Extract the point form
    pub fn into_point(self) -> AffinePoint {
        self.0.into_point()
    }

    /// Wrap a curve point into the `PublicKey` format that also retains
    /// the compressed form. The point must not be the identity.
    pub fn from_point(point: AffinePoint) -> PublicKey {
        PublicKey(PointBoth::from_point(point))
    }

    /// Convert this public key to a byte array.
    #[inline]
    pub fn to_bytes(&self) -> [u8; PUBLIC_KEY_LENGTH] {
        self.0.to_bytes()
    }

    /// View this public key as a byte array.
    #[inline]
    pub fn as_bytes<'a>(&'a self) -> &'a [u8; PUBLIC_KEY_LENGTH] {
        self.0.as_bytes()
    }

    /// Construct a `PublicKey` from a slice of bytes.
    ///
    /// # Returns
    ///
    /// A `Result` whose okay value is a Schnorr `PublicKey` or whose
    /// error value is a `SchnorrError` describing the error that
    /// occurred.
    #[inline]
    pub fn from_bytes(bytes: &[u8]) -> Result<PublicKey, SchnorrError> {
        Ok(PublicKey(PointBoth::from_bytes_ser(
            "PublicKey",
            PublicKey::DESCRIPTION,
            bytes,
        )?))
    }

    /// Derive this public key from its corresponding `SecretKey`.
    ///
    /// The zero key has no public counterpart and is rejected.
    pub fn from_secret(secret_key: &SecretKey) -> Result<PublicKey, SchnorrError> {
        let point = ProjectivePoint::GENERATOR * secret_key.as_scalar();
        if bool::from(k256::elliptic_curve::Group::is_identity(&point)) {
            return Err(SchnorrError::BadArguments);
        }
        Ok(PublicKey(PointBoth::from_point(point.to_affine())))
    }
}

serde_boilerplate!(PublicKey);
