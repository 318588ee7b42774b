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

//! Schnorr Secret Key handling

use clear_on_drop::clear::Clear;
use core::fmt::Debug;
use k256::elliptic_curve::PrimeField;
use k256::Scalar;
use subtle::{Choice, ConstantTimeEq};

use crate::errors::SchnorrError;

/// The length of a secp256k1 Schnorr `SecretKey`, in bytes.
pub const SECRET_KEY_LENGTH: usize = 32;

/// A Schnorr secret key.
#[derive(Default, Clone)]
pub struct SecretKey(pub(crate) Scalar);

impl Debug for SecretKey {
    fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
        write!(f, "SecretKey: {:?}", &self.0)
    }
}

impl Eq for SecretKey {}
impl PartialEq for SecretKey {
    fn eq(&self, other: &Self) -> bool {
        self.ct_eq(other).unwrap_u8() == 1u8
    }
}
impl ConstantTimeEq for SecretKey {
    fn ct_eq(&self, other: &Self) -> Choice {
        self.0.ct_eq(&other.0)
    }
}

/// Overwrite secret key material with null bytes when it goes out of scope.
impl Drop for SecretKey {
    fn drop(&mut self) {
        self.0.clear();
    }
}

impl SecretKey {
    const DESCRIPTION: &'static str = "A Schnorr secret key as 32 bytes.";

    /// Convert this secret key to a byte array.
    #[inline]
    pub fn to_bytes(&self) -> [u8; SECRET_KEY_LENGTH] {
        self.0.to_bytes().into()
    }

    /// Construct a `SecretKey` from a slice of bytes.
    ///
    /// The bytes are interpreted as a big-endian scalar and rejected
    /// when they reach the group order.
    ///
    /// # Returns
    ///
    /// A `Result` whose okay value is a Schnorr `SecretKey` or whose
    /// error value is a `SchnorrError` describing the error that
    /// occurred.
    #[inline]
    pub fn from_bytes(bytes: &[u8]) -> Result<SecretKey, SchnorrError> {
        if bytes.len() != SECRET_KEY_LENGTH {
            return Err(SchnorrError::BytesLengthError {
                name: "SecretKey",
                description: SecretKey::DESCRIPTION,
                length: SECRET_KEY_LENGTH,
            });
        }

        let mut bits: [u8; 32] = [0u8; 32];
        bits.copy_from_slice(&bytes[..32]);

        let scalar =
            Option::<Scalar>::from(Scalar::from_repr(bits.into())).ok_or(SchnorrError::ScalarFormatError)?;
        bits.clear();

        Ok(SecretKey(scalar))
    }

    /// Helper Method to Convert key to scalar
    pub fn to_scalar(&self) -> Scalar {
        self.0
    }

    /// View this key as a scalar.
    #[inline]
    pub fn as_scalar<'a>(&'a self) -> &'a Scalar {
        &self.0
    }

    /// Helper Method to Convert Scalar to Key
    pub fn from_scalar(s: Scalar) -> SecretKey {
        SecretKey(s)
    }
}

serde_boilerplate!(SecretKey);
