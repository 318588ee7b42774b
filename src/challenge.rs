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

//! Challenge derivation.
//!
//! Two constructions share this module. A lone signer hashes its public
//! nonce and the message. Cosigners first hash the whole ordered key
//! set, the joint nonce's x coordinate, and the message into a shared
//! prehash, then customize that prehash per signing position, so that
//! algebraically related keys cannot cancel each other out of the sum.
//!
//! A digest that falls outside the group order is rejected outright
//! rather than reduced; the caller treats it as a failed operation.

use k256::elliptic_curve::PrimeField;
use k256::Scalar;
use sha2::{Digest, Sha256};

use crate::keys::PublicKey;

fn scalar_from_digest(digest: &[u8]) -> Option<Scalar> {
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(digest);
    Option::from(Scalar::from_repr(bytes.into()))
}

/// `e = H(compressed(R) ‖ m)`, rejecting digests at or above the group
/// order.
pub(crate) fn single_challenge(pubnonce: &PublicKey, msg: &[u8; 32]) -> Option<Scalar> {
    let mut hasher = Sha256::new();
    hasher.update(pubnonce.as_compressed());
    hasher.update(msg);
    scalar_from_digest(&hasher.finalize())
}

/// The 32-byte digest every cosigner signs over:
/// `H(compressed(P_1) ‖ … ‖ compressed(P_n) ‖ R_x ‖ m)`.
///
/// Key order is the caller's order and is binding.
pub(crate) fn joint_prehash(pubkeys: &[PublicKey], nonce_x: &[u8; 32], msg: &[u8; 32]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    for pubkey in pubkeys {
        hasher.update(pubkey.as_compressed());
    }
    hasher.update(nonce_x);
    hasher.update(msg);

    let mut prehash = [0u8; 32];
    prehash.copy_from_slice(&hasher.finalize());
    prehash
}

/// `e_i = H(bytes(i) ‖ prehash)` where `bytes(i)` is the index in
/// base-128 little-endian with no continuation bits: low seven bits per
/// byte while the index is nonzero, and zero bytes for index 0.
///
/// The encoding is only ever hashed, never parsed, so its ambiguity
/// between 0 and multiples of 128 does not matter; it must however be
/// reproduced byte-exactly. Do not substitute a standard varint.
pub(crate) fn indexed_challenge(prehash: &[u8; 32], index: usize) -> Option<Scalar> {
    let mut hasher = Sha256::new();
    let mut index = index;
    while index > 0 {
        hasher.update(&[(index & 0x7f) as u8]);
        index >>= 7;
    }
    hasher.update(prehash);
    scalar_from_digest(&hasher.finalize())
}
