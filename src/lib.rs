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

//
// Aggregated (n-of-n) Schnorr signatures over secp256k1
//

//Modeled on the aggregate signature scheme of
//https://eprint.iacr.org/2018/068.pdf (subsection 5.1 of
//https://eprint.iacr.org/2018/483.pdf)

//Useful links:
//https://blockstream.com/2018/01/23/musig-key-aggregation-schnorr-signatures/
//https://github.com/sipa/bips/blob/bip-schnorr/bip-schnorr.mediawiki

//! Cosigners each hold a secp256k1 key and one position in an ordered
//! key list. A [`SigningSession`] collects one public nonce per
//! position, hands out partial signatures bound to the joint nonce and
//! the whole key set, and combines them into a single 64-byte
//! signature: the scalar `s` followed by the x coordinate of the joint
//! nonce. With one cosigner the same machinery degenerates into an
//! ordinary Schnorr signature, for which [`SecretKey::sign_single`] and
//! [`PublicKey::verify_single`] are the direct route.

#[macro_use]
mod ser;

pub mod errors;
pub mod tools;

mod aggsig;
mod challenge;
mod keys;
mod rng;
mod signature;

// Export everything public in the protocol modules.
pub use crate::aggsig::*;
pub use crate::errors::*;
pub use crate::keys::*;
pub use crate::rng::export_secnonce_single;
pub use crate::signature::*;
