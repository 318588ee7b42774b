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

//! Deterministic nonce generation.
//!
//! Secret nonces are drawn from an RFC-6979-style HMAC-SHA256 stream
//! seeded once per signing session, so a (seed, key, message) triple can
//! never reuse a nonce across runs. Every public nonce leaving this
//! module is normalized to have a y coordinate that is a quadratic
//! residue, which is what lets signatures carry only the x coordinate.

use clear_on_drop::clear::Clear;
use hmac::{Hmac, Mac};
use k256::elliptic_curve::{Field, PrimeField};
use k256::{ProjectivePoint, Scalar};
use sha2::Sha256;

use crate::keys::SecretKey;
use crate::tools::has_quad_y_var;

type HmacSha256 = Hmac<Sha256>;

fn keyed(key: &[u8; 32]) -> HmacSha256 {
    HmacSha256::new_from_slice(key).expect("HMAC-SHA256 accepts keys of any length")
}

/// An RFC-6979 HMAC-SHA256 pseudo-random stream producing 32-byte
/// blocks, seeded from 32 bytes. The K/V schedule is bit-exact with the
/// classic construction: V starts all-ones, K all-zeroes, two seeding
/// rounds fold the seed in, and the state is stirred between outputs.
pub struct NonceRng {
    v: [u8; 32],
    k: [u8; 32],
    retry: bool,
}

impl NonceRng {
    /// Seed a fresh stream.
    pub fn new(seed: &[u8; 32]) -> NonceRng {
        let mut rng = NonceRng {
            v: [0x01; 32],
            k: [0x00; 32],
            retry: false,
        };

        // K = HMAC(K, V || 0x00 || seed), V = HMAC(K, V)
        let mut mac = keyed(&rng.k);
        mac.update(&rng.v);
        mac.update(&[0x00]);
        mac.update(seed);
        rng.k.copy_from_slice(&mac.finalize().into_bytes());
        rng.stir();

        // K = HMAC(K, V || 0x01 || seed), V = HMAC(K, V)
        let mut mac = keyed(&rng.k);
        mac.update(&rng.v);
        mac.update(&[0x01]);
        mac.update(seed);
        rng.k.copy_from_slice(&mac.finalize().into_bytes());
        rng.stir();

        rng
    }

    fn stir(&mut self) {
        let mut mac = keyed(&self.k);
        mac.update(&self.v);
        self.v.copy_from_slice(&mac.finalize().into_bytes());
    }

    /// Produce the next 32-byte block.
    pub fn generate(&mut self, out: &mut [u8; 32]) {
        if self.retry {
            let mut mac = keyed(&self.k);
            mac.update(&self.v);
            mac.update(&[0x00]);
            self.k.copy_from_slice(&mac.finalize().into_bytes());
            self.stir();
        }
        self.stir();
        out.copy_from_slice(&self.v);
        self.retry = true;
    }
}

/// Overwrite the stream state with null bytes when it goes out of scope.
impl Drop for NonceRng {
    fn drop(&mut self) {
        self.k.clear();
        self.v.clear();
        self.retry = false;
    }
}

/// Draw a secret nonce from the stream and return it with its public
/// counterpart `R = k·G`, negating both when R's y coordinate is not a
/// quadratic residue.
///
/// The rejection loop fires only for a block that is zero or exceeds the
/// group order, which HMAC-SHA256 output cannot reach in practice.
pub(crate) fn draw_nonce(rng: &mut NonceRng) -> (Scalar, ProjectivePoint) {
    let mut data = [0u8; 32];
    let secnonce = loop {
        rng.generate(&mut data);
        if let Some(k) = Option::<Scalar>::from(Scalar::from_repr(data.into())) {
            if !bool::from(k.is_zero()) {
                break k;
            }
        }
    };
    data.clear();

    let mut secnonce = secnonce;
    let mut pubnonce = ProjectivePoint::GENERATOR * secnonce;
    if !has_quad_y_var(&pubnonce) {
        secnonce = -secnonce;
        pubnonce = -pubnonce;
    }
    (secnonce, pubnonce)
}

/// Derive the secret nonce a given seed would produce, normalized, and
/// hand it to the caller. Pairs with the caller-supplied-nonce path of
/// single signing, where the nonce is agreed on out of band.
pub fn export_secnonce_single(seed: &[u8; 32]) -> SecretKey {
    let mut rng = NonceRng::new(seed);
    let (secnonce, _pubnonce) = draw_nonce(&mut rng);
    SecretKey::from_scalar(secnonce)
}
