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

//! Aggregated (n-of-n) Schnorr signing.
//!
//! A [`SigningSession`] walks an ordered set of cosigners through the
//! protocol: every position registers a public nonce, every position
//! contributes a partial signature over the joint nonce, and the
//! partials sum into one 64-byte signature that verifies against the
//! whole key set.
//!
//! Each position moves Unknown → Ours → Signed, and nobody signs until
//! every position has left Unknown; reaching Signed twice on the same
//! position is refused, which is what makes nonce reuse impossible
//! within a session.

use clear_on_drop::clear::Clear;
use k256::elliptic_curve::{Field, PrimeField};
use k256::{ProjectivePoint, Scalar};

use crate::challenge::{indexed_challenge, joint_prehash};
use crate::errors::{from_musig, MuSigError, SchnorrError};
use crate::keys::{PublicKey, SecretKey};
use crate::rng::{draw_nonce, NonceRng};
use crate::signature::{PartialSignature, Signature};
use crate::tools::{
    affine_x_bytes, affine_x_fe, has_quad_y_var, matches_x_with_quad_y_var, multiscalar_mul_var,
    ScratchSpace, SCRATCH_SPACE_SIZE,
};

/// How far a cosigner position has progressed through the protocol.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum NonceProgress {
    /// Nonce has not been generated by us or received from another party
    Unknown,
    /// Public nonce has been received from another party
    ///
    /// Reserved: no path in this crate writes it yet, but the signing
    /// gate already treats it as "known" so foreign-nonce ingestion can
    /// be added without reshaping the state machine.
    Other,
    /// Public nonce has been generated by us but not used in signing.
    Ours,
    /// Public nonce has been generated by us and used in signing. An
    /// attempt to use a nonce twice will result in an error.
    Signed,
}

/// One aggregate signing session over a fixed, ordered cosigner set.
///
/// The session is a single-owner state machine; `&mut self` enforces
/// the external serialization the protocol needs. Secret nonces are
/// wiped when the session is dropped.
pub struct SigningSession {
    /// Per-position protocol progress
    progress: Vec<NonceProgress>,
    /// The cosigner keys, in the order that binds the challenges
    pubkeys: Vec<PublicKey>,
    /// Per-position secret nonces, zero until generated
    secnonce: Vec<Scalar>,
    /// Running sum of the cosigners' public nonces
    pubnonce_sum: ProjectivePoint,
    /// Deterministic stream the secret nonces are drawn from
    rng: NonceRng,
}

impl SigningSession {
    /// Create a session for the given cosigners, copying the keys in.
    /// The key order is binding for the whole session.
    pub fn new(pubkeys: &[PublicKey], seed: &[u8; 32]) -> Result<SigningSession, SchnorrError> {
        if pubkeys.is_empty() {
            return Err(from_musig(MuSigError::NotEnoughParticipants));
        }

        Ok(SigningSession {
            progress: vec![NonceProgress::Unknown; pubkeys.len()],
            pubkeys: pubkeys.to_vec(),
            secnonce: vec![Scalar::ZERO; pubkeys.len()],
            pubnonce_sum: ProjectivePoint::IDENTITY,
            rng: NonceRng::new(seed),
        })
    }

    /// Number of cosigners fixed at creation.
    pub fn cosigners(&self) -> usize {
        self.pubkeys.len()
    }

    /// The progress of a single position, if it exists.
    pub fn progress(&self, index: usize) -> Option<NonceProgress> {
        self.progress.get(index).copied()
    }

    /// Draw the secret nonce for one position and fold its public
    /// counterpart into the joint nonce.
    ///
    /// Fails on an out-of-range position and on any position that has
    /// already left the Unknown state.
    pub fn generate_nonce(&mut self, index: usize) -> Result<(), SchnorrError> {
        if index >= self.pubkeys.len() {
            return Err(SchnorrError::BadArguments);
        }
        if self.progress[index] != NonceProgress::Unknown {
            return Err(from_musig(MuSigError::InvalidStateTransition));
        }

        let (secnonce, pubnonce) = draw_nonce(&mut self.rng);
        self.pubnonce_sum += pubnonce;
        self.secnonce[index] = secnonce;
        self.progress[index] = NonceProgress::Ours;
        Ok(())
    }

    /// Produce this position's scalar contribution to the aggregate
    /// signature.
    ///
    /// Requires every position's nonce to be known (the joint nonce is
    /// final) and this position to hold an unused nonce of ours.
    pub fn partial_sign(
        &mut self,
        msg: &[u8; 32],
        seckey: &SecretKey,
        index: usize,
    ) -> Result<PartialSignature, SchnorrError> {
        if index >= self.pubkeys.len() {
            return Err(SchnorrError::BadArguments);
        }
        if self
            .progress
            .iter()
            .any(|progress| *progress == NonceProgress::Unknown)
        {
            return Err(from_musig(MuSigError::InvalidStateTransition));
        }
        if self.progress[index] != NonceProgress::Ours {
            return Err(from_musig(MuSigError::InvalidStateTransition));
        }
        if bool::from(k256::elliptic_curve::Group::is_identity(&self.pubnonce_sum)) {
            return Err(from_musig(MuSigError::PointOperationFailed));
        }

        // If the joint nonce has the wrong sign, flip our secret nonce.
        // Every cosigner runs the same test against the same sum, and
        // the combiner flips the public sum to match.
        let mut summed = self.pubnonce_sum;
        if !has_quad_y_var(&self.pubnonce_sum) {
            self.secnonce[index] = -self.secnonce[index];
            summed = -summed;
        }
        let nonce_x = match affine_x_bytes(&summed.to_affine()) {
            Some(x) => x,
            None => return Err(from_musig(MuSigError::PointOperationFailed)),
        };

        let prehash = joint_prehash(&self.pubkeys, &nonce_x, msg);
        let e = indexed_challenge(&prehash, index).ok_or(SchnorrError::ScalarFormatError)?;

        // s_i = k_i + e_i·x_i
        let mut s = e * seckey.0 + self.secnonce[index];
        let partial = PartialSignature(s.to_bytes().into());
        s.clear();

        self.progress[index] = NonceProgress::Signed;
        Ok(partial)
    }

    /// Sum the cosigners' partial signatures into the final signature.
    ///
    /// Fails when the partial count differs from the cosigner count or
    /// any partial falls outside the group order.
    pub fn combine(&mut self, partials: &[PartialSignature]) -> Result<Signature, SchnorrError> {
        if partials.len() != self.pubkeys.len() {
            return Err(from_musig(MuSigError::MismatchedSignatures));
        }

        let mut s = Scalar::ZERO;
        for partial in partials {
            let part = Option::<Scalar>::from(Scalar::from_repr(partial.0.into()))
                .ok_or(SchnorrError::ScalarFormatError)?;
            s += part;
        }

        // Everyone negated their secret nonces against this sum while
        // signing; negate the public sum to match.
        if !has_quad_y_var(&self.pubnonce_sum) {
            self.pubnonce_sum = -self.pubnonce_sum;
        }
        let rx = match affine_x_fe(&self.pubnonce_sum.to_affine()) {
            Some(rx) => rx,
            None => return Err(from_musig(MuSigError::PointOperationFailed)),
        };

        Ok(Signature { s, rx })
    }
}

/// Overwrite the secret nonces with null bytes when the session goes
/// out of scope. The nonce stream wipes itself.
impl Drop for SigningSession {
    fn drop(&mut self) {
        for secnonce in self.secnonce.iter_mut() {
            secnonce.clear();
        }
        for progress in self.progress.iter_mut() {
            *progress = NonceProgress::Unknown;
        }
    }
}

/// Verify an aggregate signature against the cosigner keys, which must
/// be passed in signing order.
///
/// Reconstructs the per-position challenges from the shared prehash and
/// checks that `s·G − Σ e_i·P_i` lands on the signature's x coordinate
/// with a quadratic-residue y. The challenges are streamed straight
/// into the multi-scalar multiplication, batched through `scratch`;
/// callers may reuse one scratch region across calls.
pub fn aggregate_verify(
    scratch: &mut ScratchSpace,
    signature: &Signature,
    msg: &[u8; 32],
    pubkeys: &[PublicKey],
) -> bool {
    if pubkeys.is_empty() {
        return false;
    }

    let rx_bytes: [u8; 32] = signature.rx.to_bytes().into();
    let prehash = joint_prehash(pubkeys, &rx_bytes, msg);

    let sum = multiscalar_mul_var(scratch, &signature.s, pubkeys.len(), |index| {
        let e = indexed_challenge(&prehash, index)?;
        Some((-e, *pubkeys[index].as_point()))
    });

    match sum {
        Some(sum) => matches_x_with_quad_y_var(&sum, &signature.rx),
        None => false,
    }
}

/// One-shot variant of [`aggregate_verify`] that allocates a bounded
/// scratch region, verifies, and releases it.
pub fn aggregate_verify_simple(signature: &Signature, msg: &[u8; 32], pubkeys: &[PublicKey]) -> bool {
    let mut scratch = ScratchSpace::with_size(SCRATCH_SPACE_SIZE);
    aggregate_verify(&mut scratch, signature, msg, pubkeys)
}

#[cfg(test)]
mod test {
    use super::*;
    use rand::{thread_rng, RngCore};

    /// Big-endian bytes of the secp256k1 group order n.
    const GROUP_ORDER: [u8; 32] = [
        0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
        0xfe, 0xba, 0xae, 0xdc, 0xe6, 0xaf, 0x48, 0xa0, 0x3b, 0xbf, 0xd2, 0x5e, 0x8c, 0xd0, 0x36,
        0x41, 0x41,
    ];

    fn keypair(byte: u8) -> (SecretKey, PublicKey) {
        let mut bytes = [0u8; 32];
        bytes[31] = byte;
        let secret = SecretKey::from_bytes(&bytes).unwrap();
        let public = PublicKey::from_secret(&secret).unwrap();
        (secret, public)
    }

    fn keyset(n: usize) -> (Vec<SecretKey>, Vec<PublicKey>) {
        (1..=n as u8).map(keypair).unzip()
    }

    /// Drive a full session: nonces for every position, partials in
    /// position order, combine.
    fn run_session(
        seckeys: &[SecretKey],
        pubkeys: &[PublicKey],
        msg: &[u8; 32],
        seed: &[u8; 32],
    ) -> Signature {
        let mut session = SigningSession::new(pubkeys, seed).unwrap();
        for index in 0..pubkeys.len() {
            session.generate_nonce(index).unwrap();
        }
        let partials: Vec<PartialSignature> = seckeys
            .iter()
            .enumerate()
            .map(|(index, seckey)| session.partial_sign(msg, seckey, index).unwrap())
            .collect();
        session.combine(&partials).unwrap()
    }

    #[test]
    fn aggregate_roundtrip_small_groups() {
        let msg = [0x01u8; 32];
        let seed = [0xaau8; 32];

        for n in 1..=4 {
            let (seckeys, pubkeys) = keyset(n);
            let signature = run_session(&seckeys, &pubkeys, &msg, &seed);
            assert!(aggregate_verify_simple(&signature, &msg, &pubkeys));
        }
    }

    #[test]
    fn aggregate_roundtrip_random_keys() {
        let mut csprng = thread_rng();

        // Retry past the negligible out-of-range and zero draws.
        let (seckeys, pubkeys): (Vec<SecretKey>, Vec<PublicKey>) = (0..5)
            .map(|_| loop {
                let mut bytes = [0u8; 32];
                csprng.fill_bytes(&mut bytes);
                if let Ok(secret) = SecretKey::from_bytes(&bytes) {
                    if let Ok(public) = PublicKey::from_secret(&secret) {
                        break (secret, public);
                    }
                }
            })
            .unzip();

        let mut msg = [0u8; 32];
        csprng.fill_bytes(&mut msg);
        let mut seed = [0u8; 32];
        csprng.fill_bytes(&mut seed);

        let signature = run_session(&seckeys, &pubkeys, &msg, &seed);
        assert!(aggregate_verify_simple(&signature, &msg, &pubkeys));

        let swapped = vec![pubkeys[1], pubkeys[0], pubkeys[2], pubkeys[3], pubkeys[4]];
        assert!(!aggregate_verify_simple(&signature, &msg, &swapped));
    }

    #[test]
    fn sessions_are_deterministic() {
        let (seckeys, pubkeys) = keyset(3);
        let msg = [0x07u8; 32];
        let seed = [0x55u8; 32];

        let first = run_session(&seckeys, &pubkeys, &msg, &seed);
        let second = run_session(&seckeys, &pubkeys, &msg, &seed);
        assert_eq!(first.to_bytes(), second.to_bytes());
    }

    #[test]
    fn swapped_pubkeys_do_not_verify() {
        let (seckeys, pubkeys) = keyset(2);
        let msg = [0x01u8; 32];
        let signature = run_session(&seckeys, &pubkeys, &msg, &[0xaau8; 32]);

        assert!(aggregate_verify_simple(&signature, &msg, &pubkeys));
        let swapped = vec![pubkeys[1], pubkeys[0]];
        assert!(!aggregate_verify_simple(&signature, &msg, &swapped));
    }

    #[test]
    fn crossed_keys_do_not_verify() {
        // The per-position challenge binds each key to its slot: two
        // cosigners signing in each other's position cannot produce a
        // signature the honest key order accepts.
        let (seckeys, pubkeys) = keyset(2);
        let msg = [0x01u8; 32];

        let mut session = SigningSession::new(&pubkeys, &[0xaau8; 32]).unwrap();
        session.generate_nonce(0).unwrap();
        session.generate_nonce(1).unwrap();
        let partials = vec![
            session.partial_sign(&msg, &seckeys[1], 0).unwrap(),
            session.partial_sign(&msg, &seckeys[0], 1).unwrap(),
        ];
        let crossed = session.combine(&partials).unwrap();

        assert!(!aggregate_verify_simple(&crossed, &msg, &pubkeys));
    }

    #[test]
    fn signing_requires_every_nonce() {
        let (seckeys, pubkeys) = keyset(3);
        let msg = [0x02u8; 32];

        let mut session = SigningSession::new(&pubkeys, &[1u8; 32]).unwrap();
        session.generate_nonce(0).unwrap();
        session.generate_nonce(2).unwrap();

        // Position 1 never registered a nonce, so nobody may sign.
        assert_eq!(
            session.partial_sign(&msg, &seckeys[0], 0),
            Err(from_musig(MuSigError::InvalidStateTransition))
        );
    }

    #[test]
    fn nonces_are_single_use() {
        let (seckeys, pubkeys) = keyset(3);
        let msg = [0x02u8; 32];

        let mut session = SigningSession::new(&pubkeys, &[1u8; 32]).unwrap();
        for index in 0..3 {
            session.generate_nonce(index).unwrap();
        }

        // A second nonce for a position is refused.
        assert_eq!(
            session.generate_nonce(1),
            Err(from_musig(MuSigError::InvalidStateTransition))
        );

        // Signing a position twice is refused.
        session.partial_sign(&msg, &seckeys[0], 0).unwrap();
        assert_eq!(session.progress(0), Some(NonceProgress::Signed));
        assert_eq!(
            session.partial_sign(&msg, &seckeys[0], 0),
            Err(from_musig(MuSigError::InvalidStateTransition))
        );
    }

    #[test]
    fn out_of_range_positions_are_rejected() {
        let (seckeys, pubkeys) = keyset(2);
        let mut session = SigningSession::new(&pubkeys, &[3u8; 32]).unwrap();

        assert_eq!(
            session.generate_nonce(2),
            Err(SchnorrError::BadArguments)
        );
        assert_eq!(
            session.partial_sign(&[0u8; 32], &seckeys[0], 2),
            Err(SchnorrError::BadArguments)
        );
    }

    #[test]
    fn combine_checks_the_partial_count() {
        let (seckeys, pubkeys) = keyset(2);
        let msg = [0x06u8; 32];

        let mut session = SigningSession::new(&pubkeys, &[8u8; 32]).unwrap();
        session.generate_nonce(0).unwrap();
        session.generate_nonce(1).unwrap();
        let partials = vec![session.partial_sign(&msg, &seckeys[0], 0).unwrap()];

        assert_eq!(
            session.combine(&partials),
            Err(from_musig(MuSigError::MismatchedSignatures))
        );
    }

    #[test]
    fn combine_rejects_overflowing_partials() {
        let (seckeys, pubkeys) = keyset(2);
        let msg = [0x06u8; 32];

        let mut session = SigningSession::new(&pubkeys, &[8u8; 32]).unwrap();
        session.generate_nonce(0).unwrap();
        session.generate_nonce(1).unwrap();
        let mut partials: Vec<PartialSignature> = (0..2)
            .map(|index| session.partial_sign(&msg, &seckeys[index], index).unwrap())
            .collect();

        // The group order itself is the smallest overflowing scalar.
        partials[1] = PartialSignature::from_bytes(&GROUP_ORDER).unwrap();
        assert_eq!(
            session.combine(&partials),
            Err(SchnorrError::ScalarFormatError)
        );
    }

    #[test]
    fn empty_cosigner_sets_are_rejected() {
        assert!(SigningSession::new(&[], &[0u8; 32]).is_err());

        let (seckeys, pubkeys) = keyset(1);
        let msg = [0x09u8; 32];
        let signature = run_session(&seckeys, &pubkeys, &msg, &[2u8; 32]);
        assert!(!aggregate_verify_simple(&signature, &msg, &[]));
    }

    #[test]
    fn tampering_breaks_verification() {
        let (seckeys, pubkeys) = keyset(3);
        let msg = [0x0bu8; 32];
        let signature = run_session(&seckeys, &pubkeys, &msg, &[6u8; 32]);
        assert!(aggregate_verify_simple(&signature, &msg, &pubkeys));

        // Flipped message bit.
        let mut bad_msg = msg;
        bad_msg[31] ^= 0x01;
        assert!(!aggregate_verify_simple(&signature, &bad_msg, &pubkeys));

        // Substituted cosigner key.
        let mut bad_keys = pubkeys.clone();
        bad_keys[1] = keypair(9).1;
        assert!(!aggregate_verify_simple(&signature, &msg, &bad_keys));

        // Every flipped signature byte either fails to parse or fails
        // to verify.
        let good = signature.to_bytes();
        for position in &[0usize, 31, 32, 63] {
            let mut bytes = good;
            bytes[*position] ^= 0x40;
            match Signature::from_bytes(&bytes) {
                Ok(bad) => assert!(!aggregate_verify_simple(&bad, &msg, &pubkeys)),
                Err(_) => (),
            }
        }
    }

    #[test]
    fn single_and_aggregate_challenges_differ() {
        // The lone-signer and cosigner challenge constructions are
        // deliberately distinct, even for one cosigner.
        let (seckeys, pubkeys) = keyset(1);
        let msg = [0x0cu8; 32];

        let aggregate = run_session(&seckeys, &pubkeys, &msg, &[3u8; 32]);
        assert!(aggregate_verify_simple(&aggregate, &msg, &pubkeys));
        assert!(!pubkeys[0].verify_single(&msg, &aggregate, None));

        let single = seckeys[0]
            .sign_single(&msg, None, None, &[3u8; 32])
            .unwrap();
        assert!(pubkeys[0].verify_single(&msg, &single, None));
        assert!(!aggregate_verify_simple(&single, &msg, &pubkeys));
    }

    #[test]
    fn scratch_regions_are_reusable() {
        let msg = [0x0du8; 32];
        let (seckeys_a, pubkeys_a) = keyset(2);
        let (seckeys_b, pubkeys_b) = keyset(4);

        let sig_a = run_session(&seckeys_a, &pubkeys_a, &msg, &[1u8; 32]);
        let sig_b = run_session(&seckeys_b, &pubkeys_b, &msg, &[2u8; 32]);

        let mut scratch = ScratchSpace::with_size(SCRATCH_SPACE_SIZE);
        assert!(aggregate_verify(&mut scratch, &sig_a, &msg, &pubkeys_a));
        assert!(aggregate_verify(&mut scratch, &sig_b, &msg, &pubkeys_b));
        assert!(!aggregate_verify(&mut scratch, &sig_a, &msg, &pubkeys_b));
    }
}
