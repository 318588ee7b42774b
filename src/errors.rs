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

//! Errors which may occur when parsing keys and/or signatures to or from wire formats.

use failure::Fail;

/// Represents an error in the aggregate signing protocol.
#[derive(Fail, Copy, Clone, Debug, Eq, PartialEq)]
pub enum MuSigError {
    /// The number of partial signatures must match the number of cosigners
    #[fail(display = "The number of partial signatures must match the number of cosigners")]
    MismatchedSignatures,

    /// An attempt was made to perform an invalid state transition
    #[fail(display = "An attempt was made to perform an invalid state transition")]
    InvalidStateTransition,

    /// A signing session needs at least one cosigner
    #[fail(display = "There are not enough cosigners in the session")]
    NotEnoughParticipants,

    /// This error occurs when an individual point operation failed.
    #[fail(display = "Point operation failed")]
    PointOperationFailed,
}

/// Errors raised when parsing keys and signatures, or when a signing
/// session is driven outside its protocol.
#[derive(Fail, Clone, Debug, Eq, PartialEq)]
pub enum SchnorrError {
    /// Invalid point provided.
    #[fail(display = "Cannot decompress secp256k1 point")]
    PointDecompressionError,

    /// Invalid scalar provided.
    #[fail(display = "Cannot use scalar outside the group order")]
    ScalarFormatError,

    /// Invalid field element provided.
    #[fail(display = "Cannot use field element outside the base field")]
    FieldFormatError,

    /// An error in the length of bytes handed to a constructor.
    #[fail(display = "{} must be {} bytes in length", name, length)]
    BytesLengthError {
        /// Identifies the type returning the error
        name: &'static str,
        /// Describes the type returning the error
        description: &'static str,
        /// Length expected by the constructor
        length: usize,
    },

    /// This error occurs when a function is called with bad arguments.
    #[fail(display = "Function is called with bad arguments")]
    BadArguments,

    /// Multi-party signing violated its protocol
    #[fail(display = "Multi-signature protocol error: {}", kind)]
    MuSig {
        /// The underlying protocol error
        kind: MuSigError,
    },
}

/// Helper function to convert a musig error into a schnorr error
pub fn from_musig(err: MuSigError) -> SchnorrError {
    SchnorrError::MuSig { kind: err }
}
