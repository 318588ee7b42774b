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

//! Serde Support

macro_rules! serde_boilerplate { ($t:ty) => {
    impl ::serde::Serialize for $t {
        fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error> where S: ::serde::Serializer {
            serializer.serialize_bytes(&self.to_bytes()[..])
        }
    }

    impl<'d> ::serde::Deserialize<'d> for $t {
        fn deserialize<D>(deserializer: D) -> Result<Self, D::Error> where D: ::serde::Deserializer<'d> {
            struct MyVisitor;

            impl<'d> ::serde::de::Visitor<'d> for MyVisitor {
                type Value = $t;

                fn expecting(&self, formatter: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                    formatter.write_str(Self::Value::DESCRIPTION)
                }

                fn visit_bytes<E>(self, bytes: &[u8]) -> Result<$t, E> where E: ::serde::de::Error {
                    Self::Value::from_bytes(bytes).or(Err(E::invalid_length(bytes.len(), &self)))
                }
            }
            deserializer.deserialize_bytes(MyVisitor)
        }
    }
} } // macro_rules! serde_boilerplate


#[cfg(test)]
mod test {
    use bincode::{deserialize, serialize};

    use crate::keys::{PublicKey, SecretKey};
    use crate::signature::{PartialSignature, Signature};

    fn fixture_secret_key() -> SecretKey {
        let mut bytes = [0u8; 32];
        bytes[31] = 42;
        SecretKey::from_bytes(&bytes).unwrap()
    }

    #[test]
    fn serialize_deserialize_secret_key() {
        let secret_key = fixture_secret_key();
        let encoded: Vec<u8> = serialize(&secret_key).unwrap();
        let decoded: SecretKey = deserialize(&encoded).unwrap();

        assert_eq!(secret_key.to_bytes(), decoded.to_bytes());
    }

    #[test]
    fn serialize_deserialize_public_key() {
        let public_key = PublicKey::from_secret(&fixture_secret_key()).unwrap();
        let encoded: Vec<u8> = serialize(&public_key).unwrap();
        let decoded: PublicKey = deserialize(&encoded).unwrap();

        assert_eq!(public_key, decoded);
    }

    #[test]
    fn serialize_deserialize_signature() {
        let msg = [7u8; 32];
        let seed = [3u8; 32];
        let signature = fixture_secret_key()
            .sign_single(&msg, None, None, &seed)
            .unwrap();
        let encoded: Vec<u8> = serialize(&signature).unwrap();
        let decoded: Signature = deserialize(&encoded).unwrap();

        assert_eq!(signature, decoded);
    }

    #[test]
    fn serialize_deserialize_partial_signature() {
        let partial = PartialSignature::from_bytes(&[9u8; 32]).unwrap();
        let encoded: Vec<u8> = serialize(&partial).unwrap();
        let decoded: PartialSignature = deserialize(&encoded).unwrap();

        assert_eq!(partial, decoded);
    }

    #[test]
    fn deserialize_rejects_truncated_bytes() {
        let public_key = PublicKey::from_secret(&fixture_secret_key()).unwrap();
        let mut encoded: Vec<u8> = serialize(&public_key).unwrap();
        encoded.truncate(encoded.len() - 1);

        assert!(deserialize::<PublicKey>(&encoded).is_err());
    }
}
