//! Hash commitments over random secrets.
//!
//! A commitment is the plain BLAKE3 hash of a 32-byte secret. Nothing else
//! (peer identity, vibe id, nonce) is mixed in, so a commitment/secret pair is
//! not bound to the vibe it was produced for.

use std::fmt;

use rand::rngs::OsRng;
use rand::RngCore;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use subtle::ConstantTimeEq;

use crate::constants::{COMMITMENT_SIZE, SECRET_SIZE};
use crate::error::CommitmentError;

/// A vibe secret. Only ever leaves the node inside a Reveal message.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret([u8; SECRET_SIZE]);

/// The public commitment to a [`Secret`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Commitment([u8; COMMITMENT_SIZE]);

impl Secret {
    pub fn from_bytes(bytes: [u8; SECRET_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; SECRET_SIZE] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(s: &str) -> Result<Self, CommitmentError> {
        decode_fixed(s).map(Self)
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(<redacted>)")
    }
}

impl Commitment {
    pub fn from_bytes(bytes: [u8; COMMITMENT_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; COMMITMENT_SIZE] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(s: &str) -> Result<Self, CommitmentError> {
        decode_fixed(s).map(Self)
    }
}

impl fmt::Display for Commitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

// Both travel as lowercase hex strings on the wire.

impl Serialize for Secret {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Secret {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(de::Error::custom)
    }
}

impl Serialize for Commitment {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Commitment {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(de::Error::custom)
    }
}

/// Draw a fresh secret from the operating system RNG.
///
/// An RNG failure is returned as an error. There is no fallback source.
pub fn generate_secret() -> Result<Secret, CommitmentError> {
    let mut bytes = [0u8; SECRET_SIZE];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| CommitmentError::Rng(e.to_string()))?;
    Ok(Secret(bytes))
}

pub fn commit(secret: &Secret) -> Commitment {
    Commitment(*blake3::hash(&secret.0).as_bytes())
}

/// Recompute the commitment for `secret` and compare in constant time.
pub fn verify(secret: &Secret, commitment: &Commitment) -> bool {
    let expected = commit(secret);
    expected.0[..].ct_eq(&commitment.0[..]).into()
}

fn decode_fixed<const N: usize>(s: &str) -> Result<[u8; N], CommitmentError> {
    let bytes = hex::decode(s.trim())?;
    if bytes.len() != N {
        return Err(CommitmentError::InvalidLength {
            expected: N,
            actual: bytes.len(),
        });
    }
    let mut arr = [0u8; N];
    arr.copy_from_slice(&bytes);
    Ok(arr)
}
