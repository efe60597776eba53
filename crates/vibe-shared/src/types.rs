use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::{PEER_IDENTITY_HEX_LEN, SHORT_ID_LEN};
use crate::error::IdentityError;

/// A peer's stable network identity: the lowercase hex encoding of its
/// Ed25519 public key (64 characters).
///
/// Ordering is plain lexicographic ordering of the hex string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PeerIdentity(String);

impl PeerIdentity {
    /// Validate and normalise a hex identity string.
    pub fn parse(s: &str) -> Result<Self, IdentityError> {
        let trimmed = s.trim();
        if trimmed.len() != PEER_IDENTITY_HEX_LEN
            || !trimmed.bytes().all(|b| b.is_ascii_hexdigit())
        {
            return Err(IdentityError::InvalidPeerIdentity(s.to_string()));
        }
        Ok(Self(trimmed.to_ascii_lowercase()))
    }

    pub fn from_public_key(pubkey: &[u8; 32]) -> Self {
        Self(hex::encode(pubkey))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn short(&self) -> &str {
        &self.0[..SHORT_ID_LEN]
    }
}

impl fmt::Display for PeerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for PeerIdentity {
    type Err = IdentityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for PeerIdentity {
    type Error = IdentityError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<PeerIdentity> for String {
    fn from(id: PeerIdentity) -> Self {
        id.0
    }
}

/// Opaque identifier of a vibe. Locally generated ids are UUID v4 strings,
/// but ids received from peers are treated as arbitrary text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VibeId(pub String);

impl VibeId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for VibeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for VibeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for VibeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_identity() {
        let id = PeerIdentity::parse(&"ab".repeat(32)).unwrap();
        assert_eq!(id.as_str().len(), 64);
        assert_eq!(id.short(), "abababab");
    }

    #[test]
    fn test_parse_normalises_case() {
        let upper = PeerIdentity::parse(&"AB".repeat(32)).unwrap();
        let lower = PeerIdentity::parse(&"ab".repeat(32)).unwrap();
        assert_eq!(upper, lower);
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(PeerIdentity::parse("abcd").is_err());
        assert!(PeerIdentity::parse(&"zz".repeat(32)).is_err());
        assert!(PeerIdentity::parse(&"a".repeat(65)).is_err());
    }

    #[test]
    fn test_identity_ordering_is_lexicographic() {
        let a = PeerIdentity::parse(&"a".repeat(64)).unwrap();
        let b = PeerIdentity::parse(&"b".repeat(64)).unwrap();
        assert!(a < b);
    }

    #[test]
    fn test_identity_serde_validates() {
        let json = format!("\"{}\"", "c".repeat(64));
        let id: PeerIdentity = serde_json::from_str(&json).unwrap();
        assert_eq!(id.as_str(), "c".repeat(64));
        assert!(serde_json::from_str::<PeerIdentity>("\"nope\"").is_err());
    }
}
