use ed25519_dalek::SigningKey;
use rand::rngs::OsRng;

use crate::types::PeerIdentity;

/// A node's cryptographic identity based on Ed25519.
/// The hex-encoded public key is the node's [`PeerIdentity`].
#[derive(Clone)]
pub struct Identity {
    signing_key: SigningKey,
}

impl Identity {
    /// Generate a new random identity
    pub fn generate() -> Self {
        let signing_key = SigningKey::generate(&mut OsRng);
        Self { signing_key }
    }

    pub fn peer_identity(&self) -> PeerIdentity {
        PeerIdentity::from_public_key(&self.public_key_bytes())
    }

    /// Get the raw public key bytes
    pub fn public_key_bytes(&self) -> [u8; 32] {
        self.signing_key.verifying_key().to_bytes()
    }
}
