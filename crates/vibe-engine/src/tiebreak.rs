//! Deciding which of two matched nodes performs a shared one-off side effect.
//!
//! The comparison is plain string ordering of the two identities. It only
//! deduplicates the "you matched" chat message and carries no security weight.

use vibe_shared::PeerIdentity;

/// `true` when the local node should perform the shared side effect, i.e.
/// when its identity sorts strictly before the peer's.
pub fn performs_shared_effect(local: &PeerIdentity, peer: &PeerIdentity) -> bool {
    local.as_str() < peer.as_str()
}
