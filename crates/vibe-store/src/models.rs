//! Domain model for vibe records.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};

use vibe_shared::{Commitment, PeerIdentity, Secret, VibeId};

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Where a vibe stands in the commit-reveal exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VibeStatus {
    /// We committed and are waiting for the peer.
    Pending,
    /// The peer committed, we have not.
    Received,
    /// Mutual interest confirmed.
    Matched,
    /// Dismissed locally. Does not block a later vibe toward the same peer.
    Skipped,
}

impl VibeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Received => "received",
            Self::Matched => "matched",
            Self::Skipped => "skipped",
        }
    }
}

impl fmt::Display for VibeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VibeStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "received" => Ok(Self::Received),
            "matched" => Ok(Self::Matched),
            "skipped" => Ok(Self::Skipped),
            other => Err(format!("unknown vibe status {other:?}")),
        }
    }
}

// ---------------------------------------------------------------------------
// Record
// ---------------------------------------------------------------------------

/// One vibe between the local node and a remote peer.
///
/// Not `Serialize`: `our_secret` must only ever reach local storage or a
/// Reveal message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VibeRecord {
    /// Locally generated identifier.
    pub id: VibeId,
    /// The remote peer.
    pub peer_identity: PeerIdentity,
    /// Cosmetic display name, resolved best-effort.
    pub peer_display_name: Option<String>,
    /// Cosmetic avatar reference, resolved best-effort.
    pub peer_avatar_ref: Option<String>,
    /// The vibe id the peer used in its Commitment, echoed back in our replies.
    pub their_vibe_id: Option<VibeId>,
    pub our_commitment: Option<Commitment>,
    pub our_secret: Option<Secret>,
    pub their_commitment: Option<Commitment>,
    pub status: VibeStatus,
    pub created_at: DateTime<Utc>,
    pub matched_at: Option<DateTime<Utc>>,
}

impl VibeRecord {
    /// A fresh record with a new id and no commitment material.
    pub fn new(peer_identity: PeerIdentity, status: VibeStatus) -> Self {
        Self {
            id: VibeId::new(),
            peer_identity,
            peer_display_name: None,
            peer_avatar_ref: None,
            their_vibe_id: None,
            our_commitment: None,
            our_secret: None,
            their_commitment: None,
            status,
            created_at: Utc::now(),
            matched_at: None,
        }
    }

    /// The vibe id to put on outbound messages for this record.
    pub fn wire_vibe_id(&self) -> &VibeId {
        self.their_vibe_id.as_ref().unwrap_or(&self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_string_roundtrip() {
        for status in [
            VibeStatus::Pending,
            VibeStatus::Received,
            VibeStatus::Matched,
            VibeStatus::Skipped,
        ] {
            assert_eq!(status.as_str().parse::<VibeStatus>().unwrap(), status);
        }
        assert!("liked".parse::<VibeStatus>().is_err());
    }

    #[test]
    fn test_wire_vibe_id_prefers_peer_id() {
        let peer = PeerIdentity::parse(&"a".repeat(64)).unwrap();
        let mut record = VibeRecord::new(peer, VibeStatus::Received);
        assert_eq!(record.wire_vibe_id(), &record.id);

        record.their_vibe_id = Some(VibeId::from("v1"));
        assert_eq!(record.wire_vibe_id().as_str(), "v1");
    }
}
