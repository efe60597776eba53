//! Traits for everything the matching engine does not own: the transport,
//! user notifications, and the chat system's "you matched" message.

use std::sync::Arc;

use async_trait::async_trait;

use vibe_shared::{PeerIdentity, ProtocolFrame};

use crate::error::SendError;
use crate::peer_info::PeerInfoResolver;

/// A frame delivered by the transport. `from` is authenticated by the
/// transport itself; the engine does not check it again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundFrame {
    pub from: PeerIdentity,
    pub frame: ProtocolFrame,
}

/// Point-to-point authenticated transport.
///
/// The engine awaits `send_to_peer` from its only task, so an implementation
/// must hand the frame off or fail promptly. It must never wait for the peer
/// to make room; a peer that is not keeping up is reported as an error.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send_to_peer(&self, peer: &PeerIdentity, frame: ProtocolFrame)
        -> Result<(), SendError>;
}

/// User-facing notifications. Fire-and-forget.
pub trait Notifier: Send + Sync {
    fn notify_received(&self, peer: &PeerIdentity, name: &str);
    fn notify_matched(&self, peer: &PeerIdentity, name: &str);
}

/// Opens the automatic "you matched" conversation in the chat system.
///
/// Called on exactly one of the two matched nodes; see [`crate::tiebreak`].
#[async_trait]
pub trait MatchAnnouncer: Send + Sync {
    async fn announce_match(&self, peer: &PeerIdentity, name: &str) -> Result<(), SendError>;
}

/// The set of collaborators an engine is built with.
#[derive(Clone)]
pub struct Collaborators {
    pub transport: Arc<dyn Transport>,
    pub notifier: Arc<dyn Notifier>,
    pub announcer: Arc<dyn MatchAnnouncer>,
    pub resolver: PeerInfoResolver,
}
