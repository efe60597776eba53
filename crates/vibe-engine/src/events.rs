//! Events emitted towards the UI layer.

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::mpsc;

use vibe_shared::PeerIdentity;

use crate::collaborators::{MatchAnnouncer, Notifier};
use crate::error::SendError;

pub const EVENT_VIBE_RECEIVED: &str = "vibe-received";
pub const EVENT_VIBE_MATCHED: &str = "vibe-matched";
pub const EVENT_MATCH_OPENED: &str = "match-opened";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum VibeEvent {
    VibeReceived { peer: PeerIdentity, name: String },
    VibeMatched { peer: PeerIdentity, name: String },
    MatchOpened { peer: PeerIdentity, name: String },
}

impl VibeEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::VibeReceived { .. } => EVENT_VIBE_RECEIVED,
            Self::VibeMatched { .. } => EVENT_VIBE_MATCHED,
            Self::MatchOpened { .. } => EVENT_MATCH_OPENED,
        }
    }

    pub fn peer(&self) -> &PeerIdentity {
        match self {
            Self::VibeReceived { peer, .. }
            | Self::VibeMatched { peer, .. }
            | Self::MatchOpened { peer, .. } => peer,
        }
    }
}

/// Forwards notifications and match announcements into a channel that the
/// host application drains.
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: mpsc::UnboundedSender<VibeEvent>,
}

impl EventSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<VibeEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn emit(&self, event: VibeEvent) {
        let name = event.name();
        if self.tx.send(event).is_err() {
            tracing::debug!(event = name, "event receiver dropped");
        }
    }
}

impl Notifier for EventSink {
    fn notify_received(&self, peer: &PeerIdentity, name: &str) {
        self.emit(VibeEvent::VibeReceived {
            peer: peer.clone(),
            name: name.to_string(),
        });
    }

    fn notify_matched(&self, peer: &PeerIdentity, name: &str) {
        self.emit(VibeEvent::VibeMatched {
            peer: peer.clone(),
            name: name.to_string(),
        });
    }
}

#[async_trait]
impl MatchAnnouncer for EventSink {
    async fn announce_match(&self, peer: &PeerIdentity, name: &str) -> Result<(), SendError> {
        self.tx
            .send(VibeEvent::MatchOpened {
                peer: peer.clone(),
                name: name.to_string(),
            })
            .map_err(|_| SendError::ChannelClosed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sink_forwards_events() {
        let (sink, mut rx) = EventSink::new();
        let peer = PeerIdentity::parse(&"a".repeat(64)).unwrap();

        sink.notify_received(&peer, "Ada");
        sink.announce_match(&peer, "Ada").await.unwrap();

        assert_eq!(rx.recv().await.unwrap().name(), EVENT_VIBE_RECEIVED);
        let opened = rx.recv().await.unwrap();
        assert_eq!(opened.name(), EVENT_MATCH_OPENED);
        assert_eq!(opened.peer(), &peer);
    }

    #[tokio::test]
    async fn test_announce_fails_when_receiver_gone() {
        let (sink, rx) = EventSink::new();
        drop(rx);
        let peer = PeerIdentity::parse(&"a".repeat(64)).unwrap();

        sink.notify_matched(&peer, "Ada");
        assert_eq!(
            sink.announce_match(&peer, "Ada").await,
            Err(SendError::ChannelClosed)
        );
    }

    #[test]
    fn test_event_json_shape() {
        let event = VibeEvent::VibeMatched {
            peer: PeerIdentity::parse(&"b".repeat(64)).unwrap(),
            name: "Bo".to_string(),
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["event"], "vibe-matched");
        assert_eq!(value["name"], "Bo");
    }
}
