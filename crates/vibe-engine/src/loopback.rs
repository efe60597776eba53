//! In-process transport connecting several engines through tokio channels.
//!
//! Each registered node gets an inbound receiver; a [`LoopbackTransport`]
//! delivers frames into the receiver of the addressed peer, tagged with the
//! sender's identity.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::debug;

use vibe_shared::{PeerIdentity, ProtocolFrame};

use crate::collaborators::{InboundFrame, Transport};
use crate::error::SendError;

type Routes = Arc<Mutex<HashMap<PeerIdentity, mpsc::Sender<InboundFrame>>>>;

#[derive(Clone, Default)]
pub struct LoopbackNetwork {
    routes: Routes,
}

impl LoopbackNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a node and return the receiver its engine should read from.
    /// Registering the same identity again replaces the previous route.
    pub fn register(&self, peer: PeerIdentity, capacity: usize) -> mpsc::Receiver<InboundFrame> {
        let (tx, rx) = mpsc::channel(capacity);
        if let Ok(mut routes) = self.routes.lock() {
            routes.insert(peer, tx);
        }
        rx
    }

    /// Detach a node; subsequent sends to it fail with `Unreachable`.
    pub fn disconnect(&self, peer: &PeerIdentity) {
        if let Ok(mut routes) = self.routes.lock() {
            routes.remove(peer);
        }
    }

    pub fn transport_for(&self, local: PeerIdentity) -> LoopbackTransport {
        LoopbackTransport {
            local,
            routes: self.routes.clone(),
        }
    }
}

#[derive(Clone)]
pub struct LoopbackTransport {
    local: PeerIdentity,
    routes: Routes,
}

#[async_trait]
impl Transport for LoopbackTransport {
    async fn send_to_peer(
        &self,
        peer: &PeerIdentity,
        frame: ProtocolFrame,
    ) -> Result<(), SendError> {
        let route = {
            let routes = self
                .routes
                .lock()
                .map_err(|e| SendError::Transport(format!("route table poisoned: {e}")))?;
            routes.get(peer).cloned()
        };

        let tx = route.ok_or_else(|| SendError::Unreachable(peer.clone()))?;

        debug!(
            from = self.local.short(),
            to = peer.short(),
            len = frame.body.len(),
            "loopback delivery"
        );

        tx.try_send(InboundFrame {
            from: self.local.clone(),
            frame,
        })
        .map_err(|e| match e {
            TrySendError::Full(_) => SendError::Congested(peer.clone()),
            TrySendError::Closed(_) => SendError::ChannelClosed,
        })
    }
}
