//! Single-task driver for a [`MatchingEngine`].
//!
//! Inbound frames and local actions arrive on two channels and are handled
//! one at a time, each to completion (including its store write) before the
//! next is taken. No record is ever touched by two handlers at once.

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use vibe_shared::{PeerIdentity, VibeId};
use vibe_store::VibeRecord;

use crate::collaborators::InboundFrame;
use crate::engine::{ActionReport, MatchingEngine};
use crate::error::EngineError;
use crate::peer_info::PeerInfo;

type Reply<T> = oneshot::Sender<Result<T, EngineError>>;

/// Commands sent *into* the engine task.
#[derive(Debug)]
pub enum LocalAction {
    Initiate {
        peer: PeerIdentity,
        info: Option<PeerInfo>,
        reply: Reply<ActionReport>,
    },
    Skip {
        peer: PeerIdentity,
        reply: Reply<ActionReport>,
    },
    ClearMatch {
        id: VibeId,
        reply: Reply<Option<VibeRecord>>,
    },
    Reset {
        reply: Reply<()>,
    },
    /// Request a snapshot of all records, newest first.
    Records(oneshot::Sender<Vec<VibeRecord>>),
    /// Stop the loop and hand the engine back through the join handle.
    Shutdown,
}

/// Cloneable front end to a running engine task.
#[derive(Clone)]
pub struct EngineHandle {
    tx: mpsc::Sender<LocalAction>,
}

impl EngineHandle {
    pub async fn initiate(
        &self,
        peer: PeerIdentity,
        info: Option<PeerInfo>,
    ) -> Result<ActionReport, EngineError> {
        self.request(|reply| LocalAction::Initiate { peer, info, reply })
            .await
    }

    pub async fn skip(&self, peer: PeerIdentity) -> Result<ActionReport, EngineError> {
        self.request(|reply| LocalAction::Skip { peer, reply }).await
    }

    pub async fn clear_match(&self, id: VibeId) -> Result<Option<VibeRecord>, EngineError> {
        self.request(|reply| LocalAction::ClearMatch { id, reply })
            .await
    }

    pub async fn reset(&self) -> Result<(), EngineError> {
        self.request(|reply| LocalAction::Reset { reply }).await
    }

    pub async fn records(&self) -> Result<Vec<VibeRecord>, EngineError> {
        let (tx, rx) = oneshot::channel();
        self.tx
            .send(LocalAction::Records(tx))
            .await
            .map_err(|_| EngineError::Stopped)?;
        rx.await.map_err(|_| EngineError::Stopped)
    }

    pub async fn shutdown(&self) -> Result<(), EngineError> {
        self.tx
            .send(LocalAction::Shutdown)
            .await
            .map_err(|_| EngineError::Stopped)
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(Reply<T>) -> LocalAction,
    ) -> Result<T, EngineError> {
        let (tx, rx) = oneshot::channel();
        self.tx
            .send(build(tx))
            .await
            .map_err(|_| EngineError::Stopped)?;
        rx.await.map_err(|_| EngineError::Stopped)?
    }
}

/// Spawn the engine loop in a background tokio task.
///
/// Returns the action handle and a join handle that yields the engine once
/// the loop stops (on [`LocalAction::Shutdown`] or when every
/// [`EngineHandle`] has been dropped).
pub fn spawn_engine(
    engine: MatchingEngine,
    inbound_rx: mpsc::Receiver<InboundFrame>,
    action_capacity: usize,
) -> (EngineHandle, JoinHandle<MatchingEngine>) {
    let (tx, rx) = mpsc::channel(action_capacity);
    let join = tokio::spawn(run(engine, rx, inbound_rx));
    (EngineHandle { tx }, join)
}

async fn run(
    mut engine: MatchingEngine,
    mut actions: mpsc::Receiver<LocalAction>,
    mut inbound: mpsc::Receiver<InboundFrame>,
) -> MatchingEngine {
    info!(local = engine.local_identity().short(), "matching engine started");
    let mut inbound_open = true;

    loop {
        tokio::select! {
            action = actions.recv() => {
                match action {
                    Some(LocalAction::Shutdown) => {
                        info!("matching engine shutdown requested");
                        break;
                    }
                    Some(action) => handle_action(&mut engine, action).await,
                    None => {
                        info!("action channel closed, stopping matching engine");
                        break;
                    }
                }
            }

            frame = inbound.recv(), if inbound_open => {
                match frame {
                    Some(frame) => engine.handle_frame(frame).await,
                    None => {
                        debug!("inbound channel closed");
                        inbound_open = false;
                    }
                }
            }
        }
    }

    engine
}

async fn handle_action(engine: &mut MatchingEngine, action: LocalAction) {
    // A dropped reply receiver only means the caller stopped waiting.
    match action {
        LocalAction::Initiate { peer, info, reply } => {
            let _ = reply.send(engine.initiate(&peer, info).await);
        }
        LocalAction::Skip { peer, reply } => {
            let _ = reply.send(engine.skip(&peer).await);
        }
        LocalAction::ClearMatch { id, reply } => {
            let _ = reply.send(engine.clear_match(&id));
        }
        LocalAction::Reset { reply } => {
            let _ = reply.send(engine.reset());
        }
        LocalAction::Records(reply) => {
            let _ = reply.send(engine.records());
        }
        LocalAction::Shutdown => {}
    }
}
