use thiserror::Error;

use vibe_shared::{CommitmentError, PeerIdentity};
use vibe_store::StoreError;

/// Errors returned to callers of engine operations.
///
/// Peer misbehaviour (bad payloads, failed reveals) never shows up here; it is
/// logged and dropped inside the engine.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error("Commitment error: {0}")]
    Commitment(#[from] CommitmentError),

    #[error("Cannot send a vibe to the local identity")]
    SelfVibe,

    #[error("Matching engine is not running")]
    Stopped,
}

/// Failure to hand a message to the transport.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SendError {
    #[error("Peer {0} is unreachable")]
    Unreachable(PeerIdentity),

    #[error("Peer {0} is not accepting frames right now")]
    Congested(PeerIdentity),

    #[error("Transport channel closed")]
    ChannelClosed,

    #[error("Could not encode payload: {0}")]
    Encode(String),

    #[error("Transport error: {0}")]
    Transport(String),
}
