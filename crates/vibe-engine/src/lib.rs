//! # vibe-engine
//!
//! The mutual-interest matching protocol. A [`MatchingEngine`] turns local
//! actions (initiate, skip) and inbound Commitment/Reveal messages into
//! record transitions, and talks to the outside world only through the
//! collaborator traits in [`collaborators`].
//!
//! [`runtime::spawn_engine`] drives one engine from a single task so that
//! inbound messages and local actions never race over the same record.

pub mod collaborators;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod loopback;
pub mod peer_info;
pub mod runtime;
pub mod tiebreak;

pub use collaborators::{Collaborators, InboundFrame, MatchAnnouncer, Notifier, Transport};
pub use config::EngineConfig;
pub use engine::{ActionReport, MatchingEngine, Transition};
pub use error::{EngineError, SendError};
pub use events::{EventSink, VibeEvent};
pub use loopback::{LoopbackNetwork, LoopbackTransport};
pub use peer_info::{PeerDirectory, PeerInfo, PeerInfoResolver, StaticDirectory};
pub use runtime::{spawn_engine, EngineHandle, LocalAction};
