//! Types, primitives and wire formats shared by every vibe crate.

pub mod commitment;
pub mod constants;
pub mod error;
pub mod identity;
pub mod protocol;
pub mod types;

pub use commitment::{commit, generate_secret, verify, Commitment, Secret};
pub use error::{CommitmentError, IdentityError, ProtocolError};
pub use protocol::{ProtocolFrame, VibeMessage};
pub use types::{PeerIdentity, VibeId};
