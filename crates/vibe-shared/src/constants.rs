/// Message-type marker carried on every protocol frame produced by this crate.
/// Frames with any other marker belong to ordinary chat traffic.
pub const VIBE_MESSAGE_TYPE: &str = "vibe";

/// Size in bytes of a vibe secret.
pub const SECRET_SIZE: usize = 32;

/// Size in bytes of a commitment (BLAKE3 output).
pub const COMMITMENT_SIZE: usize = 32;

/// Ed25519 public key size in bytes
pub const PUBKEY_SIZE: usize = 32;

/// Length of a hex-encoded peer identity.
pub const PEER_IDENTITY_HEX_LEN: usize = PUBKEY_SIZE * 2;

/// Number of identity characters shown in placeholder names and log fields.
pub const SHORT_ID_LEN: usize = 8;

/// Maximum accepted size of an inbound vibe payload (4 KiB).
pub const MAX_PAYLOAD_SIZE: usize = 4096;
