use thiserror::Error;

#[derive(Error, Debug)]
pub enum CommitmentError {
    #[error("Secure random source failed: {0}")]
    Rng(String),

    #[error("Invalid length: expected {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("Hex decode error: {0}")]
    Hex(#[from] hex::FromHexError),
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum IdentityError {
    #[error("Invalid peer identity: expected 64 hex characters, got {0:?}")]
    InvalidPeerIdentity(String),
}

#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Payload too large: {size} bytes (max {max})")]
    TooLarge { size: usize, max: usize },

    #[error("Malformed payload: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Invalid field {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },
}
