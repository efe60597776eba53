use serde::{Deserialize, Serialize};

use crate::commitment::{Commitment, Secret};
use crate::constants::{MAX_PAYLOAD_SIZE, VIBE_MESSAGE_TYPE};
use crate::error::ProtocolError;
use crate::types::VibeId;

/// The two messages of the commit-reveal exchange.
///
/// JSON form:
/// `{"type":"commitment","vibeId":"...","commitment":"<hex>"}` or
/// `{"type":"reveal","vibeId":"...","secret":"<hex>"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum VibeMessage {
    Commitment {
        #[serde(rename = "vibeId")]
        vibe_id: VibeId,
        commitment: Commitment,
    },
    Reveal {
        #[serde(rename = "vibeId")]
        vibe_id: VibeId,
        secret: Secret,
    },
}

impl VibeMessage {
    pub fn vibe_id(&self) -> &VibeId {
        match self {
            Self::Commitment { vibe_id, .. } | Self::Reveal { vibe_id, .. } => vibe_id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Commitment { .. } => "commitment",
            Self::Reveal { .. } => "reveal",
        }
    }

    /// Serialize to JSON bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>, ProtocolError> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Deserialize from JSON bytes, rejecting oversized bodies and empty ids.
    pub fn from_bytes(data: &[u8]) -> Result<Self, ProtocolError> {
        if data.len() > MAX_PAYLOAD_SIZE {
            return Err(ProtocolError::TooLarge {
                size: data.len(),
                max: MAX_PAYLOAD_SIZE,
            });
        }
        let message: Self = serde_json::from_slice(data)?;
        if message.vibe_id().as_str().trim().is_empty() {
            return Err(ProtocolError::InvalidField {
                field: "vibeId",
                reason: "empty".to_string(),
            });
        }
        Ok(message)
    }

    pub fn to_frame(&self) -> Result<ProtocolFrame, ProtocolError> {
        Ok(ProtocolFrame {
            message_type: VIBE_MESSAGE_TYPE.to_string(),
            body: self.to_bytes()?,
        })
    }
}

/// An opaque message body plus the marker telling vibe traffic apart from
/// ordinary chat content on the shared transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolFrame {
    pub message_type: String,
    pub body: Vec<u8>,
}

impl ProtocolFrame {
    pub fn is_vibe(&self) -> bool {
        self.message_type == VIBE_MESSAGE_TYPE
    }
}
