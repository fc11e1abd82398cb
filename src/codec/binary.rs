//! Byte-safe transforms for BINARY items
//!
//! The memcached protocol delimits data blocks by length, so bytes pass
//! through unchanged by default. `Base64` exists for transports that only
//! carry text; both sides of a store must pick the same transport.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};

use crate::error::DecodeError;

/// How BINARY values are laid out in the stored bytes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BinaryTransport {
    /// Bytes stored as-is
    #[default]
    Verbatim,

    /// Bytes stored as padded standard base64 text
    Base64,
}

impl BinaryTransport {
    /// Apply the transform before storage
    pub fn to_wire(self, data: &[u8]) -> Vec<u8> {
        match self {
            BinaryTransport::Verbatim => data.to_vec(),
            BinaryTransport::Base64 => STANDARD.encode(data).into_bytes(),
        }
    }

    /// Invert [`to_wire`](Self::to_wire)
    pub fn from_wire(self, wire: &[u8]) -> Result<Vec<u8>, DecodeError> {
        match self {
            BinaryTransport::Verbatim => Ok(wire.to_vec()),
            BinaryTransport::Base64 => STANDARD
                .decode(wire)
                .map_err(|e| DecodeError::BinaryTransformFailure(e.to_string())),
        }
    }
}
