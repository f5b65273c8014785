//! Binary-safe text transport for file bytes entering the sandbox.
//!
//! Staged content crosses the sandbox boundary as standard base64 text and is
//! decoded back to raw bytes right before it is written.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;

pub use base64::DecodeError;

/// Encode raw bytes into transport text.
pub fn encode(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Decode transport text back into the original bytes.
pub fn decode(payload: &str) -> Result<Vec<u8>, DecodeError> {
    STANDARD.decode(payload)
}
