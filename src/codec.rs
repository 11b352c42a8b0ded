//! Text-safe encoding of raw document bytes.
//!
//! Cached documents are persisted as strings, so their bytes go through
//! standard (padded) base64 on the way in and back out before upload.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::error::CodecError;

/// Encode raw bytes into their persistable text form.
pub fn encode(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Decode text produced by [`encode`] back into the original bytes.
pub fn decode(text: &str) -> Result<Vec<u8>, CodecError> {
    STANDARD
        .decode(text.as_bytes())
        .map_err(|e| CodecError(e.to_string()))
}
