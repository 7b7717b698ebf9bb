//! # Wire Codec
//!
//! Every nested message (headers, payloads, envelopes, blocks) travels as
//! opaque bytes and is decoded on demand. Encoding is bincode.

use crate::errors::CodecError;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Encode a message into its wire bytes.
pub fn encode<T: Serialize>(what: &'static str, value: &T) -> Result<Vec<u8>, CodecError> {
    bincode::serialize(value).map_err(|e| CodecError::Encode {
        what,
        reason: e.to_string(),
    })
}

/// Decode wire bytes into a message.
pub fn decode<T: DeserializeOwned>(what: &'static str, bytes: &[u8]) -> Result<T, CodecError> {
    bincode::deserialize(bytes).map_err(|e| CodecError::Decode {
        what,
        reason: e.to_string(),
    })
}
