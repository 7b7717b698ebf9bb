//! # Signed Envelope
//!
//! The wire unit sent to ordering nodes and the unit stored in blocks.
//!
//! ## Security Properties
//!
//! - **Signature Coverage**: the signature covers the encoded payload bytes
//!   exactly as transmitted; receivers decode what was signed.
//! - **Creator Binding**: the payload header carries the creator identity and
//!   nonce that derived the transaction ID.

use crate::codec;
use crate::errors::{CodecError, SigningError};
use crate::identity::IdentityContext;
use crate::transaction::{ChannelHeader, Header};
use serde::{Deserialize, Serialize};

/// Envelope payload: a header plus type-specific data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payload {
    pub header: Header,
    pub data: Vec<u8>,
}

/// Encoded payload plus the creator's signature over it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedEnvelope {
    pub payload: Vec<u8>,
    pub signature: Vec<u8>,
}

impl SignedEnvelope {
    /// Encode `payload` and sign it with `ctx`.
    pub fn sign(payload: &Payload, ctx: &dyn IdentityContext) -> Result<Self, SigningError> {
        let payload = codec::encode("Payload", payload)?;
        let signature = ctx.sign(&payload)?;
        Ok(Self { payload, signature })
    }

    pub fn decode_payload(&self) -> Result<Payload, CodecError> {
        codec::decode("Payload", &self.payload)
    }

    /// Decode down to the channel header.
    pub fn channel_header(&self) -> Result<ChannelHeader, CodecError> {
        self.decode_payload()?.header.decode_channel_header()
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, CodecError> {
        codec::encode("SignedEnvelope", self)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CodecError> {
        codec::decode("SignedEnvelope", bytes)
    }
}
