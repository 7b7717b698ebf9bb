//! # Channel Registration Messages
//!
//! Before the event service streams anything, the client registers for a
//! ledger channel with a signed request naming the event kinds it wants.
//! The service answers with the kinds it actually granted.

use crate::domain::errors::DispatcherError;
use crate::domain::events::EventKind;
use serde::{Deserialize, Serialize};
use shared_types::codec;
use shared_types::{CodecError, IdentityContext};

/// Ledger channel the client listens on and where to reach it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelContext {
    pub channel_id: String,
    pub endpoint: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChannelAction {
    Register,
    Deregister,
}

/// Body of a channel registration request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelRequestBody {
    pub action: ChannelAction,
    pub channel_ids: Vec<String>,
    pub event_kinds: Vec<EventKind>,
    pub creator: Vec<u8>,
    pub timestamp: u64,
}

/// Encoded body plus the client's signature over it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelRequest {
    pub payload: Vec<u8>,
    pub signature: Vec<u8>,
}

impl ChannelRequest {
    /// Build and sign a request.
    pub fn signed(
        action: ChannelAction,
        channel_ids: Vec<String>,
        event_kinds: Vec<EventKind>,
        ctx: &dyn IdentityContext,
    ) -> Result<Self, DispatcherError> {
        let body = ChannelRequestBody {
            action,
            channel_ids,
            event_kinds,
            creator: ctx.identity()?,
            timestamp: shared_types::now_ms(),
        };
        let payload = codec::encode("ChannelRequestBody", &body)?;
        let signature = ctx.sign(&payload)?;
        Ok(Self { payload, signature })
    }

    pub fn decode_body(&self) -> Result<ChannelRequestBody, CodecError> {
        codec::decode("ChannelRequestBody", &self.payload)
    }
}

/// Per-channel outcome of a registration request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelResult {
    pub channel_id: String,
    pub success: bool,
    pub error: Option<String>,
}

/// Reply of the event service to a [`ChannelRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelServiceResponse {
    pub success: bool,
    pub message: String,
    pub channel_results: Vec<ChannelResult>,
    pub authorized_events: Vec<EventKind>,
}

impl ChannelServiceResponse {
    /// Reason for failure, combining per-channel errors.
    pub fn failure_reason(&self) -> String {
        let errors: Vec<String> = self
            .channel_results
            .iter()
            .filter(|r| !r.success)
            .map(|r| match &r.error {
                Some(e) => format!("{}: {}", r.channel_id, e),
                None => r.channel_id.clone(),
            })
            .collect();

        if errors.is_empty() {
            self.message.clone()
        } else {
            format!("{} [{}]", self.message, errors.join(", "))
        }
    }
}
