//! # Error Types
//!
//! Errors shared by every subsystem that encodes messages or signs them.

use thiserror::Error;

/// Errors raised while encoding or decoding wire messages.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// The value could not be serialized.
    #[error("Failed to encode {what}: {reason}")]
    Encode { what: &'static str, reason: String },

    /// The bytes did not decode into the expected message.
    #[error("Failed to decode {what}: {reason}")]
    Decode { what: &'static str, reason: String },
}

/// Errors raised by an [`IdentityContext`](crate::identity::IdentityContext).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SigningError {
    /// The serialized identity could not be produced.
    #[error("Identity unavailable: {0}")]
    IdentityUnavailable(String),

    /// The signing provider rejected the request.
    #[error("Signing failed: {0}")]
    SignFailed(String),

    /// Nonce generation failed.
    #[error("Nonce generation failed: {0}")]
    Nonce(String),

    /// A message needed for signing could not be encoded.
    #[error(transparent)]
    Codec(#[from] CodecError),
}

/// Errors raised while building a transaction proposal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProposalError {
    /// Channel ID is required.
    #[error("Channel ID is required")]
    EmptyChannel,

    /// Chaincode ID is required.
    #[error("Chaincode ID is required")]
    EmptyChaincode,

    /// Signing the proposal failed.
    #[error(transparent)]
    Signing(#[from] SigningError),

    /// Encoding a nested message failed.
    #[error(transparent)]
    Codec(#[from] CodecError),
}

/// Network-level failure reported by one endorsing peer.
///
/// Distinct from a ledger-level rejection, which arrives as a response
/// whose status is not 200.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProcessorError {
    /// The peer could not be reached or the call failed in transport.
    #[error("Transport failure at {endpoint}: {reason}")]
    Transport { endpoint: String, reason: String },

    /// The peer did not answer within the configured timeout.
    #[error("Timed out waiting for {endpoint}")]
    Timeout { endpoint: String },

    /// The task driving the call terminated abnormally.
    #[error("Endorsement task for {endpoint} failed: {reason}")]
    TaskFailed { endpoint: String, reason: String },
}
