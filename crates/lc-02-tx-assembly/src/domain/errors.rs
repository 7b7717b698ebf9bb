//! Error types for transaction assembly

use shared_types::{CodecError, ProcessorError, SigningError};
use thiserror::Error;

/// Assembly errors. No partial transaction is ever produced alongside one.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssemblyError {
    #[error("At least one proposal response is required")]
    NoResponses,

    /// The canonical proposal or a response payload did not decode
    #[error(transparent)]
    Decode(#[from] CodecError),

    /// The network call to an endorser failed
    #[error("Endorser {endorser} failed: {source}")]
    EndorserFailed {
        endorser: String,
        source: ProcessorError,
    },

    /// The endorser answered with a non-200 status
    #[error("Proposal rejected by {endorser} with status {status}: {message}")]
    Rejected {
        endorser: String,
        status: i32,
        message: String,
    },

    /// A successful response carried no endorsement
    #[error("Response from {endorser} carries no endorsement")]
    MissingEndorsement { endorser: String },

    /// Endorsers disagreed on the simulation result
    #[error("Proposal response payload from {endorser} does not match the first response")]
    PayloadMismatch { endorser: String },

    /// The envelope signer is not the proposal creator
    #[error("Envelope signer does not match the proposal creator")]
    SignerMismatch,

    #[error(transparent)]
    Signing(#[from] SigningError),
}
