//! Error types for the channel client

use lc_01_endorsement::EndorsementError;
use lc_02_tx_assembly::AssemblyError;
use lc_03_ordering::OrderingError;
use lc_04_event_dispatch::DispatcherError;
use shared_types::{ProposalError, TxValidationCode};
use std::time::Duration;
use thiserror::Error;

/// Errors returned by `query` and `execute`.
#[derive(Debug, Error)]
pub enum ChannelClientError {
    /// Request is missing a required field
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The proposal could not be built or signed
    #[error("Proposal creation failed: {0}")]
    Proposal(#[from] ProposalError),

    #[error("Endorsement failed: {0}")]
    Endorsement(#[from] EndorsementError),

    #[error("Transaction assembly failed: {0}")]
    Assembly(#[from] AssemblyError),

    #[error("Ordering failed: {0}")]
    Ordering(#[from] OrderingError),

    /// Commit event registration failed
    #[error("Event service error: {0}")]
    Events(#[from] DispatcherError),

    /// No commit event arrived in time; the transaction may still commit
    #[error("Timed out after {timeout:?} waiting for commit of {tx_id}")]
    CommitTimeout { tx_id: String, timeout: Duration },

    /// The event stream ended before the commit event arrived
    #[error("Event stream closed before commit of {tx_id}")]
    CommitStreamClosed { tx_id: String },

    /// The transaction was ordered but the committing peer invalidated it
    #[error("Transaction {tx_id} rejected: {code}")]
    TxRejected {
        tx_id: String,
        code: TxValidationCode,
    },

    /// Configuration rejected by `validate`
    #[error("Invalid channel client config: {0}")]
    InvalidConfig(String),
}
