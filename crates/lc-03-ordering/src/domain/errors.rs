//! Error types for ordering

use shared_types::BroadcastStatus;
use thiserror::Error;

/// Failure of a single orderer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrdererError {
    #[error("Orderer {url} unreachable: {reason}")]
    Transport { url: String, reason: String },

    /// The orderer answered with a non-success status
    #[error("Orderer {url} returned {status}")]
    Status { url: String, status: BroadcastStatus },

    #[error("Orderer {url} timed out")]
    Timeout { url: String },

    /// The deliver stream ended without a block or an error
    #[error("Deliver stream from {url} closed without a block")]
    StreamClosed { url: String },
}

impl OrdererError {
    pub fn url(&self) -> &str {
        match self {
            OrdererError::Transport { url, .. }
            | OrdererError::Status { url, .. }
            | OrdererError::Timeout { url }
            | OrdererError::StreamClosed { url } => url,
        }
    }
}

/// Function-level ordering errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderingError {
    #[error("At least one orderer is required")]
    NoOrderers,

    /// Every orderer failed; carries the failure observed last
    #[error("All orderers failed, last error: {last}")]
    AllFailed { last: OrdererError },

    #[error("Invalid ordering config: {0}")]
    InvalidConfig(String),
}
