//! # Ordering Service Status
//!
//! Acknowledgement codes returned by an ordering node for a broadcast.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Status of a broadcast acknowledgement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BroadcastStatus {
    Success,
    BadRequest,
    Forbidden,
    NotFound,
    RequestEntityTooLarge,
    InternalServerError,
    ServiceUnavailable,
}

impl BroadcastStatus {
    /// HTTP-style numeric code.
    pub fn code(self) -> i32 {
        match self {
            BroadcastStatus::Success => 200,
            BroadcastStatus::BadRequest => 400,
            BroadcastStatus::Forbidden => 403,
            BroadcastStatus::NotFound => 404,
            BroadcastStatus::RequestEntityTooLarge => 413,
            BroadcastStatus::InternalServerError => 500,
            BroadcastStatus::ServiceUnavailable => 503,
        }
    }

    pub fn is_success(self) -> bool {
        self == BroadcastStatus::Success
    }
}

impl fmt::Display for BroadcastStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} ({})", self, self.code())
    }
}

/// Result of a successful broadcast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionResponse {
    /// URL of the orderer that acknowledged the envelope.
    pub orderer: String,
    pub status: BroadcastStatus,
}
