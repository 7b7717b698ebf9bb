//! # Domain Layer for Endorsement
//!
//! Error types and the pure helpers callers use to judge a response set.

pub mod errors;
pub mod quorum;

pub use errors::EndorsementError;
pub use quorum::{partition_responses, require_quorum};
