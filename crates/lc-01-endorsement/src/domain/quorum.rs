//! Helpers for deciding whether a set of responses is good enough.
//!
//! The broadcaster itself never judges results; callers pick their own
//! threshold ("at least K of N peers endorsed").

use crate::domain::errors::EndorsementError;
use shared_types::TransactionProposalResponse;

/// Split responses into (successful, failed) preserving input order.
pub fn partition_responses(
    responses: Vec<TransactionProposalResponse>,
) -> (Vec<TransactionProposalResponse>, Vec<TransactionProposalResponse>) {
    responses.into_iter().partition(|r| r.is_success())
}

/// Keep the successful responses, failing unless at least `required` exist.
pub fn require_quorum(
    responses: Vec<TransactionProposalResponse>,
    required: usize,
) -> Result<Vec<TransactionProposalResponse>, EndorsementError> {
    let (successful, _) = partition_responses(responses);
    if successful.len() < required.max(1) {
        return Err(EndorsementError::InsufficientEndorsements {
            got: successful.len(),
            required: required.max(1),
        });
    }
    Ok(successful)
}
