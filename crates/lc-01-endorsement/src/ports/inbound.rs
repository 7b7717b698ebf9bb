//! Inbound ports (API) for endorsement.

use crate::domain::EndorsementError;
use crate::ports::outbound::ProposalProcessor;
use async_trait::async_trait;
use shared_types::{TransactionProposal, TransactionProposalResponse};
use std::sync::Arc;

/// Primary endorsement API.
#[async_trait]
pub trait EndorsementApi: Send + Sync {
    /// Send `proposal` to every target concurrently.
    ///
    /// Returns exactly one response per target, in completion order. Fails
    /// only when the proposal is unsigned or `targets` is empty.
    async fn send(
        &self,
        proposal: Arc<TransactionProposal>,
        targets: &[Arc<dyn ProposalProcessor>],
    ) -> Result<Vec<TransactionProposalResponse>, EndorsementError>;
}
