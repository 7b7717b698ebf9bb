//! Outbound ports (SPI) for endorsement.

use async_trait::async_trait;
use shared_types::{ProcessorError, ProposalResponse, TransactionProposal};

/// One addressable endorsing peer.
///
/// Anything offering this capability can be a fan-out target; the RPC
/// transport behind it is outside this crate.
#[async_trait]
pub trait ProposalProcessor: Send + Sync {
    /// Address used to label this peer's response.
    fn endpoint(&self) -> &str;

    /// Simulate and endorse `proposal`.
    async fn process_transaction_proposal(
        &self,
        proposal: &TransactionProposal,
    ) -> Result<ProposalResponse, ProcessorError>;
}
