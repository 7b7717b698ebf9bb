//! Inbound port (API) for transaction assembly.

use crate::domain::AssemblyError;
use shared_types::{IdentityContext, SignedEnvelope, Transaction, TransactionProposalResponse};

/// Turns endorsement results into something the ordering service accepts.
pub trait TransactionAssemblyApi: Send + Sync {
    /// Combine the endorsements of one proposal into a transaction.
    ///
    /// Fails on the first unusable response; all responses must be
    /// successful.
    fn assemble(
        &self,
        responses: &[TransactionProposalResponse],
    ) -> Result<Transaction, AssemblyError>;

    /// Wrap a transaction in an envelope signed by the proposal creator.
    fn create_signed_envelope(
        &self,
        transaction: &Transaction,
        ctx: &dyn IdentityContext,
    ) -> Result<SignedEnvelope, AssemblyError>;
}
