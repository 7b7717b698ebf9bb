//! Error types for endorsement

use thiserror::Error;

/// Function-level endorsement errors. Per-peer failures never surface
/// here; they are carried in each response.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EndorsementError {
    /// The proposal has no signed bytes
    #[error("Signed proposal is required")]
    MissingProposal,

    /// No endorsing peers were given
    #[error("At least one endorsement target is required")]
    NoTargets,

    /// Fewer peers endorsed than the caller requires
    #[error("Insufficient endorsements: {got} of {required} required")]
    InsufficientEndorsements { got: usize, required: usize },

    /// Configuration rejected by `validate`
    #[error("Invalid endorsement config: {0}")]
    InvalidConfig(String),
}
