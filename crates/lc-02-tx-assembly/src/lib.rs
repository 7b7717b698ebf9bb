//! # Transaction Assembly Subsystem (lc-02)
//!
//! Combines the endorsements of one proposal into a transaction and signs
//! it into the envelope the ordering service accepts.
//!
//! ## Architecture Role
//!
//! ```text
//! [Endorsement (1)] ──Vec<TransactionProposalResponse>──→ [Tx Assembly (2)]
//!                                                               │
//!                                                               ↓ SignedEnvelope
//!                                                         [Ordering (3)]
//! ```

pub mod domain;
pub mod ports;
pub mod service;

pub use domain::AssemblyError;
pub use ports::inbound::TransactionAssemblyApi;
pub use service::TransactionAssembler;
