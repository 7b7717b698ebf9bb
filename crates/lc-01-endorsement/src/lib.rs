//! # Endorsement Subsystem (lc-01)
//!
//! Sends one signed transaction proposal to N endorsing peers concurrently
//! and collects N independent responses.
//!
//! ## Architecture Role
//!
//! ```text
//! [Channel Client (5)] ──send(proposal, targets)──→ [Endorsement (1)]
//!                                                         │
//!                                                         ↓ one task per peer
//!                                                 ┌───────┴───────┐
//!                                                 ↓               ↓
//!                                            [Peer A]        [Peer B] ...
//! ```
//!
//! ## Error Policy
//!
//! - Precondition violations (unsigned proposal, no targets) fail before any I/O
//! - Per-peer transport failures are carried in that peer's response slot
//! - Deciding whether a partial set is sufficient is left to the caller
//!   ([`require_quorum`])

pub mod config;
pub mod domain;
pub mod ports;
pub mod service;

pub use config::EndorsementConfig;
pub use domain::{partition_responses, require_quorum, EndorsementError};
pub use ports::inbound::EndorsementApi;
pub use ports::outbound::ProposalProcessor;
pub use service::ProposalBroadcaster;
