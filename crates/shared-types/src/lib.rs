//! # Shared Types Crate
//!
//! Types shared by every ledger-client subsystem: the transaction lifecycle
//! messages, signed envelopes, blocks, and the signing capability.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: every cross-subsystem type is defined here.
//! - **Signed Bytes Travel Encoded**: nested messages are kept as the exact
//!   bytes that were signed and decoded on demand.
//! - **No Key Management**: signing is delegated to an [`IdentityContext`]
//!   supplied by the application.

pub mod block;
pub mod broadcast;
pub mod codec;
pub mod duration;
pub mod envelope;
pub mod errors;
pub mod identity;
pub mod transaction;

pub use block::{Block, BlockHeader, FilteredBlock, FilteredTransaction, TxValidationCode};
pub use broadcast::{BroadcastStatus, TransactionResponse};
pub use envelope::{Payload, SignedEnvelope};
pub use errors::*;
pub use identity::{Ed25519Identity, IdentityContext, SerializedIdentity};
pub use transaction::*;
