//! # Ordering Subsystem (lc-03)
//!
//! Submits signed envelopes to the ordering service and fetches blocks
//! from it.
//!
//! ## Architecture Role
//!
//! ```text
//! [Tx Assembly (2)] ──SignedEnvelope──→ [Ordering (3)] ──broadcast──→ [Orderer nodes]
//!                                              ↑
//!                                              └──deliver (first block wins)
//! ```
//!
//! ## Failure Semantics
//!
//! - `broadcast` tries orderers one at a time and reports the last failure
//!   only when all of them failed.
//! - `deliver` queries all orderers at once; it fails only after every one
//!   has failed or timed out.

pub mod config;
pub mod domain;
pub mod ports;
pub mod service;

pub use config::{LoserPolicy, OrderingConfig};
pub use domain::{OrdererError, OrderingError};
pub use ports::inbound::OrderingApi;
pub use ports::outbound::Orderer;
pub use service::OrdererBroadcaster;
