//! # Channel Client (lc-05)
//!
//! Runs a chaincode invocation through the whole transaction lifecycle on
//! one ledger channel.
//!
//! ## Architecture Role
//!
//! ```text
//!                       ┌──→ [Endorsement (1)] ──→ peers
//! [Application] ──→ [Channel Client (5)] ──→ [Tx Assembly (2)]
//!                       ├──→ [Ordering (3)] ──→ orderers
//!                       └──→ [Event Dispatch (4)] ←── commit events
//! ```
//!
//! - `query` endorses and returns the first successful chaincode response.
//! - `execute` additionally orders the transaction and waits for its
//!   commit event; a transaction invalidated at commit is an error.

pub mod config;
pub mod domain;
pub mod ports;
pub mod service;

pub use config::ChannelClientConfig;
pub use domain::{ChannelClientError, ExecuteResponse, Request};
pub use ports::inbound::ChannelApi;
pub use service::ChannelClient;
