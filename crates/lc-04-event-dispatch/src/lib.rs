//! # Event Dispatch Subsystem (lc-04)
//!
//! Streams block events from a peer's event service and fans them out to
//! registered consumers.
//!
//! ## Architecture Role
//!
//! ```text
//! [Event service] ──Block / FilteredBlock──→ [Dispatcher worker] ──→ block registration
//!                                                   │          ──→ filtered block registration
//!                                                   │          ──→ chaincode registrations (cc_id, regex)
//!                                                   │          ──→ tx status registrations (one-shot)
//!                                                   └──────────→ connection registration
//! ```
//!
//! ## Delivery Rules
//!
//! - Every event goes through a bounded per-consumer queue. A consumer that
//!   stays full for longer than `consumer_timeout` loses that event; the
//!   dispatcher never blocks on it indefinitely.
//! - Chaincode and tx status events are only produced for the transactions
//!   they belong to; chaincode events of invalid transactions are skipped.
//! - Stopping the dispatcher closes every consumer queue.
//!
//! [`EventClient`] wraps the dispatcher and reconnects after transport
//! failures.

pub mod client;
pub mod config;
pub mod dispatcher;
pub mod domain;
pub mod ports;

pub use client::EventClient;
pub use config::{DispatcherConfig, ReconnectConfig};
pub use dispatcher::Dispatcher;
pub use domain::{
    accept_all, header_type_filter, BlockEvent, BlockFilter, CCEvent, ChannelContext,
    ConnectionError, ConnectionEvent, ConnectionState, DispatcherError, EventKind,
    FilteredBlockEvent, Registration, RegistrationKind, TxStatusEvent,
};
pub use ports::inbound::{EventServiceApi, Subscription};
pub use ports::outbound::{Connection, ConnectionProvider, InboundMessage, InboundSink};
