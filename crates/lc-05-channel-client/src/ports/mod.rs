//! Ports for the channel client.
//!
//! Outbound collaborators are the ports of the subsystem crates:
//! `ProposalProcessor`, `Orderer` and `EventServiceApi`.

pub mod inbound;

pub use inbound::ChannelApi;
