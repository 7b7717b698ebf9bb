//! Ports module for endorsement
//!
//! Defines inbound (API) and outbound (SPI) port traits.

pub mod inbound;
pub mod outbound;

pub use inbound::EndorsementApi;
pub use outbound::ProposalProcessor;
