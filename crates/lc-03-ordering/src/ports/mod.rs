//! Ports for the ordering client.

pub mod inbound;
pub mod outbound;
