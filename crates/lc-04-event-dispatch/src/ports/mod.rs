//! Ports for event dispatch.

pub mod inbound;
pub mod outbound;
