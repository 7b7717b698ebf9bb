//! Ports for transaction assembly.

pub mod inbound;
