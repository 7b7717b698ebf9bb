//! # Events delivered to registrants

use serde::{Deserialize, Serialize};
use shared_types::{Block, FilteredBlock, TxValidationCode};
use std::fmt;

/// Kind of block stream the event service can grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Block,
    FilteredBlock,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventKind::Block => f.write_str("block"),
            EventKind::FilteredBlock => f.write_str("filtered block"),
        }
    }
}

/// Full block received from the event service.
#[derive(Debug, Clone)]
pub struct BlockEvent {
    pub block: Block,
    pub source_url: String,
}

/// Filtered block received from the event service.
#[derive(Debug, Clone)]
pub struct FilteredBlockEvent {
    pub filtered_block: FilteredBlock,
    pub source_url: String,
}

/// Chaincode event from a valid transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CCEvent {
    pub tx_id: String,
    pub chaincode_id: String,
    pub event_name: String,
    pub payload: Vec<u8>,
    pub block_number: u64,
    pub source_url: String,
}

/// Commit outcome of one transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxStatusEvent {
    pub tx_id: String,
    pub tx_validation_code: TxValidationCode,
    pub block_number: u64,
    pub source_url: String,
}

/// Connection state change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionEvent {
    pub connected: bool,
    /// Set when the connection dropped because of a transport error
    pub error: Option<String>,
}

impl ConnectionEvent {
    pub fn connected() -> Self {
        Self {
            connected: true,
            error: None,
        }
    }

    pub fn disconnected(error: Option<String>) -> Self {
        Self {
            connected: false,
            error,
        }
    }
}

/// Lifecycle of the event connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
}
