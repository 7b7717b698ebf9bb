//! # Registrations
//!
//! Callers hold an opaque [`Registration`] handle; the dispatcher holds the
//! matching record with the sending half of the event queue. Dropping the
//! record closes the caller's queue.

use crate::domain::events::{
    BlockEvent, CCEvent, ConnectionEvent, EventKind, FilteredBlockEvent, TxStatusEvent,
};
use crate::domain::filter::BlockFilter;
use regex::Regex;
use std::fmt;
use tokio::sync::mpsc;
use uuid::Uuid;

/// What a registration listens for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegistrationKind {
    Block,
    FilteredBlock,
    Chaincode,
    TxStatus,
    Connection,
}

impl RegistrationKind {
    /// Event kind the service must grant for this registration, if any.
    pub fn required_event_kind(self) -> Option<EventKind> {
        match self {
            RegistrationKind::Block => Some(EventKind::Block),
            RegistrationKind::FilteredBlock
            | RegistrationKind::Chaincode
            | RegistrationKind::TxStatus => Some(EventKind::FilteredBlock),
            RegistrationKind::Connection => None,
        }
    }

    /// Metric label.
    pub fn label(self) -> &'static str {
        match self {
            RegistrationKind::Block => "block",
            RegistrationKind::FilteredBlock => "filtered_block",
            RegistrationKind::Chaincode => "chaincode",
            RegistrationKind::TxStatus => "tx_status",
            RegistrationKind::Connection => "connection",
        }
    }
}

/// Opaque handle returned by every `register_*` call.
///
/// Compared by identity: two handles are equal only if they came from the
/// same registration.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Registration {
    id: Uuid,
    kind: RegistrationKind,
}

impl Registration {
    pub(crate) fn new(kind: RegistrationKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
        }
    }

    pub fn kind(&self) -> RegistrationKind {
        self.kind
    }

    pub(crate) fn id(&self) -> Uuid {
        self.id
    }
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Registration({:?}, {})", self.kind, self.id)
    }
}

pub(crate) struct BlockReg {
    pub id: Uuid,
    pub filter: BlockFilter,
    pub sender: mpsc::Sender<BlockEvent>,
}

pub(crate) struct FilteredBlockReg {
    pub id: Uuid,
    pub sender: mpsc::Sender<FilteredBlockEvent>,
}

pub(crate) struct ChaincodeReg {
    pub id: Uuid,
    pub chaincode_id: String,
    pub event_filter: Regex,
    pub sender: mpsc::Sender<CCEvent>,
}

pub(crate) struct TxStatusReg {
    pub id: Uuid,
    pub sender: mpsc::Sender<TxStatusEvent>,
}

pub(crate) struct ConnectionReg {
    pub id: Uuid,
    pub sender: mpsc::Sender<ConnectionEvent>,
}
