//! Error types for event dispatch

use crate::domain::events::EventKind;
use shared_types::{CodecError, SigningError};
use thiserror::Error;

/// Transport-level failures reported by a [`Connection`](crate::ports::outbound::Connection).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectionError {
    #[error("Failed to connect to {endpoint}: {reason}")]
    Connect { endpoint: String, reason: String },

    #[error("Failed to send on connection: {0}")]
    Send(String),

    #[error("Connection closed")]
    Closed,
}

/// Dispatcher errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatcherError {
    #[error("Not connected to the event service")]
    NotConnected,

    #[error("Already connected to the event service")]
    AlreadyConnected,

    #[error(transparent)]
    Connection(#[from] ConnectionError),

    /// No reply within the response timeout
    #[error("Timed out waiting for {operation}")]
    Timeout { operation: &'static str },

    /// Rejected registration parameters
    #[error("Invalid registration: {0}")]
    InvalidRegistration(String),

    /// The event service did not grant the event kind
    #[error("Not authorized for {kind} events")]
    NotAuthorized { kind: EventKind },

    #[error("Registration already exists for {0}")]
    AlreadyRegistered(String),

    #[error("Registration not found")]
    RegistrationNotFound,

    #[error("Channel registration failed: {0}")]
    ChannelRegistrationFailed(String),

    /// The dispatcher has been stopped
    #[error("Event dispatcher stopped")]
    Stopped,

    #[error("Reconnect attempts exhausted after {attempts} attempts")]
    ReconnectExhausted { attempts: u32 },

    #[error(transparent)]
    Signing(#[from] SigningError),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error("Invalid dispatcher config: {0}")]
    InvalidConfig(String),
}
