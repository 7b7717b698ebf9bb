//! # Domain Layer for Event Dispatch

pub mod channel;
pub mod errors;
pub mod events;
pub mod filter;
pub mod registration;

pub use channel::{
    ChannelAction, ChannelContext, ChannelRequest, ChannelRequestBody, ChannelResult,
    ChannelServiceResponse,
};
pub use errors::{ConnectionError, DispatcherError};
pub use events::{
    BlockEvent, CCEvent, ConnectionEvent, ConnectionState, EventKind, FilteredBlockEvent,
    TxStatusEvent,
};
pub use filter::{accept_all, header_type_filter, BlockFilter};
pub use registration::{Registration, RegistrationKind};
