//! # Domain Layer for the Channel Client

pub mod errors;
pub mod request;

pub use errors::ChannelClientError;
pub use request::{ExecuteResponse, Request};
