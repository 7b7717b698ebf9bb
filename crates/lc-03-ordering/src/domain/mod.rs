//! # Domain Layer for Ordering

pub mod errors;

pub use errors::{OrdererError, OrderingError};
