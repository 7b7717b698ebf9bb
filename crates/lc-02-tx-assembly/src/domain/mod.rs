//! # Domain Layer for Transaction Assembly

pub mod errors;

pub use errors::AssemblyError;
