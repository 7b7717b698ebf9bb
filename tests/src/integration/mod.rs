//! Cross-crate flows driven against the in-memory network.

mod flows;
