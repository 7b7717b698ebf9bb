//! # Ledger Client Test Suite
//!
//! ## Structure
//!
//! ```text
//! tests/
//! ├── src/network.rs       # In-memory peers, orderers, ledger and event service
//! ├── src/integration/     # End-to-end flows across lc-01..lc-05
//! └── benches/             # Proposal and assembly benchmarks
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p lc-tests
//! cargo bench -p lc-tests
//! ```

pub mod integration;
pub mod network;
