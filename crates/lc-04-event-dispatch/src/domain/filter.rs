//! Block filters for block registrations.

use shared_types::{Block, HeaderType};
use std::sync::Arc;

/// Predicate deciding whether a block reaches the block registration.
pub type BlockFilter = Arc<dyn Fn(&Block) -> bool + Send + Sync>;

/// Accept every block.
pub fn accept_all() -> BlockFilter {
    Arc::new(|_| true)
}

/// Accept blocks whose first envelope has one of `types`.
///
/// Blocks that cannot be classified are rejected.
pub fn header_type_filter(types: &[HeaderType]) -> BlockFilter {
    let types = types.to_vec();
    Arc::new(move |block| match block.header_type() {
        Ok(Some(header_type)) => types.contains(&header_type),
        _ => false,
    })
}
