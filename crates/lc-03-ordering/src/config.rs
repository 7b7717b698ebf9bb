//! Configuration for the ordering client.

use crate::domain::OrderingError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// What happens to the deliver requests that lost the race.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoserPolicy {
    /// Losing requests run until they finish on their own; results are
    /// discarded.
    #[default]
    Detach,
    /// Losing requests are cancelled as soon as a winner is recorded.
    Cancel,
}

/// Ordering configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderingConfig {
    /// Per-orderer bound on a deliver request
    #[serde(with = "shared_types::duration::millis")]
    pub deliver_timeout: Duration,
    /// Seed for the orderer shuffle; `None` seeds from OS entropy
    pub seed: Option<u64>,
    pub loser_policy: LoserPolicy,
}

impl Default for OrderingConfig {
    fn default() -> Self {
        Self {
            deliver_timeout: Duration::from_secs(30),
            seed: None,
            loser_policy: LoserPolicy::Detach,
        }
    }
}

impl OrderingConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), OrderingError> {
        if self.deliver_timeout.is_zero() {
            return Err(OrderingError::InvalidConfig(
                "deliver_timeout cannot be 0".into(),
            ));
        }
        Ok(())
    }
}
