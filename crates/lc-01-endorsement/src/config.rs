//! Configuration for the endorsement fan-out.

use crate::domain::EndorsementError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Endorsement configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct EndorsementConfig {
    /// Upper bound on a single peer's call. `None` waits for the peer's own
    /// transport to give up.
    #[serde(default, with = "shared_types::duration::option_millis")]
    pub target_timeout: Option<Duration>,
}

impl EndorsementConfig {
    /// Config with a per-target timeout.
    pub fn with_target_timeout(timeout: Duration) -> Self {
        Self {
            target_timeout: Some(timeout),
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), EndorsementError> {
        if self.target_timeout.is_some_and(|t| t.is_zero()) {
            return Err(EndorsementError::InvalidConfig(
                "target_timeout cannot be 0".into(),
            ));
        }
        Ok(())
    }
}
