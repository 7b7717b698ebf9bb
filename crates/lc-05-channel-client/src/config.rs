//! Configuration for the channel client.

use crate::domain::ChannelClientError;
use lc_01_endorsement::EndorsementConfig;
use lc_03_ordering::OrderingConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Channel client configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelClientConfig {
    /// Successful endorsements required before a result is used
    pub min_endorsements: usize,
    /// How long `execute` waits for the commit event after broadcast
    #[serde(with = "shared_types::duration::millis")]
    pub commit_timeout: Duration,
    pub endorsement: EndorsementConfig,
    pub ordering: OrderingConfig,
}

impl Default for ChannelClientConfig {
    fn default() -> Self {
        Self {
            min_endorsements: 1,
            commit_timeout: Duration::from_secs(30),
            endorsement: EndorsementConfig::default(),
            ordering: OrderingConfig::default(),
        }
    }
}

impl ChannelClientConfig {
    /// Validate this config and the nested subsystem configs.
    pub fn validate(&self) -> Result<(), ChannelClientError> {
        if self.min_endorsements == 0 {
            return Err(ChannelClientError::InvalidConfig(
                "min_endorsements must be at least 1".into(),
            ));
        }
        if self.commit_timeout.is_zero() {
            return Err(ChannelClientError::InvalidConfig(
                "commit_timeout cannot be 0".into(),
            ));
        }
        self.endorsement
            .validate()
            .map_err(|e| ChannelClientError::InvalidConfig(e.to_string()))?;
        self.ordering
            .validate()
            .map_err(|e| ChannelClientError::InvalidConfig(e.to_string()))?;
        Ok(())
    }
}
