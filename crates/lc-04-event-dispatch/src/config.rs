//! Configuration for the event dispatcher and client.

use crate::domain::{DispatcherError, EventKind};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Automatic reconnection after a transport failure.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconnectConfig {
    pub enabled: bool,
    /// Fixed delay between attempts, never less than 1 ms
    #[serde(with = "shared_types::duration::millis")]
    pub time_between_attempts: Duration,
    /// 0 means unlimited
    pub max_attempts: u32,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            time_between_attempts: Duration::from_secs(5),
            max_attempts: 5,
        }
    }
}

impl ReconnectConfig {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }

    /// Delay actually applied between attempts.
    pub fn delay(&self) -> Duration {
        self.time_between_attempts.max(Duration::from_millis(1))
    }
}

/// Dispatcher configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatcherConfig {
    /// How long a caller waits for the dispatcher (or the event service) to
    /// answer a request
    #[serde(with = "shared_types::duration::millis")]
    pub response_timeout: Duration,
    /// Capacity of each registrant's event queue
    pub consumer_buffer_size: usize,
    /// How long delivery waits on a full registrant queue before dropping
    /// the event; zero never waits
    #[serde(with = "shared_types::duration::millis")]
    pub consumer_timeout: Duration,
    /// Event kinds requested at channel registration
    pub event_kinds: Vec<EventKind>,
    pub reconnect: ReconnectConfig,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            response_timeout: Duration::from_secs(15),
            consumer_buffer_size: 100,
            consumer_timeout: Duration::from_millis(500),
            event_kinds: vec![EventKind::FilteredBlock],
            reconnect: ReconnectConfig::default(),
        }
    }
}

impl DispatcherConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), DispatcherError> {
        if self.response_timeout.is_zero() {
            return Err(DispatcherError::InvalidConfig(
                "response_timeout cannot be 0".into(),
            ));
        }
        if self.consumer_buffer_size == 0 {
            return Err(DispatcherError::InvalidConfig(
                "consumer_buffer_size cannot be 0".into(),
            ));
        }
        if self.event_kinds.is_empty() {
            return Err(DispatcherError::InvalidConfig(
                "at least one event kind must be requested".into(),
            ));
        }
        Ok(())
    }
}
