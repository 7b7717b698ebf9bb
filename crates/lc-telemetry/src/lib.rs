//! # Ledger Client Telemetry
//!
//! Structured logging and Prometheus metrics shared by all subsystems.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use lc_telemetry::{init_telemetry, TelemetryConfig};
//!
//! let config = TelemetryConfig::from_env();
//! init_telemetry(&config)?;
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `LC_SERVICE_NAME` | `ledger-client` | Service name in logs |
//! | `LC_LOG_LEVEL` | `info` | Log level filter |
//! | `LC_JSON_LOGS` | `false` | JSON output |

mod config;
mod logging;
pub mod metrics;

pub use config::TelemetryConfig;
pub use logging::init_logging;
pub use metrics::{
    encode_metrics, register_metrics, HistogramTimer, ACTIVE_REGISTRATIONS, BROADCAST_ATTEMPTS,
    DELIVER_REQUESTS, ENDORSEMENT_DURATION, ENDORSEMENT_RESPONSES, EVENTS_DISPATCHED,
    EVENTS_DROPPED, PROPOSALS_SENT, RECONNECT_ATTEMPTS,
};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to initialize logging: {0}")]
    LoggingInit(String),

    #[error("Failed to initialize Prometheus metrics: {0}")]
    MetricsInit(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Register metrics and install the global log subscriber.
pub fn init_telemetry(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    register_metrics()?;
    init_logging(config)
}
