//! Prometheus metrics for the ledger client.
//!
//! All metrics follow the naming convention: `lc_<component>_<metric>_<unit>`

use lazy_static::lazy_static;
use prometheus::{
    exponential_buckets, Counter, CounterVec, Encoder, Gauge, Histogram, HistogramOpts, Opts,
    Registry, TextEncoder,
};

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    // =========================================================================
    // ENDORSEMENT METRICS (Subsystem 1)
    // =========================================================================

    /// Proposals fanned out to endorsers
    pub static ref PROPOSALS_SENT: Counter = Counter::new(
        "lc_endorsement_proposals_sent_total",
        "Total proposals sent to endorsing peers"
    ).expect("metric creation failed");

    /// Per-target endorsement outcomes
    pub static ref ENDORSEMENT_RESPONSES: CounterVec = CounterVec::new(
        Opts::new("lc_endorsement_responses_total", "Endorsement responses by outcome"),
        &["outcome"]  // outcome: success/rejected/error
    ).expect("metric creation failed");

    /// Time to collect all endorsements for one proposal
    pub static ref ENDORSEMENT_DURATION: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "lc_endorsement_duration_seconds",
            "Time spent waiting for all endorsers"
        ).buckets(exponential_buckets(0.001, 2.0, 15).unwrap_or_default())
    ).expect("metric creation failed");

    // =========================================================================
    // ORDERING METRICS (Subsystem 3)
    // =========================================================================

    /// Broadcast attempts per orderer
    pub static ref BROADCAST_ATTEMPTS: CounterVec = CounterVec::new(
        Opts::new("lc_ordering_broadcast_attempts_total", "Broadcast attempts by outcome"),
        &["outcome"]  // outcome: success/failure
    ).expect("metric creation failed");

    /// Deliver requests by outcome
    pub static ref DELIVER_REQUESTS: CounterVec = CounterVec::new(
        Opts::new("lc_ordering_deliver_requests_total", "Deliver requests by outcome"),
        &["outcome"]  // outcome: success/failure
    ).expect("metric creation failed");

    // =========================================================================
    // EVENT METRICS (Subsystem 4)
    // =========================================================================

    /// Events handed to registrants
    pub static ref EVENTS_DISPATCHED: CounterVec = CounterVec::new(
        Opts::new("lc_events_dispatched_total", "Events delivered to registrations"),
        &["kind"]  // kind: block/filtered_block/chaincode/tx_status/connection
    ).expect("metric creation failed");

    /// Events dropped because a consumer queue stayed full
    pub static ref EVENTS_DROPPED: CounterVec = CounterVec::new(
        Opts::new("lc_events_dropped_total", "Events dropped on full consumer queues"),
        &["kind"]
    ).expect("metric creation failed");

    /// Active registrations held by the dispatcher
    pub static ref ACTIVE_REGISTRATIONS: Gauge = Gauge::new(
        "lc_events_active_registrations",
        "Registrations currently held by the event dispatcher"
    ).expect("metric creation failed");

    /// Reconnect attempts made by the event client
    pub static ref RECONNECT_ATTEMPTS: Counter = Counter::new(
        "lc_events_reconnect_attempts_total",
        "Total reconnect attempts made after an unexpected disconnect"
    ).expect("metric creation failed");
}

/// Register all metrics with the global registry.
///
/// Safe to call more than once.
pub fn register_metrics() -> Result<(), TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        // Endorsement
        Box::new(PROPOSALS_SENT.clone()),
        Box::new(ENDORSEMENT_RESPONSES.clone()),
        Box::new(ENDORSEMENT_DURATION.clone()),
        // Ordering
        Box::new(BROADCAST_ATTEMPTS.clone()),
        Box::new(DELIVER_REQUESTS.clone()),
        // Events
        Box::new(EVENTS_DISPATCHED.clone()),
        Box::new(EVENTS_DROPPED.clone()),
        Box::new(ACTIVE_REGISTRATIONS.clone()),
        Box::new(RECONNECT_ATTEMPTS.clone()),
    ];

    for metric in metrics {
        match REGISTRY.register(metric) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(TelemetryError::MetricsInit(e.to_string())),
        }
    }

    Ok(())
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}

/// Timer guard for automatic histogram observation.
pub struct HistogramTimer {
    histogram: Histogram,
    start: std::time::Instant,
}

impl HistogramTimer {
    /// Start a new timer for the given histogram.
    pub fn new(histogram: &Histogram) -> Self {
        Self {
            histogram: histogram.clone(),
            start: std::time::Instant::now(),
        }
    }
}

impl Drop for HistogramTimer {
    fn drop(&mut self) {
        self.histogram.observe(self.start.elapsed().as_secs_f64());
    }
}
