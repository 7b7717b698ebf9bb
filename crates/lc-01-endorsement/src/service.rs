//! # Proposal Broadcaster
//!
//! Fans one signed proposal out to every endorsing peer and joins on all of
//! them.
//!
//! ## Concurrency
//!
//! ```text
//!                  ┌──→ task(peer A) ──┐
//! send(proposal) ──┼──→ task(peer B) ──┼──→ Mutex<Vec<Response>> ──→ join ──→ Vec<Response>
//!                  └──→ task(peer C) ──┘
//! ```
//!
//! - One task per target; the shared vector's lock is held only for the push.
//! - A failure on one target never cancels or delays another.
//! - Latency equals the slowest target, not the sum.

use crate::config::EndorsementConfig;
use crate::domain::EndorsementError;
use crate::ports::inbound::EndorsementApi;
use crate::ports::outbound::ProposalProcessor;
use async_trait::async_trait;
use lc_telemetry::{HistogramTimer, ENDORSEMENT_DURATION, ENDORSEMENT_RESPONSES, PROPOSALS_SENT};
use parking_lot::Mutex;
use shared_types::{ProcessorError, TransactionProposal, TransactionProposalResponse};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Sends proposals to endorsing peers.
#[derive(Debug, Clone, Default)]
pub struct ProposalBroadcaster {
    config: EndorsementConfig,
}

impl ProposalBroadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: EndorsementConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EndorsementConfig {
        &self.config
    }

    /// Call a single peer, folding a timeout into its response slot.
    async fn process_one(
        target: Arc<dyn ProposalProcessor>,
        proposal: Arc<TransactionProposal>,
        config: EndorsementConfig,
    ) -> TransactionProposalResponse {
        let endpoint = target.endpoint().to_string();
        let call = target.process_transaction_proposal(&proposal);

        let outcome = match config.target_timeout {
            Some(limit) => match tokio::time::timeout(limit, call).await {
                Ok(result) => result,
                Err(_) => Err(ProcessorError::Timeout {
                    endpoint: endpoint.clone(),
                }),
            },
            None => call.await,
        };

        match &outcome {
            Ok(response) => {
                debug!(
                    endorser = %endpoint,
                    tx_id = %proposal.txn_id,
                    status = response.response.status,
                    "Endorser responded"
                );
                let label = if response.response.status == shared_types::STATUS_OK {
                    "success"
                } else {
                    "rejected"
                };
                ENDORSEMENT_RESPONSES.with_label_values(&[label]).inc();
            }
            Err(e) => {
                warn!(
                    endorser = %endpoint,
                    tx_id = %proposal.txn_id,
                    error = %e,
                    "Endorser call failed"
                );
                ENDORSEMENT_RESPONSES.with_label_values(&["error"]).inc();
            }
        }

        TransactionProposalResponse {
            endorser: endpoint,
            proposal,
            outcome,
        }
    }
}

#[async_trait]
impl EndorsementApi for ProposalBroadcaster {
    async fn send(
        &self,
        proposal: Arc<TransactionProposal>,
        targets: &[Arc<dyn ProposalProcessor>],
    ) -> Result<Vec<TransactionProposalResponse>, EndorsementError> {
        if proposal.signed_proposal.is_empty() {
            return Err(EndorsementError::MissingProposal);
        }
        if targets.is_empty() {
            return Err(EndorsementError::NoTargets);
        }

        PROPOSALS_SENT.inc();
        let _timer = HistogramTimer::new(&ENDORSEMENT_DURATION);

        info!(
            tx_id = %proposal.txn_id,
            targets = targets.len(),
            "Sending proposal to endorsers"
        );

        let responses = Arc::new(Mutex::new(Vec::with_capacity(targets.len())));
        let mut handles = Vec::with_capacity(targets.len());

        for target in targets {
            let endpoint = target.endpoint().to_string();
            let target = Arc::clone(target);
            let proposal = Arc::clone(&proposal);
            let responses = Arc::clone(&responses);
            let config = self.config.clone();

            let handle = tokio::spawn(async move {
                let response = Self::process_one(target, proposal, config).await;
                responses.lock().push(response);
            });
            handles.push((endpoint, handle));
        }

        for (endpoint, handle) in handles {
            // A panicking target still owns exactly one slot.
            if let Err(e) = handle.await {
                warn!(endorser = %endpoint, error = %e, "Endorsement task aborted");
                responses.lock().push(TransactionProposalResponse {
                    endorser: endpoint.clone(),
                    proposal: Arc::clone(&proposal),
                    outcome: Err(ProcessorError::TaskFailed {
                        endpoint,
                        reason: e.to_string(),
                    }),
                });
            }
        }

        let responses = std::mem::take(&mut *responses.lock());

        debug!(
            tx_id = %proposal.txn_id,
            responses = responses.len(),
            successful = responses.iter().filter(|r| r.is_success()).count(),
            "Endorsement fan-out complete"
        );

        Ok(responses)
    }
}
