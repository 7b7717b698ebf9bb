//! # Channel Client Service
//!
//! ## Execute Flow
//!
//! ```text
//! Request ──→ TransactionProposal ──send──→ peers ──require_quorum──→ assemble
//!                                                                       │
//!   ExecuteResponse ←──commit event── register tx status ←── sign envelope
//!                           ↑                   │
//!                           └──── broadcast ←───┘
//! ```
//!
//! The tx status registration is made before the envelope is broadcast so
//! that a fast commit cannot be missed.

use crate::config::ChannelClientConfig;
use crate::domain::{ChannelClientError, ExecuteResponse, Request};
use crate::ports::inbound::ChannelApi;
use async_trait::async_trait;
use lc_01_endorsement::{
    partition_responses, require_quorum, EndorsementApi, EndorsementError, ProposalBroadcaster,
    ProposalProcessor,
};
use lc_02_tx_assembly::{TransactionAssembler, TransactionAssemblyApi};
use lc_03_ordering::{Orderer, OrdererBroadcaster, OrderingApi};
use lc_04_event_dispatch::{DispatcherError, EventServiceApi, Registration, TxStatusEvent};
use shared_types::{
    IdentityContext, Response, SignedEnvelope, TransactionProposal, TransactionProposalResponse,
};
use lc_telemetry::log_tx_event;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

const COMPONENT: &str = "channel-client";

/// Application entry point for one ledger channel.
pub struct ChannelClient {
    channel_id: String,
    identity: Arc<dyn IdentityContext>,
    peers: Vec<Arc<dyn ProposalProcessor>>,
    orderers: Vec<Arc<dyn Orderer>>,
    events: Arc<dyn EventServiceApi>,
    endorser: Arc<dyn EndorsementApi>,
    assembler: Arc<dyn TransactionAssemblyApi>,
    ordering: Arc<dyn OrderingApi>,
    config: ChannelClientConfig,
}

impl ChannelClient {
    /// Create a client using the default subsystem services.
    ///
    /// `events` must already be connected and registered for the channel
    /// for `execute` to observe commits.
    pub fn new(
        channel_id: impl Into<String>,
        identity: Arc<dyn IdentityContext>,
        peers: Vec<Arc<dyn ProposalProcessor>>,
        orderers: Vec<Arc<dyn Orderer>>,
        events: Arc<dyn EventServiceApi>,
        config: ChannelClientConfig,
    ) -> Result<Self, ChannelClientError> {
        config.validate()?;

        let endorser = ProposalBroadcaster::with_config(config.endorsement.clone());
        let ordering = OrdererBroadcaster::new(config.ordering.clone())?;

        Ok(Self {
            channel_id: channel_id.into(),
            identity,
            peers,
            orderers,
            events,
            endorser: Arc::new(endorser),
            assembler: Arc::new(TransactionAssembler::new()),
            ordering: Arc::new(ordering),
            config,
        })
    }

    /// Replace the endorsement service.
    pub fn with_endorser(mut self, endorser: Arc<dyn EndorsementApi>) -> Self {
        self.endorser = endorser;
        self
    }

    /// Replace the ordering service.
    pub fn with_ordering(mut self, ordering: Arc<dyn OrderingApi>) -> Self {
        self.ordering = ordering;
        self
    }

    pub fn channel_id(&self) -> &str {
        &self.channel_id
    }

    pub fn config(&self) -> &ChannelClientConfig {
        &self.config
    }

    fn create_proposal(
        &self,
        request: Request,
    ) -> Result<Arc<TransactionProposal>, ChannelClientError> {
        request.validate()?;
        let proposal = TransactionProposal::new(
            &self.channel_id,
            request.into_invocation(),
            self.identity.as_ref(),
        )?;
        Ok(Arc::new(proposal))
    }

    /// Send to every peer and keep the successful responses.
    async fn endorse(
        &self,
        proposal: Arc<TransactionProposal>,
    ) -> Result<Vec<TransactionProposalResponse>, ChannelClientError> {
        let tx_id = proposal.txn_id.id().to_string();
        let responses = self.endorser.send(proposal, &self.peers).await?;

        let (successful, failed) = partition_responses(responses);
        for response in &failed {
            match &response.outcome {
                Ok(r) => warn!(
                    tx_id = %tx_id,
                    endorser = %response.endorser,
                    status = r.response.status,
                    message = %r.response.message,
                    "Endorsement rejected"
                ),
                Err(e) => warn!(
                    tx_id = %tx_id,
                    endorser = %response.endorser,
                    error = %e,
                    "Endorsement failed"
                ),
            }
        }

        Ok(require_quorum(successful, self.config.min_endorsements)?)
    }

    fn first_response(
        &self,
        responses: &[TransactionProposalResponse],
    ) -> Result<Response, ChannelClientError> {
        responses
            .first()
            .and_then(|r| r.outcome.as_ref().ok())
            .map(|r| r.response.clone())
            .ok_or_else(|| {
                EndorsementError::InsufficientEndorsements {
                    got: 0,
                    required: self.config.min_endorsements,
                }
                .into()
            })
    }

    /// Broadcast and wait for the commit event of `tx_id`.
    async fn submit(
        &self,
        envelope: &SignedEnvelope,
        tx_id: &str,
        statuses: &mut mpsc::Receiver<TxStatusEvent>,
    ) -> Result<(String, TxStatusEvent), ChannelClientError> {
        let ack = self.ordering.broadcast(envelope, &self.orderers).await?;
        log_tx_event!(
            debug,
            COMPONENT,
            "Transaction accepted for ordering",
            tx_id,
            orderer = %ack.orderer
        );

        let timeout = self.config.commit_timeout;
        let event = match tokio::time::timeout(timeout, statuses.recv()).await {
            Ok(Some(event)) => event,
            Ok(None) => {
                return Err(ChannelClientError::CommitStreamClosed {
                    tx_id: tx_id.to_string(),
                })
            }
            Err(_) => {
                return Err(ChannelClientError::CommitTimeout {
                    tx_id: tx_id.to_string(),
                    timeout,
                })
            }
        };

        if !event.tx_validation_code.is_valid() {
            return Err(ChannelClientError::TxRejected {
                tx_id: tx_id.to_string(),
                code: event.tx_validation_code,
            });
        }
        Ok((ack.orderer, event))
    }

    async fn release(&self, registration: Registration) {
        match self.events.unregister(registration).await {
            // Delivered tx status registrations are already gone.
            Ok(()) | Err(DispatcherError::RegistrationNotFound) => {}
            Err(e) => debug!(error = %e, "Failed to release tx status registration"),
        }
    }
}

#[async_trait]
impl ChannelApi for ChannelClient {
    async fn query(&self, request: Request) -> Result<Response, ChannelClientError> {
        let proposal = self.create_proposal(request)?;
        debug!(tx_id = %proposal.txn_id, "Querying chaincode");

        let responses = self.endorse(proposal).await?;
        self.first_response(&responses)
    }

    async fn execute(&self, request: Request) -> Result<ExecuteResponse, ChannelClientError> {
        let proposal = self.create_proposal(request)?;
        let tx_id = proposal.txn_id.id().to_string();
        log_tx_event!(
            info,
            COMPONENT,
            "Executing transaction",
            tx_id,
            channel = %self.channel_id
        );

        let responses = self.endorse(proposal).await?;
        let payload = self.first_response(&responses)?.payload;

        let transaction = self.assembler.assemble(&responses)?;
        let envelope = self
            .assembler
            .create_signed_envelope(&transaction, self.identity.as_ref())?;

        let (registration, mut statuses) = self.events.register_tx_status_event(&tx_id).await?;
        let outcome = self.submit(&envelope, &tx_id, &mut statuses).await;
        self.release(registration).await;

        let (orderer, event) = outcome?;
        log_tx_event!(
            info,
            COMPONENT,
            "Transaction committed",
            tx_id,
            block = event.block_number
        );
        Ok(ExecuteResponse {
            tx_id,
            tx_validation_code: event.tx_validation_code,
            block_number: event.block_number,
            payload,
            orderer,
            responses,
        })
    }
}
