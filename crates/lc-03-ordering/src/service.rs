//! # Orderer Broadcaster
//!
//! ## Broadcast (sequential failover)
//!
//! ```text
//! shuffle(orderers) ──→ try o₁ ──fail──→ try o₂ ──fail──→ ... ──→ AllFailed { last }
//!                          │                │
//!                          └──ok──→ return  └──ok──→ return
//! ```
//!
//! The permutation comes from a seedable RNG so selection is reproducible in
//! tests and uniform in production.
//!
//! ## Deliver (concurrent, first wins)
//!
//! ```text
//!              ┌──→ task(o₁) ──block──┐
//! deliver ─────┼──→ task(o₂) ──error──┼──→ Mutex<Option<oneshot::Sender>> ──→ caller
//!              └──→ task(o₃) ──block──┘        (taken exactly once)
//! ```
//!
//! The winner takes the sender out of the slot. When every task has ended
//! without taking it, the sender is dropped and the caller observes
//! `AllFailed` with the last recorded error.

use crate::config::{LoserPolicy, OrderingConfig};
use crate::domain::{OrdererError, OrderingError};
use crate::ports::inbound::OrderingApi;
use crate::ports::outbound::Orderer;
use async_trait::async_trait;
use lc_telemetry::{BROADCAST_ATTEMPTS, DELIVER_REQUESTS};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use shared_types::{Block, SignedEnvelope, TransactionResponse};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Client-side access to the ordering service.
///
/// Shareable through `Arc`; the RNG is the only mutable state.
#[derive(Debug)]
pub struct OrdererBroadcaster {
    config: OrderingConfig,
    rng: Mutex<StdRng>,
}

impl OrdererBroadcaster {
    pub fn new(config: OrderingConfig) -> Result<Self, OrderingError> {
        config.validate()?;
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Ok(Self {
            config,
            rng: Mutex::new(rng),
        })
    }

    pub fn config(&self) -> &OrderingConfig {
        &self.config
    }

    /// Random permutation of `0..n`.
    fn selection_order(&self, n: usize) -> Vec<usize> {
        let mut order: Vec<usize> = (0..n).collect();
        order.shuffle(&mut *self.rng.lock());
        order
    }

    /// Wait for the first block or error on one orderer's deliver stream.
    async fn await_block(
        orderer: Arc<dyn Orderer>,
        envelope: Arc<SignedEnvelope>,
        timeout: Duration,
    ) -> Result<Block, OrdererError> {
        let url = orderer.url().to_string();
        let wait = async {
            let (mut blocks, mut errors) = orderer.send_deliver(&envelope).await;
            tokio::select! {
                Some(block) = blocks.recv() => Ok(block),
                Some(err) = errors.recv() => Err(err),
                else => Err(OrdererError::StreamClosed { url: url.clone() }),
            }
        };

        let outcome = tokio::time::timeout(timeout, wait).await;
        outcome.unwrap_or_else(|_| Err(OrdererError::Timeout { url }))
    }
}

#[async_trait]
impl OrderingApi for OrdererBroadcaster {
    async fn broadcast(
        &self,
        envelope: &SignedEnvelope,
        orderers: &[Arc<dyn Orderer>],
    ) -> Result<TransactionResponse, OrderingError> {
        if orderers.is_empty() {
            return Err(OrderingError::NoOrderers);
        }

        let mut last = None;
        for idx in self.selection_order(orderers.len()) {
            let orderer = &orderers[idx];
            let url = orderer.url();

            let failure = match orderer.send_broadcast(envelope).await {
                Ok(status) if status.is_success() => {
                    BROADCAST_ATTEMPTS.with_label_values(&["success"]).inc();
                    info!(orderer = %url, "Envelope accepted by orderer");
                    return Ok(TransactionResponse {
                        orderer: url.to_string(),
                        status,
                    });
                }
                Ok(status) => OrdererError::Status {
                    url: url.to_string(),
                    status,
                },
                Err(e) => e,
            };

            BROADCAST_ATTEMPTS.with_label_values(&["failure"]).inc();
            warn!(orderer = %url, error = %failure, "Broadcast failed, trying next orderer");
            last = Some(failure);
        }

        match last {
            Some(last) => Err(OrderingError::AllFailed { last }),
            None => Err(OrderingError::NoOrderers),
        }
    }

    async fn deliver(
        &self,
        envelope: &SignedEnvelope,
        orderers: &[Arc<dyn Orderer>],
    ) -> Result<Block, OrderingError> {
        if orderers.is_empty() {
            return Err(OrderingError::NoOrderers);
        }

        let envelope = Arc::new(envelope.clone());
        let (winner_tx, winner_rx) = oneshot::channel::<Block>();
        let winner = Arc::new(Mutex::new(Some(winner_tx)));
        let last_error: Arc<Mutex<Option<OrdererError>>> = Arc::new(Mutex::new(None));
        let token = CancellationToken::new();
        let timeout = self.config.deliver_timeout;

        for orderer in orderers {
            let orderer = Arc::clone(orderer);
            let envelope = Arc::clone(&envelope);
            let winner = Arc::clone(&winner);
            let last_error = Arc::clone(&last_error);
            let token = token.clone();

            tokio::spawn(async move {
                let url = orderer.url().to_string();
                let result = tokio::select! {
                    _ = token.cancelled() => {
                        debug!(orderer = %url, "Deliver request cancelled");
                        return;
                    }
                    result = Self::await_block(orderer, envelope, timeout) => result,
                };

                match result {
                    Ok(block) => {
                        let slot = winner.lock().take();
                        match slot {
                            Some(sender) => {
                                debug!(orderer = %url, block = block.number(), "Deliver won");
                                let _ = sender.send(block);
                            }
                            None => debug!(
                                orderer = %url,
                                "Deliver result discarded, winner already recorded"
                            ),
                        }
                    }
                    Err(e) => {
                        warn!(orderer = %url, error = %e, "Deliver failed");
                        *last_error.lock() = Some(e);
                    }
                }
            });
        }
        // Only the tasks hold the slot now; it drops once all of them end.
        drop(winner);

        let _cancel_losers = (self.config.loser_policy == LoserPolicy::Cancel)
            .then(|| token.clone().drop_guard());

        match winner_rx.await {
            Ok(block) => {
                DELIVER_REQUESTS.with_label_values(&["success"]).inc();
                Ok(block)
            }
            Err(_) => {
                DELIVER_REQUESTS.with_label_values(&["failure"]).inc();
                let last = last_error.lock().take().unwrap_or_else(|| OrdererError::Transport {
                    url: orderers[orderers.len() - 1].url().to_string(),
                    reason: "deliver task ended without a result".to_string(),
                });
                Err(OrderingError::AllFailed { last })
            }
        }
    }
}
