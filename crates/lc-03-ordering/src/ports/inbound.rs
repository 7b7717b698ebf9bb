//! Inbound port (API) for the ordering client.

use crate::domain::OrderingError;
use crate::ports::outbound::Orderer;
use async_trait::async_trait;
use shared_types::{Block, SignedEnvelope, TransactionResponse};
use std::sync::Arc;

#[async_trait]
pub trait OrderingApi: Send + Sync {
    /// Send to one orderer at a time in random order until one accepts.
    async fn broadcast(
        &self,
        envelope: &SignedEnvelope,
        orderers: &[Arc<dyn Orderer>],
    ) -> Result<TransactionResponse, OrderingError>;

    /// Ask every orderer concurrently; the first block received wins.
    async fn deliver(
        &self,
        envelope: &SignedEnvelope,
        orderers: &[Arc<dyn Orderer>],
    ) -> Result<Block, OrderingError>;
}
