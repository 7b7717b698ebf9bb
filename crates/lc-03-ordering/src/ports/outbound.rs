//! Outbound port: one ordering node.

use crate::domain::OrdererError;
use async_trait::async_trait;
use shared_types::{Block, BroadcastStatus, SignedEnvelope};
use tokio::sync::mpsc;

/// Client for a single ordering node.
#[async_trait]
pub trait Orderer: Send + Sync {
    /// Address used in logs and results.
    fn url(&self) -> &str;

    /// Submit an envelope and wait for its acknowledgement.
    async fn send_broadcast(
        &self,
        envelope: &SignedEnvelope,
    ) -> Result<BroadcastStatus, OrdererError>;

    /// Open a deliver stream for a seek request.
    ///
    /// Blocks and errors arrive on separate queues. Both closing without a
    /// message means the stream ended empty.
    async fn send_deliver(
        &self,
        envelope: &SignedEnvelope,
    ) -> (mpsc::Receiver<Block>, mpsc::Receiver<OrdererError>);
}
