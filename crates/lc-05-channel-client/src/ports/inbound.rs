//! Inbound port (API) for applications.

use crate::domain::{ChannelClientError, ExecuteResponse, Request};
use async_trait::async_trait;
use shared_types::Response;

#[async_trait]
pub trait ChannelApi: Send + Sync {
    /// Evaluate a chaincode function on the endorsing peers without
    /// submitting a transaction.
    async fn query(&self, request: Request) -> Result<Response, ChannelClientError>;

    /// Endorse, order and wait until the transaction is committed.
    async fn execute(&self, request: Request) -> Result<ExecuteResponse, ChannelClientError>;
}
