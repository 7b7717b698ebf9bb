//! Inbound port (API) for event registration.

use crate::domain::{
    BlockEvent, BlockFilter, CCEvent, ConnectionEvent, DispatcherError, FilteredBlockEvent,
    Registration, TxStatusEvent,
};
use async_trait::async_trait;
use tokio::sync::mpsc;

/// Result of a `register_*` call: the handle plus the event queue.
pub type Subscription<E> = Result<(Registration, mpsc::Receiver<E>), DispatcherError>;

/// Event registration API.
///
/// Every queue is closed by the dispatcher when the registration is
/// removed or the dispatcher stops.
#[async_trait]
pub trait EventServiceApi: Send + Sync {
    /// Full blocks, optionally filtered. At most one at a time.
    async fn register_block_event(&self, filter: Option<BlockFilter>) -> Subscription<BlockEvent>;

    /// Filtered blocks. At most one at a time.
    async fn register_filtered_block_event(&self) -> Subscription<FilteredBlockEvent>;

    /// Chaincode events of valid transactions whose name matches the
    /// `event_filter` regular expression.
    async fn register_chaincode_event(
        &self,
        chaincode_id: &str,
        event_filter: &str,
    ) -> Subscription<CCEvent>;

    /// The commit outcome of one transaction. The queue closes after the
    /// event is delivered.
    async fn register_tx_status_event(&self, tx_id: &str) -> Subscription<TxStatusEvent>;

    /// Connection state changes. At most one at a time.
    async fn register_connection_event(&self) -> Subscription<ConnectionEvent>;

    /// Remove a registration and close its queue.
    async fn unregister(&self, registration: Registration) -> Result<(), DispatcherError>;
}
