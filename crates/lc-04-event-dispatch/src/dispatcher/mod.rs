//! # Event Dispatcher
//!
//! A single worker task owns every registration and the connection. All
//! operations are messages on one queue; each caller waits on a oneshot
//! response slot bounded by the response timeout.
//!
//! ```text
//! caller ──DispatcherMessage + oneshot──→ ┌─────────────────┐
//! caller ──DispatcherMessage + oneshot──→ │ unbounded queue │──→ worker ──→ registrant queues
//! connection ──InboundSink::deliver────→ └─────────────────┘
//! ```
//!
//! After `stop` the worker exits and the queue closes; later requests fail
//! with [`DispatcherError::Stopped`].

pub(crate) mod message;
mod worker;

use crate::config::DispatcherConfig;
use crate::domain::{
    BlockEvent, BlockFilter, CCEvent, ChannelContext, ConnectionEvent, ConnectionState,
    DispatcherError, FilteredBlockEvent, Registration, TxStatusEvent,
};
use crate::ports::inbound::{EventServiceApi, Subscription};
use crate::ports::outbound::ConnectionProvider;
use async_trait::async_trait;
use message::{DispatcherMessage, Responder};
use shared_types::IdentityContext;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use worker::DispatcherWorker;

/// Cloneable handle to a running dispatcher.
#[derive(Clone)]
pub struct Dispatcher {
    sender: mpsc::UnboundedSender<DispatcherMessage>,
    state: watch::Receiver<ConnectionState>,
    block_height: Arc<AtomicU64>,
    config: DispatcherConfig,
}

impl Dispatcher {
    /// Spawn the worker. Must be called within a Tokio runtime.
    pub fn start(
        context: ChannelContext,
        provider: Arc<dyn ConnectionProvider>,
        identity: Arc<dyn IdentityContext>,
        config: DispatcherConfig,
    ) -> Result<Self, DispatcherError> {
        config.validate()?;

        let (sender, queue) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);
        let block_height = Arc::new(AtomicU64::new(0));

        let worker = DispatcherWorker::new(
            config.clone(),
            context,
            provider,
            identity,
            queue,
            sender.downgrade(),
            state_tx,
            Arc::clone(&block_height),
        );
        tokio::spawn(worker.run());

        Ok(Self {
            sender,
            state: state_rx,
            block_height,
            config,
        })
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    /// Current connection state as last published by the worker.
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Highest block number seen on any stream.
    pub fn block_height(&self) -> u64 {
        self.block_height.load(Ordering::SeqCst)
    }

    pub fn is_stopped(&self) -> bool {
        self.sender.is_closed()
    }

    async fn request<T>(
        &self,
        operation: &'static str,
        build: impl FnOnce(Responder<T>) -> DispatcherMessage,
    ) -> Result<T, DispatcherError> {
        let (respond, response) = oneshot::channel();
        self.sender
            .send(build(respond))
            .map_err(|_| DispatcherError::Stopped)?;

        match tokio::time::timeout(self.config.response_timeout, response).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(DispatcherError::Stopped),
            Err(_) => Err(DispatcherError::Timeout { operation }),
        }
    }

    pub async fn connect(&self) -> Result<(), DispatcherError> {
        self.request("connect", |respond| DispatcherMessage::Connect { respond })
            .await
    }

    /// Close the connection if open. Registrations stay in place.
    pub async fn disconnect(&self) -> Result<(), DispatcherError> {
        self.request("disconnect", |respond| DispatcherMessage::Disconnect {
            respond,
        })
        .await
    }

    /// Register for channel events; the service's reply sets the granted
    /// event kinds.
    pub async fn register_channel(&self) -> Result<(), DispatcherError> {
        self.request("channel registration", |respond| {
            DispatcherMessage::RegisterChannel { respond }
        })
        .await
    }

    pub async fn deregister_channel(&self) -> Result<(), DispatcherError> {
        self.request("channel deregistration", |respond| {
            DispatcherMessage::DeregisterChannel { respond }
        })
        .await
    }

    /// Close every registration queue and the connection, then the
    /// dispatcher queue itself. Stopping twice is a no-op.
    pub async fn stop(&self) -> Result<(), DispatcherError> {
        if self.is_stopped() {
            return Ok(());
        }
        match self
            .request("stop", |respond| DispatcherMessage::Stop { respond })
            .await
        {
            Err(DispatcherError::Stopped) => Ok(()),
            other => other,
        }
    }
}

#[async_trait]
impl EventServiceApi for Dispatcher {
    async fn register_block_event(&self, filter: Option<BlockFilter>) -> Subscription<BlockEvent> {
        self.request("block registration", |respond| {
            DispatcherMessage::RegisterBlock { filter, respond }
        })
        .await
    }

    async fn register_filtered_block_event(&self) -> Subscription<FilteredBlockEvent> {
        self.request("filtered block registration", |respond| {
            DispatcherMessage::RegisterFilteredBlock { respond }
        })
        .await
    }

    async fn register_chaincode_event(
        &self,
        chaincode_id: &str,
        event_filter: &str,
    ) -> Subscription<CCEvent> {
        let chaincode_id = chaincode_id.to_string();
        let event_filter = event_filter.to_string();
        self.request("chaincode registration", |respond| {
            DispatcherMessage::RegisterChaincode {
                chaincode_id,
                event_filter,
                respond,
            }
        })
        .await
    }

    async fn register_tx_status_event(&self, tx_id: &str) -> Subscription<TxStatusEvent> {
        let tx_id = tx_id.to_string();
        self.request("transaction status registration", |respond| {
            DispatcherMessage::RegisterTxStatus { tx_id, respond }
        })
        .await
    }

    async fn register_connection_event(&self) -> Subscription<ConnectionEvent> {
        self.request("connection registration", |respond| {
            DispatcherMessage::RegisterConnection { respond }
        })
        .await
    }

    async fn unregister(&self, registration: Registration) -> Result<(), DispatcherError> {
        self.request("unregister", |respond| DispatcherMessage::Unregister {
            registration,
            respond,
        })
        .await
    }
}
