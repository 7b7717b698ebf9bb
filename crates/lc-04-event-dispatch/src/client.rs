//! # Event Client
//!
//! Owns the dispatcher and keeps it connected.
//!
//! ## Reconnect Loop
//!
//! ```text
//! connect() ──→ dispatcher.connect + register_channel ──→ spawn monitor (once)
//!
//! monitor: ConnectionEvent { connected: false, error: Some(_) }
//!     ├── reconnect disabled ──────────────────→ stop dispatcher
//!     └── attempt 1..=max (fixed delay) ──ok──→ keep monitoring
//!                                      └─exhausted──→ stop dispatcher
//! ```
//!
//! Stopping the dispatcher closes every registration queue, so consumers see
//! the end of their stream instead of waiting forever.

use crate::config::{DispatcherConfig, ReconnectConfig};
use crate::dispatcher::Dispatcher;
use crate::domain::{
    BlockEvent, BlockFilter, CCEvent, ChannelContext, ConnectionEvent, ConnectionState,
    DispatcherError, FilteredBlockEvent, Registration, TxStatusEvent,
};
use crate::ports::inbound::{EventServiceApi, Subscription};
use crate::ports::outbound::ConnectionProvider;
use async_trait::async_trait;
use lc_telemetry::RECONNECT_ATTEMPTS;
use parking_lot::Mutex;
use shared_types::IdentityContext;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Event service client with automatic reconnection.
pub struct EventClient {
    dispatcher: Dispatcher,
    reconnect: ReconnectConfig,
    notifier: Option<mpsc::Sender<ConnectionEvent>>,
    monitor: Mutex<Option<CancellationToken>>,
    reconnecting: Arc<AtomicBool>,
}

impl EventClient {
    /// Start the dispatcher. Must be called within a Tokio runtime.
    pub fn new(
        context: ChannelContext,
        provider: Arc<dyn ConnectionProvider>,
        identity: Arc<dyn IdentityContext>,
        config: DispatcherConfig,
    ) -> Result<Self, DispatcherError> {
        let reconnect = config.reconnect.clone();
        let dispatcher = Dispatcher::start(context, provider, identity, config)?;
        Ok(Self {
            dispatcher,
            reconnect,
            notifier: None,
            monitor: Mutex::new(None),
            reconnecting: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Forward every connection state change to `notifier`.
    pub fn with_connection_notifier(mut self, notifier: mpsc::Sender<ConnectionEvent>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn state(&self) -> ConnectionState {
        if self.reconnecting.load(Ordering::SeqCst) {
            ConnectionState::Reconnecting
        } else {
            self.dispatcher.state()
        }
    }

    /// Connect and register for channel events.
    ///
    /// The first successful call starts the connection monitor.
    pub async fn connect(&self) -> Result<(), DispatcherError> {
        let first = self.monitor.lock().is_none();
        let events = if first {
            Some(self.dispatcher.register_connection_event().await?)
        } else {
            None
        };

        if let Err(e) = establish(&self.dispatcher).await {
            if let Some((registration, _)) = events {
                let _ = self.dispatcher.unregister(registration).await;
            }
            return Err(e);
        }

        if let Some((registration, receiver)) = events {
            let token = CancellationToken::new();
            *self.monitor.lock() = Some(token.clone());

            let monitor = ConnectionMonitor {
                dispatcher: self.dispatcher.clone(),
                reconnect: self.reconnect.clone(),
                notifier: self.notifier.clone(),
                reconnecting: Arc::clone(&self.reconnecting),
                cancel: token,
            };
            debug!(?registration, "Starting connection monitor");
            tokio::spawn(monitor.run(receiver));
        }
        Ok(())
    }

    /// Deregister the channel (best effort), disconnect and stop the
    /// dispatcher.
    pub async fn close(&self) -> Result<(), DispatcherError> {
        if let Some(token) = self.monitor.lock().take() {
            token.cancel();
        }
        if self.dispatcher.is_stopped() {
            return Ok(());
        }

        if self.dispatcher.state() == ConnectionState::Connected {
            if let Err(e) = self.dispatcher.deregister_channel().await {
                debug!(error = %e, "Channel deregistration failed during close");
            }
        }
        if let Err(e) = self.dispatcher.disconnect().await {
            debug!(error = %e, "Disconnect failed during close");
        }
        info!("Closing event client");
        self.dispatcher.stop().await
    }
}

impl Drop for EventClient {
    /// The monitor holds a dispatcher handle; cancel it so the dispatcher
    /// can shut down once no other handle remains.
    fn drop(&mut self) {
        if let Some(token) = self.monitor.lock().take() {
            token.cancel();
        }
    }
}

#[async_trait]
impl EventServiceApi for EventClient {
    async fn register_block_event(&self, filter: Option<BlockFilter>) -> Subscription<BlockEvent> {
        self.dispatcher.register_block_event(filter).await
    }

    async fn register_filtered_block_event(&self) -> Subscription<FilteredBlockEvent> {
        self.dispatcher.register_filtered_block_event().await
    }

    async fn register_chaincode_event(
        &self,
        chaincode_id: &str,
        event_filter: &str,
    ) -> Subscription<CCEvent> {
        self.dispatcher
            .register_chaincode_event(chaincode_id, event_filter)
            .await
    }

    async fn register_tx_status_event(&self, tx_id: &str) -> Subscription<TxStatusEvent> {
        self.dispatcher.register_tx_status_event(tx_id).await
    }

    /// Unavailable once connected: the monitor holds the connection
    /// registration. Use [`EventClient::with_connection_notifier`] instead.
    async fn register_connection_event(&self) -> Subscription<ConnectionEvent> {
        self.dispatcher.register_connection_event().await
    }

    async fn unregister(&self, registration: Registration) -> Result<(), DispatcherError> {
        self.dispatcher.unregister(registration).await
    }
}

/// Connect and register for the channel, disconnecting again if the
/// registration fails.
async fn establish(dispatcher: &Dispatcher) -> Result<(), DispatcherError> {
    dispatcher.connect().await?;
    if let Err(e) = dispatcher.register_channel().await {
        warn!(error = %e, "Channel registration failed, disconnecting");
        let _ = dispatcher.disconnect().await;
        return Err(e);
    }
    Ok(())
}

struct ConnectionMonitor {
    dispatcher: Dispatcher,
    reconnect: ReconnectConfig,
    notifier: Option<mpsc::Sender<ConnectionEvent>>,
    reconnecting: Arc<AtomicBool>,
    cancel: CancellationToken,
}

impl ConnectionMonitor {
    async fn run(self, mut events: mpsc::Receiver<ConnectionEvent>) {
        loop {
            let event = tokio::select! {
                _ = self.cancel.cancelled() => break,
                event = events.recv() => match event {
                    Some(event) => event,
                    None => break,
                },
            };

            if let Some(notifier) = &self.notifier {
                if notifier.try_send(event.clone()).is_err() {
                    debug!("Connection notification dropped");
                }
            }

            // Only transport failures trigger a reconnect; explicit
            // disconnects carry no error.
            if event.connected || event.error.is_none() {
                continue;
            }
            warn!(error = ?event.error, "Event connection lost");

            if !self.reconnect.enabled {
                info!("Auto-reconnect disabled, stopping event dispatcher");
                self.shutdown().await;
                break;
            }

            self.reconnecting.store(true, Ordering::SeqCst);
            let result = self.reconnect_with_retry().await;
            self.reconnecting.store(false, Ordering::SeqCst);

            match result {
                Ok(()) => info!("Reconnected to event service"),
                Err(DispatcherError::Stopped) if self.cancel.is_cancelled() => break,
                Err(e) => {
                    error!(error = %e, "Giving up on event service");
                    self.shutdown().await;
                    break;
                }
            }
        }
        debug!("Connection monitor exited");
    }

    async fn reconnect_with_retry(&self) -> Result<(), DispatcherError> {
        let max_attempts = self.reconnect.max_attempts;
        let mut attempts = 0u32;

        loop {
            if max_attempts > 0 && attempts >= max_attempts {
                return Err(DispatcherError::ReconnectExhausted { attempts });
            }
            attempts += 1;

            tokio::select! {
                _ = self.cancel.cancelled() => return Err(DispatcherError::Stopped),
                _ = tokio::time::sleep(self.reconnect.delay()) => {}
            }

            RECONNECT_ATTEMPTS.inc();
            info!(attempt = attempts, "Reconnecting to event service");
            match establish(&self.dispatcher).await {
                Ok(()) => return Ok(()),
                Err(DispatcherError::Stopped) => return Err(DispatcherError::Stopped),
                Err(e) => warn!(attempt = attempts, error = %e, "Reconnect attempt failed"),
            }
        }
    }

    async fn shutdown(&self) {
        if let Err(e) = self.dispatcher.stop().await {
            warn!(error = %e, "Failed to stop event dispatcher");
        }
    }
}
