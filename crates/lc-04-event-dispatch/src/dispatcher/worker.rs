//! # Dispatcher Worker
//!
//! Owns all dispatcher state. Nothing else touches registrations or the
//! connection, so no locks are needed here.
//!
//! ## Filtered Block Routing
//!
//! ```text
//! FilteredBlock ──→ for each transaction:
//!                     ├── tx_registrations[txid]        ──→ TxStatusEvent (then removed)
//!                     └── if valid, for each chaincode event:
//!                           cc_registrations matching (cc id, /filter/) ──→ CCEvent
//!               ──→ filtered_block_registration ──→ FilteredBlockEvent
//! ```

use crate::config::DispatcherConfig;
use crate::dispatcher::message::{DispatcherMessage, RegistrationResponder, Responder};
use crate::domain::registration::{
    BlockReg, ChaincodeReg, ConnectionReg, FilteredBlockReg, TxStatusReg,
};
use crate::domain::{
    accept_all, BlockEvent, BlockFilter, CCEvent, ChannelAction, ChannelContext, ChannelRequest,
    ChannelServiceResponse, ConnectionError, ConnectionEvent, ConnectionState, DispatcherError,
    EventKind, FilteredBlockEvent, Registration, RegistrationKind, TxStatusEvent,
};
use crate::ports::outbound::{Connection, ConnectionProvider, InboundMessage, InboundSink};
use lc_telemetry::{ACTIVE_REGISTRATIONS, EVENTS_DISPATCHED, EVENTS_DROPPED};
use regex::Regex;
use shared_types::{Block, FilteredBlock, IdentityContext};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

#[derive(Default)]
pub(crate) struct DispatcherState {
    pub tx_registrations: HashMap<String, TxStatusReg>,
    pub cc_registrations: HashMap<(String, String), ChaincodeReg>,
    pub block_registration: Option<BlockReg>,
    pub filtered_block_registration: Option<FilteredBlockReg>,
    pub connection_registration: Option<ConnectionReg>,
    pub connection: Option<Box<dyn Connection>>,
    /// `None` until the event service has answered a channel registration
    pub authorized: Option<HashSet<EventKind>>,
    pub pending_channel: Option<(ChannelAction, Responder<()>)>,
    /// Incremented per connection attempt; inbound traffic from older
    /// connections is discarded
    pub generation: u64,
}

impl DispatcherState {
    fn registration_count(&self) -> usize {
        self.tx_registrations.len()
            + self.cc_registrations.len()
            + usize::from(self.block_registration.is_some())
            + usize::from(self.filtered_block_registration.is_some())
            + usize::from(self.connection_registration.is_some())
    }
}

pub(crate) struct DispatcherWorker {
    state: DispatcherState,
    config: DispatcherConfig,
    context: ChannelContext,
    provider: Arc<dyn ConnectionProvider>,
    identity: Arc<dyn IdentityContext>,
    queue: mpsc::UnboundedReceiver<DispatcherMessage>,
    sender: mpsc::WeakUnboundedSender<DispatcherMessage>,
    connection_state: watch::Sender<ConnectionState>,
    block_height: Arc<AtomicU64>,
}

impl DispatcherWorker {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        config: DispatcherConfig,
        context: ChannelContext,
        provider: Arc<dyn ConnectionProvider>,
        identity: Arc<dyn IdentityContext>,
        queue: mpsc::UnboundedReceiver<DispatcherMessage>,
        sender: mpsc::WeakUnboundedSender<DispatcherMessage>,
        connection_state: watch::Sender<ConnectionState>,
        block_height: Arc<AtomicU64>,
    ) -> Self {
        Self {
            state: DispatcherState::default(),
            config,
            context,
            provider,
            identity,
            queue,
            sender,
            connection_state,
            block_height,
        }
    }

    /// Process messages until stopped or every [`Dispatcher`](super::Dispatcher)
    /// handle is gone. Open connections hold only weak senders.
    pub(crate) async fn run(mut self) {
        info!(channel = %self.context.channel_id, "Event dispatcher started");
        while let Some(message) = self.queue.recv().await {
            if !self.handle(message).await {
                break;
            }
        }
        if self.state.registration_count() > 0 || self.state.connection.is_some() {
            self.stop().await;
        }
        info!(channel = %self.context.channel_id, "Event dispatcher stopped");
    }

    /// Returns false once the worker must exit.
    async fn handle(&mut self, message: DispatcherMessage) -> bool {
        match message {
            DispatcherMessage::Connect { respond } => {
                let result = self.connect().await;
                let _ = respond.send(result);
            }
            DispatcherMessage::Disconnect { respond } => {
                self.disconnect(None).await;
                let _ = respond.send(Ok(()));
            }
            DispatcherMessage::RegisterChannel { respond } => {
                self.send_channel_request(ChannelAction::Register, respond)
                    .await;
            }
            DispatcherMessage::DeregisterChannel { respond } => {
                self.send_channel_request(ChannelAction::Deregister, respond)
                    .await;
            }
            DispatcherMessage::RegisterBlock { filter, respond } => {
                let result = self.register_block(filter);
                self.reply(respond, result);
            }
            DispatcherMessage::RegisterFilteredBlock { respond } => {
                let result = self.register_filtered_block();
                self.reply(respond, result);
            }
            DispatcherMessage::RegisterChaincode {
                chaincode_id,
                event_filter,
                respond,
            } => {
                let result = self.register_chaincode(chaincode_id, &event_filter);
                self.reply(respond, result);
            }
            DispatcherMessage::RegisterTxStatus { tx_id, respond } => {
                let result = self.register_tx_status(tx_id);
                self.reply(respond, result);
            }
            DispatcherMessage::RegisterConnection { respond } => {
                let result = self.register_connection();
                self.reply(respond, result);
            }
            DispatcherMessage::Unregister {
                registration,
                respond,
            } => {
                let _ = respond.send(self.unregister(&registration));
            }
            DispatcherMessage::Inbound {
                generation,
                message,
            } => {
                if generation == self.state.generation && self.state.connection.is_some() {
                    self.handle_inbound(message).await;
                } else {
                    debug!(generation, "Discarding message from a replaced connection");
                }
            }
            DispatcherMessage::Stop { respond } => {
                self.stop().await;
                let _ = respond.send(Ok(()));
                return false;
            }
        }
        true
    }

    /// Send a registration result; undo the registration if the caller
    /// stopped waiting.
    fn reply<E>(
        &mut self,
        respond: RegistrationResponder<E>,
        result: Result<(Registration, mpsc::Receiver<E>), DispatcherError>,
    ) {
        if let Err(Ok((registration, _))) = respond.send(result) {
            debug!(?registration, "Caller gone, removing registration");
            let _ = self.unregister(&registration);
        }
    }

    fn set_state(&self, state: ConnectionState) {
        self.connection_state.send_replace(state);
    }

    fn source_url(&self) -> String {
        self.state
            .connection
            .as_ref()
            .map(|c| c.url().to_string())
            .unwrap_or_else(|| self.context.endpoint.clone())
    }

    // =========================================================================
    // CONNECTION
    // =========================================================================

    async fn connect(&mut self) -> Result<(), DispatcherError> {
        if self.state.connection.is_some() {
            return Err(DispatcherError::AlreadyConnected);
        }
        if self.sender.upgrade().is_none() {
            return Err(DispatcherError::Stopped);
        }

        self.set_state(ConnectionState::Connecting);
        self.state.generation += 1;
        let sink = InboundSink::new(self.state.generation, self.sender.clone());

        match self.provider.connect(&self.context, sink).await {
            Ok(connection) => {
                info!(url = %connection.url(), "Connected to event service");
                self.state.connection = Some(connection);
                self.set_state(ConnectionState::Connected);
                self.notify_connection(ConnectionEvent::connected()).await;
                Ok(())
            }
            Err(e) => {
                warn!(
                    endpoint = %self.context.endpoint,
                    error = %e,
                    "Event service connect failed"
                );
                self.set_state(ConnectionState::Disconnected);
                Err(e.into())
            }
        }
    }

    /// Drop the connection. `error` is set when the transport failed.
    async fn disconnect(&mut self, error: Option<ConnectionError>) {
        let Some(connection) = self.state.connection.take() else {
            return;
        };
        connection.close().await;

        self.state.authorized = None;
        if let Some((_, respond)) = self.state.pending_channel.take() {
            let _ = respond.send(Err(DispatcherError::NotConnected));
        }
        self.set_state(ConnectionState::Disconnected);

        let error = error.map(|e| e.to_string());
        if error.is_some() && self.state.connection_registration.is_none() {
            warn!(error = ?error, "Event connection lost with no connection registration");
        }
        self.notify_connection(ConnectionEvent::disconnected(error))
            .await;
    }

    async fn notify_connection(&mut self, event: ConnectionEvent) {
        if let Some(reg) = &self.state.connection_registration {
            let sender = reg.sender.clone();
            self.deliver(&sender, event, RegistrationKind::Connection)
                .await;
        }
    }

    // =========================================================================
    // CHANNEL REGISTRATION
    // =========================================================================

    async fn send_channel_request(&mut self, action: ChannelAction, respond: Responder<()>) {
        let Some(connection) = self.state.connection.as_ref() else {
            let _ = respond.send(Err(DispatcherError::NotConnected));
            return;
        };
        // A caller that timed out has dropped its responder; its request no
        // longer blocks the channel.
        if let Some((stale, _)) = self
            .state
            .pending_channel
            .take_if(|(_, pending)| pending.is_closed())
        {
            debug!(action = ?stale, "Abandoned channel request discarded");
        }
        if self.state.pending_channel.is_some() {
            let _ = respond.send(Err(DispatcherError::ChannelRegistrationFailed(
                "another channel request is in progress".to_string(),
            )));
            return;
        }

        let event_kinds = match action {
            ChannelAction::Register => self.config.event_kinds.clone(),
            ChannelAction::Deregister => Vec::new(),
        };
        let request = match ChannelRequest::signed(
            action,
            vec![self.context.channel_id.clone()],
            event_kinds,
            self.identity.as_ref(),
        ) {
            Ok(request) => request,
            Err(e) => {
                let _ = respond.send(Err(e));
                return;
            }
        };

        debug!(channel = %self.context.channel_id, ?action, "Sending channel request");
        self.state.pending_channel = Some((action, respond));
        if let Err(e) = connection.send(request).await {
            warn!(error = %e, "Channel request send failed");
            if let Some((_, respond)) = self.state.pending_channel.take() {
                let _ = respond.send(Err(e.into()));
            }
        }
    }

    fn complete_channel_request(&mut self, response: ChannelServiceResponse) {
        let Some((action, respond)) = self.state.pending_channel.take() else {
            warn!("Unsolicited channel service response");
            return;
        };

        if !response.success {
            let reason = response.failure_reason();
            warn!(?action, reason = %reason, "Channel request rejected");
            let _ = respond.send(Err(DispatcherError::ChannelRegistrationFailed(reason)));
            return;
        }

        match action {
            ChannelAction::Register => {
                info!(
                    channel = %self.context.channel_id,
                    authorized = ?response.authorized_events,
                    "Registered for channel events"
                );
                self.state.authorized = Some(response.authorized_events.into_iter().collect());
            }
            ChannelAction::Deregister => {
                info!(channel = %self.context.channel_id, "Deregistered from channel events");
                self.state.authorized = None;
            }
        }
        let _ = respond.send(Ok(()));
    }

    // =========================================================================
    // REGISTRATIONS
    // =========================================================================

    fn check_authorized(&self, kind: RegistrationKind) -> Result<(), DispatcherError> {
        if let (Some(required), Some(granted)) =
            (kind.required_event_kind(), &self.state.authorized)
        {
            if !granted.contains(&required) {
                return Err(DispatcherError::NotAuthorized { kind: required });
            }
        }
        Ok(())
    }

    fn new_subscription<E>(
        &self,
        kind: RegistrationKind,
    ) -> (Registration, mpsc::Sender<E>, mpsc::Receiver<E>) {
        let (sender, receiver) = mpsc::channel(self.config.consumer_buffer_size);
        ACTIVE_REGISTRATIONS.inc();
        (Registration::new(kind), sender, receiver)
    }

    fn register_block(
        &mut self,
        filter: Option<BlockFilter>,
    ) -> Result<(Registration, mpsc::Receiver<BlockEvent>), DispatcherError> {
        self.check_authorized(RegistrationKind::Block)?;
        if self.state.block_registration.is_some() {
            return Err(DispatcherError::AlreadyRegistered("block events".to_string()));
        }

        let (registration, sender, receiver) = self.new_subscription(RegistrationKind::Block);
        self.state.block_registration = Some(BlockReg {
            id: registration.id(),
            filter: filter.unwrap_or_else(accept_all),
            sender,
        });
        debug!(?registration, "Block events registered");
        Ok((registration, receiver))
    }

    fn register_filtered_block(
        &mut self,
    ) -> Result<(Registration, mpsc::Receiver<FilteredBlockEvent>), DispatcherError> {
        self.check_authorized(RegistrationKind::FilteredBlock)?;
        if self.state.filtered_block_registration.is_some() {
            return Err(DispatcherError::AlreadyRegistered(
                "filtered block events".to_string(),
            ));
        }

        let (registration, sender, receiver) =
            self.new_subscription(RegistrationKind::FilteredBlock);
        self.state.filtered_block_registration = Some(FilteredBlockReg {
            id: registration.id(),
            sender,
        });
        debug!(?registration, "Filtered block events registered");
        Ok((registration, receiver))
    }

    fn register_chaincode(
        &mut self,
        chaincode_id: String,
        event_filter: &str,
    ) -> Result<(Registration, mpsc::Receiver<CCEvent>), DispatcherError> {
        if chaincode_id.is_empty() {
            return Err(DispatcherError::InvalidRegistration(
                "chaincode ID is required".to_string(),
            ));
        }
        if event_filter.is_empty() {
            return Err(DispatcherError::InvalidRegistration(
                "event filter is required".to_string(),
            ));
        }
        self.check_authorized(RegistrationKind::Chaincode)?;

        let key = (chaincode_id, event_filter.to_string());
        if self.state.cc_registrations.contains_key(&key) {
            return Err(DispatcherError::AlreadyRegistered(format!(
                "chaincode {} with filter {}",
                key.0, key.1
            )));
        }
        let regex = Regex::new(event_filter).map_err(|e| {
            DispatcherError::InvalidRegistration(format!("invalid event filter: {e}"))
        })?;

        let (registration, sender, receiver) = self.new_subscription(RegistrationKind::Chaincode);
        debug!(?registration, chaincode = %key.0, filter = %key.1, "Chaincode events registered");
        self.state.cc_registrations.insert(
            key.clone(),
            ChaincodeReg {
                id: registration.id(),
                chaincode_id: key.0,
                event_filter: regex,
                sender,
            },
        );
        Ok((registration, receiver))
    }

    fn register_tx_status(
        &mut self,
        tx_id: String,
    ) -> Result<(Registration, mpsc::Receiver<TxStatusEvent>), DispatcherError> {
        if tx_id.is_empty() {
            return Err(DispatcherError::InvalidRegistration(
                "transaction ID is required".to_string(),
            ));
        }
        self.check_authorized(RegistrationKind::TxStatus)?;
        if self.state.tx_registrations.contains_key(&tx_id) {
            return Err(DispatcherError::AlreadyRegistered(format!(
                "transaction {tx_id}"
            )));
        }

        let (registration, sender, receiver) = self.new_subscription(RegistrationKind::TxStatus);
        debug!(?registration, tx_id = %tx_id, "Transaction status registered");
        self.state.tx_registrations.insert(
            tx_id,
            TxStatusReg {
                id: registration.id(),
                sender,
            },
        );
        Ok((registration, receiver))
    }

    fn register_connection(
        &mut self,
    ) -> Result<(Registration, mpsc::Receiver<ConnectionEvent>), DispatcherError> {
        if self.state.connection_registration.is_some() {
            return Err(DispatcherError::AlreadyRegistered(
                "connection events".to_string(),
            ));
        }

        let (registration, sender, receiver) = self.new_subscription(RegistrationKind::Connection);
        self.state.connection_registration = Some(ConnectionReg {
            id: registration.id(),
            sender,
        });
        Ok((registration, receiver))
    }

    fn unregister(&mut self, registration: &Registration) -> Result<(), DispatcherError> {
        let id = registration.id();
        let removed = match registration.kind() {
            RegistrationKind::Block => take_if(&mut self.state.block_registration, |r| r.id == id),
            RegistrationKind::FilteredBlock => {
                take_if(&mut self.state.filtered_block_registration, |r| r.id == id)
            }
            RegistrationKind::Connection => {
                take_if(&mut self.state.connection_registration, |r| r.id == id)
            }
            RegistrationKind::Chaincode => {
                let before = self.state.cc_registrations.len();
                self.state.cc_registrations.retain(|_, r| r.id != id);
                before != self.state.cc_registrations.len()
            }
            RegistrationKind::TxStatus => {
                let before = self.state.tx_registrations.len();
                self.state.tx_registrations.retain(|_, r| r.id != id);
                before != self.state.tx_registrations.len()
            }
        };

        if removed {
            ACTIVE_REGISTRATIONS.dec();
            debug!(?registration, "Unregistered");
            Ok(())
        } else {
            Err(DispatcherError::RegistrationNotFound)
        }
    }

    // =========================================================================
    // INBOUND
    // =========================================================================

    async fn handle_inbound(&mut self, message: InboundMessage) {
        match message {
            InboundMessage::Block(block) => self.dispatch_block(block).await,
            InboundMessage::FilteredBlock(block) => self.dispatch_filtered_block(block).await,
            InboundMessage::ChannelServiceResponse(response) => {
                self.complete_channel_request(response)
            }
            InboundMessage::Disconnected(error) => {
                warn!(error = %error, "Event service connection dropped");
                self.disconnect(Some(error)).await;
            }
        }
    }

    fn record_height(&self, number: u64) {
        self.block_height.fetch_max(number, Ordering::SeqCst);
    }

    async fn dispatch_block(&mut self, block: Block) {
        self.record_height(block.number());
        let Some(reg) = &self.state.block_registration else {
            return;
        };
        if !(reg.filter)(&block) {
            debug!(block = block.number(), "Block rejected by filter");
            return;
        }

        let sender = reg.sender.clone();
        let event = BlockEvent {
            block,
            source_url: self.source_url(),
        };
        self.deliver(&sender, event, RegistrationKind::Block).await;
    }

    async fn dispatch_filtered_block(&mut self, block: FilteredBlock) {
        self.record_height(block.number);
        let source_url = self.source_url();

        for tx in &block.filtered_transactions {
            if let Some(reg) = self.state.tx_registrations.remove(&tx.txid) {
                ACTIVE_REGISTRATIONS.dec();
                let event = TxStatusEvent {
                    tx_id: tx.txid.clone(),
                    tx_validation_code: tx.tx_validation_code,
                    block_number: block.number,
                    source_url: source_url.clone(),
                };
                self.deliver(&reg.sender, event, RegistrationKind::TxStatus)
                    .await;
            }

            if !tx.tx_validation_code.is_valid() {
                continue;
            }
            for cc_event in &tx.chaincode_events {
                let targets: Vec<mpsc::Sender<CCEvent>> = self
                    .state
                    .cc_registrations
                    .values()
                    .filter(|r| {
                        r.chaincode_id == cc_event.chaincode_id
                            && r.event_filter.is_match(&cc_event.event_name)
                    })
                    .map(|r| r.sender.clone())
                    .collect();

                for sender in targets {
                    let event = CCEvent {
                        tx_id: tx.txid.clone(),
                        chaincode_id: cc_event.chaincode_id.clone(),
                        event_name: cc_event.event_name.clone(),
                        payload: cc_event.payload.clone(),
                        block_number: block.number,
                        source_url: source_url.clone(),
                    };
                    self.deliver(&sender, event, RegistrationKind::Chaincode)
                        .await;
                }
            }
        }

        if let Some(reg) = &self.state.filtered_block_registration {
            let sender = reg.sender.clone();
            let event = FilteredBlockEvent {
                filtered_block: block,
                source_url,
            };
            self.deliver(&sender, event, RegistrationKind::FilteredBlock)
                .await;
        }
    }

    /// Push one event to a registrant, honouring the consumer timeout.
    async fn deliver<E: Send>(
        &self,
        sender: &mpsc::Sender<E>,
        event: E,
        kind: RegistrationKind,
    ) -> bool {
        let outcome = send_with_timeout(sender, event, self.config.consumer_timeout).await;
        match outcome {
            Ok(()) => {
                EVENTS_DISPATCHED.with_label_values(&[kind.label()]).inc();
                true
            }
            Err(reason) => {
                EVENTS_DROPPED.with_label_values(&[kind.label()]).inc();
                warn!(registration = kind.label(), reason, "Event dropped");
                false
            }
        }
    }

    // =========================================================================
    // SHUTDOWN
    // =========================================================================

    /// Close every registration queue, then the connection.
    async fn stop(&mut self) {
        info!(channel = %self.context.channel_id, "Stopping event dispatcher");
        let count = self.state.registration_count();

        self.state.block_registration = None;
        self.state.filtered_block_registration = None;
        self.state.tx_registrations.clear();
        self.state.cc_registrations.clear();
        self.state.connection_registration = None;
        ACTIVE_REGISTRATIONS.sub(count as f64);

        if let Some((_, respond)) = self.state.pending_channel.take() {
            let _ = respond.send(Err(DispatcherError::Stopped));
        }
        if let Some(connection) = self.state.connection.take() {
            connection.close().await;
        }
        self.state.authorized = None;
        self.set_state(ConnectionState::Disconnected);
        self.queue.close();
    }
}

fn take_if<T>(slot: &mut Option<T>, matches: impl Fn(&T) -> bool) -> bool {
    if slot.as_ref().is_some_and(matches) {
        *slot = None;
        true
    } else {
        false
    }
}

async fn send_with_timeout<E>(
    sender: &mpsc::Sender<E>,
    event: E,
    timeout: Duration,
) -> Result<(), &'static str> {
    if timeout.is_zero() {
        return sender.try_send(event).map_err(|e| match e {
            TrySendError::Full(_) => "consumer queue full",
            TrySendError::Closed(_) => "consumer queue closed",
        });
    }
    match tokio::time::timeout(timeout, sender.send(event)).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(_)) => Err("consumer queue closed"),
        Err(_) => Err("consumer timeout"),
    }
}
