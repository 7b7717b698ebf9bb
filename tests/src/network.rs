//! # In-Memory Ledger Network
//!
//! Endorsing peers, ordering nodes and an event service that share one
//! ledger, so the client can be driven end to end without a transport.
//!
//! ```text
//! LedgerPeer ←── proposals ── client ── envelopes ──→ LedgerOrderer
//!                                ↑                         │ commit
//!                                │                         ↓
//!                          EventHub ←── Block + FilteredBlock ── Ledger
//! ```

use async_trait::async_trait;
use lc_01_endorsement::ProposalProcessor;
use lc_03_ordering::{Orderer, OrdererError};
use lc_04_event_dispatch::domain::{
    ChannelRequest, ChannelRequestBody, ChannelResult, ChannelServiceResponse,
};
use lc_04_event_dispatch::{
    ChannelContext, Connection, ConnectionError, ConnectionProvider, DispatcherConfig,
    DispatcherError, EventClient, EventServiceApi, InboundMessage, InboundSink,
};
use lc_05_channel_client::{ChannelClient, ChannelClientConfig, ChannelClientError};
use parking_lot::Mutex;
use shared_types::codec;
use shared_types::{
    Block, BroadcastStatus, ChaincodeAction, ChaincodeEvent, CodecError, Ed25519Identity,
    FilteredBlock, FilteredTransaction, ProcessorError, ProposalResponse,
    ProposalResponsePayload, Response, SignedEnvelope, TransactionData, TransactionProposal,
    TxValidationCode, STATUS_OK,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

pub const CHANNEL_ID: &str = "mychannel";
pub const EVENT_ENDPOINT: &str = "peer0.org1:7053";

// =============================================================================
// LEDGER
// =============================================================================

/// Committed blocks plus the validation code the next commits receive.
pub struct Ledger {
    blocks: Mutex<Vec<Block>>,
    validation_code: Mutex<TxValidationCode>,
    hub: Arc<EventHub>,
}

impl Ledger {
    pub fn new(hub: Arc<EventHub>) -> Self {
        Self {
            blocks: Mutex::new(Vec::new()),
            validation_code: Mutex::new(TxValidationCode::Valid),
            hub,
        }
    }

    /// Validation code assigned to every transaction committed from now on.
    pub fn set_validation_code(&self, code: TxValidationCode) {
        *self.validation_code.lock() = code;
    }

    pub fn height(&self) -> u64 {
        self.blocks.lock().len() as u64
    }

    pub fn latest(&self) -> Option<Block> {
        self.blocks.lock().last().cloned()
    }

    /// Cut a block holding `envelope` and stream it to the event service.
    pub fn commit(&self, envelope: &SignedEnvelope) -> Result<Block, CodecError> {
        let header = envelope.channel_header()?;
        let events = chaincode_events(envelope)?;
        let code = *self.validation_code.lock();

        let block = {
            let mut blocks = self.blocks.lock();
            let previous_hash = blocks
                .last()
                .map(|b| b.header.data_hash.clone())
                .unwrap_or_default();
            let block = Block::new(
                blocks.len() as u64 + 1,
                previous_hash,
                vec![envelope.to_bytes()?],
            );
            blocks.push(block.clone());
            block
        };

        let filtered = FilteredBlock {
            channel_id: header.channel_id.clone(),
            number: block.number(),
            filtered_transactions: vec![FilteredTransaction {
                txid: header.tx_id,
                header_type: header.header_type,
                tx_validation_code: code,
                chaincode_events: events,
            }],
        };
        self.hub.publish(InboundMessage::Block(block.clone()));
        self.hub.publish(InboundMessage::FilteredBlock(filtered));
        Ok(block)
    }
}

/// Chaincode events recorded by the endorsers, with payloads removed as in
/// a filtered block.
fn chaincode_events(envelope: &SignedEnvelope) -> Result<Vec<ChaincodeEvent>, CodecError> {
    let payload = envelope.decode_payload()?;
    let data: TransactionData = codec::decode("TransactionData", &payload.data)?;

    let mut events = Vec::new();
    for action in data.actions {
        let response: ProposalResponsePayload = codec::decode(
            "ProposalResponsePayload",
            &action.payload.action.proposal_response_payload,
        )?;
        let chaincode: ChaincodeAction = codec::decode("ChaincodeAction", &response.extension)?;
        if let Some(event) = chaincode.events {
            events.push(ChaincodeEvent {
                payload: Vec::new(),
                ..event
            });
        }
    }
    Ok(events)
}

// =============================================================================
// EVENT SERVICE
// =============================================================================

/// Event service endpoint. Grants whatever event kinds a client asks for.
#[derive(Default)]
pub struct EventHub {
    sink: Mutex<Option<InboundSink>>,
    connects: AtomicUsize,
    refuse_next: AtomicUsize,
    requests: Arc<Mutex<Vec<ChannelRequestBody>>>,
}

impl EventHub {
    /// Stream a message to the connected client, if any.
    pub fn publish(&self, message: InboundMessage) -> bool {
        match self.sink.lock().as_ref() {
            Some(sink) => sink.deliver(message),
            None => false,
        }
    }

    /// Break the current stream as a transport failure would.
    pub fn drop_connection(&self) {
        if let Some(sink) = self.sink.lock().take() {
            sink.deliver(InboundMessage::Disconnected(ConnectionError::Closed));
        }
    }

    pub fn refuse_next_connects(&self, count: usize) {
        self.refuse_next.store(count, Ordering::SeqCst);
    }

    /// Connection attempts so far, refused ones included.
    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    /// Channel requests received so far.
    pub fn requests(&self) -> Vec<ChannelRequestBody> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl ConnectionProvider for EventHub {
    async fn connect(
        &self,
        context: &ChannelContext,
        sink: InboundSink,
    ) -> Result<Box<dyn Connection>, ConnectionError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        let refused = self
            .refuse_next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if refused {
            return Err(ConnectionError::Connect {
                endpoint: context.endpoint.clone(),
                reason: "connection refused".to_string(),
            });
        }

        *self.sink.lock() = Some(sink.clone());
        Ok(Box::new(HubStream {
            url: context.endpoint.clone(),
            sink,
            requests: Arc::clone(&self.requests),
        }))
    }
}

struct HubStream {
    url: String,
    sink: InboundSink,
    requests: Arc<Mutex<Vec<ChannelRequestBody>>>,
}

#[async_trait]
impl Connection for HubStream {
    fn url(&self) -> &str {
        &self.url
    }

    async fn send(&self, request: ChannelRequest) -> Result<(), ConnectionError> {
        let body = request
            .decode_body()
            .map_err(|e| ConnectionError::Send(e.to_string()))?;

        let response = ChannelServiceResponse {
            success: true,
            message: String::new(),
            channel_results: body
                .channel_ids
                .iter()
                .map(|channel_id| ChannelResult {
                    channel_id: channel_id.clone(),
                    success: true,
                    error: None,
                })
                .collect(),
            authorized_events: body.event_kinds.clone(),
        };
        self.requests.lock().push(body);

        if self
            .sink
            .deliver(InboundMessage::ChannelServiceResponse(response))
        {
            Ok(())
        } else {
            Err(ConnectionError::Closed)
        }
    }

    async fn close(&self) {}
}

// =============================================================================
// PEERS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeerBehaviour {
    /// Endorse, echoing the first argument as the response payload
    Endorse,
    Reject(i32),
    Unavailable,
    Delay(Duration),
}

/// Endorsing peer. Every endorsement emits a chaincode event named after
/// the invoked function.
pub struct LedgerPeer {
    url: String,
    identity: Ed25519Identity,
    behaviour: Mutex<PeerBehaviour>,
}

impl LedgerPeer {
    pub fn new(url: impl Into<String>, msp_id: &str) -> Self {
        Self {
            url: url.into(),
            identity: Ed25519Identity::generate(msp_id),
            behaviour: Mutex::new(PeerBehaviour::Endorse),
        }
    }

    pub fn set_behaviour(&self, behaviour: PeerBehaviour) {
        *self.behaviour.lock() = behaviour;
    }

    fn endorse(&self, proposal: &TransactionProposal) -> Result<ProposalResponse, ProcessorError> {
        let transport = |reason: String| ProcessorError::Transport {
            endpoint: self.url.clone(),
            reason,
        };
        let payload = proposal
            .proposal
            .decode_payload()
            .map_err(|e| transport(e.to_string()))?;

        let event = ChaincodeEvent {
            chaincode_id: payload.chaincode_id.clone(),
            tx_id: proposal.txn_id.id().to_string(),
            event_name: payload.function.clone(),
            payload: payload.args.first().cloned().unwrap_or_default(),
        };
        ProposalResponse::endorse(
            &proposal.proposal,
            Response {
                status: STATUS_OK,
                message: String::new(),
                payload: payload.args.first().cloned().unwrap_or_default(),
            },
            payload.function.into_bytes(),
            Some(event),
            &self.identity,
        )
        .map_err(|e| transport(e.to_string()))
    }
}

#[async_trait]
impl ProposalProcessor for LedgerPeer {
    fn endpoint(&self) -> &str {
        &self.url
    }

    async fn process_transaction_proposal(
        &self,
        proposal: &TransactionProposal,
    ) -> Result<ProposalResponse, ProcessorError> {
        let behaviour = self.behaviour.lock().clone();
        match behaviour {
            PeerBehaviour::Endorse => self.endorse(proposal),
            PeerBehaviour::Reject(status) => {
                Ok(ProposalResponse::rejected(status, "chaincode returned an error"))
            }
            PeerBehaviour::Unavailable => Err(ProcessorError::Transport {
                endpoint: self.url.clone(),
                reason: "connection refused".to_string(),
            }),
            PeerBehaviour::Delay(delay) => {
                tokio::time::sleep(delay).await;
                self.endorse(proposal)
            }
        }
    }
}

// =============================================================================
// ORDERERS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrdererBehaviour {
    Accept,
    Status(BroadcastStatus),
    Unreachable,
}

/// Ordering node that cuts one block per accepted envelope.
pub struct LedgerOrderer {
    url: String,
    ledger: Arc<Ledger>,
    behaviour: Mutex<OrdererBehaviour>,
    received: AtomicUsize,
}

impl LedgerOrderer {
    pub fn new(url: impl Into<String>, ledger: Arc<Ledger>) -> Self {
        Self {
            url: url.into(),
            ledger,
            behaviour: Mutex::new(OrdererBehaviour::Accept),
            received: AtomicUsize::new(0),
        }
    }

    pub fn set_behaviour(&self, behaviour: OrdererBehaviour) {
        *self.behaviour.lock() = behaviour;
    }

    /// Broadcasts that reached this orderer, failed ones included.
    pub fn received(&self) -> usize {
        self.received.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Orderer for LedgerOrderer {
    fn url(&self) -> &str {
        &self.url
    }

    async fn send_broadcast(
        &self,
        envelope: &SignedEnvelope,
    ) -> Result<BroadcastStatus, OrdererError> {
        self.received.fetch_add(1, Ordering::SeqCst);
        let behaviour = self.behaviour.lock().clone();
        match behaviour {
            OrdererBehaviour::Accept => {
                self.ledger
                    .commit(envelope)
                    .map_err(|e| OrdererError::Transport {
                        url: self.url.clone(),
                        reason: e.to_string(),
                    })?;
                Ok(BroadcastStatus::Success)
            }
            OrdererBehaviour::Status(status) => Ok(status),
            OrdererBehaviour::Unreachable => Err(OrdererError::Transport {
                url: self.url.clone(),
                reason: "connection refused".to_string(),
            }),
        }
    }

    /// Streams the newest block.
    async fn send_deliver(
        &self,
        _envelope: &SignedEnvelope,
    ) -> (mpsc::Receiver<Block>, mpsc::Receiver<OrdererError>) {
        let (block_tx, blocks) = mpsc::channel(1);
        let (error_tx, errors) = mpsc::channel(1);

        if *self.behaviour.lock() == OrdererBehaviour::Unreachable {
            let _ = error_tx.try_send(OrdererError::Transport {
                url: self.url.clone(),
                reason: "connection refused".to_string(),
            });
        } else if let Some(block) = self.ledger.latest() {
            let _ = block_tx.try_send(block);
        }
        (blocks, errors)
    }
}

// =============================================================================
// NETWORK
// =============================================================================

/// One channel with its peers, orderers, ledger and event service.
pub struct TestNetwork {
    pub identity: Arc<Ed25519Identity>,
    pub hub: Arc<EventHub>,
    pub ledger: Arc<Ledger>,
    pub peers: Vec<Arc<LedgerPeer>>,
    pub orderers: Vec<Arc<LedgerOrderer>>,
}

impl TestNetwork {
    pub fn new(peer_count: usize, orderer_count: usize) -> Self {
        let hub = Arc::new(EventHub::default());
        let ledger = Arc::new(Ledger::new(Arc::clone(&hub)));
        let peers = (0..peer_count)
            .map(|i| Arc::new(LedgerPeer::new(format!("peer{i}.org{}:7051", i + 1), "PeerMSP")))
            .collect();
        let orderers = (0..orderer_count)
            .map(|i| {
                Arc::new(LedgerOrderer::new(
                    format!("orderer{i}.example:7050"),
                    Arc::clone(&ledger),
                ))
            })
            .collect();

        Self {
            identity: Arc::new(Ed25519Identity::generate("Org1MSP")),
            hub,
            ledger,
            peers,
            orderers,
        }
    }

    pub fn context(&self) -> ChannelContext {
        ChannelContext {
            channel_id: CHANNEL_ID.to_string(),
            endpoint: EVENT_ENDPOINT.to_string(),
        }
    }

    pub fn proposal_processors(&self) -> Vec<Arc<dyn ProposalProcessor>> {
        self.peers
            .iter()
            .map(|p| Arc::clone(p) as Arc<dyn ProposalProcessor>)
            .collect()
    }

    pub fn orderer_clients(&self) -> Vec<Arc<dyn Orderer>> {
        self.orderers
            .iter()
            .map(|o| Arc::clone(o) as Arc<dyn Orderer>)
            .collect()
    }

    /// Event client for this channel. Must be called within a Tokio runtime.
    pub fn event_client(&self, config: DispatcherConfig) -> Result<EventClient, DispatcherError> {
        EventClient::new(
            self.context(),
            self.hub.clone(),
            self.identity.clone(),
            config,
        )
    }

    pub fn channel_client(
        &self,
        events: Arc<dyn EventServiceApi>,
        config: ChannelClientConfig,
    ) -> Result<ChannelClient, ChannelClientError> {
        ChannelClient::new(
            CHANNEL_ID,
            self.identity.clone(),
            self.proposal_processors(),
            self.orderer_clients(),
            events,
            config,
        )
    }
}
