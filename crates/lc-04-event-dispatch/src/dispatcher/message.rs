//! Messages accepted by the dispatcher worker.

use crate::domain::{
    BlockEvent, BlockFilter, CCEvent, ConnectionEvent, DispatcherError, FilteredBlockEvent,
    Registration, TxStatusEvent,
};
use crate::ports::outbound::InboundMessage;
use tokio::sync::{mpsc, oneshot};

/// Response slot for a request.
pub(crate) type Responder<T> = oneshot::Sender<Result<T, DispatcherError>>;

/// Response slot for a registration request.
pub(crate) type RegistrationResponder<E> = Responder<(Registration, mpsc::Receiver<E>)>;

/// Every operation of the dispatcher, plus inbound traffic from the
/// connection. The worker handles them one at a time in arrival order.
pub(crate) enum DispatcherMessage {
    Connect {
        respond: Responder<()>,
    },
    Disconnect {
        respond: Responder<()>,
    },
    RegisterChannel {
        respond: Responder<()>,
    },
    DeregisterChannel {
        respond: Responder<()>,
    },
    RegisterBlock {
        filter: Option<BlockFilter>,
        respond: RegistrationResponder<BlockEvent>,
    },
    RegisterFilteredBlock {
        respond: RegistrationResponder<FilteredBlockEvent>,
    },
    RegisterChaincode {
        chaincode_id: String,
        event_filter: String,
        respond: RegistrationResponder<CCEvent>,
    },
    RegisterTxStatus {
        tx_id: String,
        respond: RegistrationResponder<TxStatusEvent>,
    },
    RegisterConnection {
        respond: RegistrationResponder<ConnectionEvent>,
    },
    Unregister {
        registration: Registration,
        respond: Responder<()>,
    },
    Inbound {
        generation: u64,
        message: InboundMessage,
    },
    Stop {
        respond: Responder<()>,
    },
}
