//! Outbound ports: the transport to the event service.
//!
//! A [`ConnectionProvider`] opens a [`Connection`] and hands everything the
//! service streams back to the dispatcher through an [`InboundSink`].

use crate::dispatcher::message::DispatcherMessage;
use crate::domain::{ChannelContext, ChannelRequest, ChannelServiceResponse, ConnectionError};
use async_trait::async_trait;
use shared_types::{Block, FilteredBlock};
use tokio::sync::mpsc;

/// Message streamed by the event service.
#[derive(Debug, Clone)]
pub enum InboundMessage {
    Block(Block),
    FilteredBlock(FilteredBlock),
    ChannelServiceResponse(ChannelServiceResponse),
    /// The transport failed; no further messages follow
    Disconnected(ConnectionError),
}

/// Posts inbound messages onto the dispatcher queue.
///
/// Each sink is bound to one connection; messages from a sink whose
/// connection has been replaced are discarded. A sink does not keep the
/// dispatcher alive: once every handle is dropped, delivery fails.
#[derive(Clone)]
pub struct InboundSink {
    generation: u64,
    sender: mpsc::WeakUnboundedSender<DispatcherMessage>,
}

impl InboundSink {
    pub(crate) fn new(
        generation: u64,
        sender: mpsc::WeakUnboundedSender<DispatcherMessage>,
    ) -> Self {
        Self { generation, sender }
    }

    /// Returns false once the dispatcher has stopped.
    pub fn deliver(&self, message: InboundMessage) -> bool {
        let Some(sender) = self.sender.upgrade() else {
            return false;
        };
        sender
            .send(DispatcherMessage::Inbound {
                generation: self.generation,
                message,
            })
            .is_ok()
    }
}

/// An open stream to the event service.
#[async_trait]
pub trait Connection: Send + Sync {
    /// Address reported as the source of events.
    fn url(&self) -> &str;

    async fn send(&self, request: ChannelRequest) -> Result<(), ConnectionError>;

    async fn close(&self);
}

/// Opens connections to the event service.
#[async_trait]
pub trait ConnectionProvider: Send + Sync {
    async fn connect(
        &self,
        context: &ChannelContext,
        sink: InboundSink,
    ) -> Result<Box<dyn Connection>, ConnectionError>;
}
