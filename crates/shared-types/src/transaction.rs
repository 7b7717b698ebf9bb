//! # Transaction Entities
//!
//! Proposals, endorsement responses and the assembled transaction.
//!
//! ## Lifecycle
//!
//! ```text
//! TransactionProposal ──endorse──→ TransactionProposalResponse (one per peer)
//!                                          │
//!                                          ↓ assemble
//!                                     Transaction ──sign──→ SignedEnvelope
//! ```
//!
//! Nested messages are carried as encoded bytes, exactly as they are signed,
//! so a signature always covers the bytes the receiver decodes.

use crate::codec;
use crate::errors::{CodecError, ProcessorError, ProposalError, SigningError};
use crate::identity::IdentityContext;
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Size of the random nonce mixed into every transaction ID.
pub const NONCE_SIZE: usize = 24;

/// Status code an endorser returns for a successful simulation.
pub const STATUS_OK: i32 = 200;

// =============================================================================
// TRANSACTION ID
// =============================================================================

/// Correlation key for a logical transaction.
///
/// `id = hex(sha256(nonce || creator))`. Created once per proposal and never
/// reused.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransactionId {
    id: String,
    nonce: Vec<u8>,
}

impl TransactionId {
    /// Generate a new ID for the signer behind `ctx`.
    pub fn generate(ctx: &dyn IdentityContext) -> Result<Self, SigningError> {
        let mut nonce = vec![0u8; NONCE_SIZE];
        OsRng
            .try_fill_bytes(&mut nonce)
            .map_err(|e| SigningError::Nonce(e.to_string()))?;
        let creator = ctx.identity()?;
        Ok(Self::from_parts(nonce, &creator))
    }

    /// Derive the ID from an explicit nonce and creator.
    pub fn from_parts(nonce: Vec<u8>, creator: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(&nonce);
        hasher.update(creator);
        let id = hex::encode(hasher.finalize());
        Self { id, nonce }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn nonce(&self) -> &[u8] {
        &self.nonce
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}

// =============================================================================
// HEADERS
// =============================================================================

/// Kind of payload an envelope carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HeaderType {
    Message,
    Config,
    ConfigUpdate,
    EndorserTransaction,
    OrdererTransaction,
    DeliverSeekInfo,
    ChaincodePackage,
}

impl HeaderType {
    /// Numeric wire code.
    pub fn code(self) -> i32 {
        match self {
            HeaderType::Message => 0,
            HeaderType::Config => 1,
            HeaderType::ConfigUpdate => 2,
            HeaderType::EndorserTransaction => 3,
            HeaderType::OrdererTransaction => 4,
            HeaderType::DeliverSeekInfo => 5,
            HeaderType::ChaincodePackage => 6,
        }
    }
}

/// Channel-scoped part of a message header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelHeader {
    pub header_type: HeaderType,
    pub version: i32,
    /// Milliseconds since the Unix epoch.
    pub timestamp: u64,
    pub channel_id: String,
    pub tx_id: String,
    pub epoch: u64,
    /// Chaincode targeted by an endorser transaction.
    pub chaincode_id: Option<String>,
}

/// Creator part of a message header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureHeader {
    pub creator: Vec<u8>,
    pub nonce: Vec<u8>,
}

/// Header with both halves kept in their signed, encoded form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    pub channel_header: Vec<u8>,
    pub signature_header: Vec<u8>,
}

impl Header {
    pub fn decode_channel_header(&self) -> Result<ChannelHeader, CodecError> {
        codec::decode("ChannelHeader", &self.channel_header)
    }

    pub fn decode_signature_header(&self) -> Result<SignatureHeader, CodecError> {
        codec::decode("SignatureHeader", &self.signature_header)
    }
}

// =============================================================================
// PROPOSAL
// =============================================================================

/// Chaincode function call requested by the application.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChaincodeInvocation {
    pub chaincode_id: String,
    pub function: String,
    pub args: Vec<Vec<u8>>,
    /// Private data sent to endorsers but never written to the ledger.
    pub transient_map: BTreeMap<String, Vec<u8>>,
}

/// Proposal payload. The transient map is stripped before the payload is
/// embedded in a committed transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChaincodeProposalPayload {
    pub chaincode_id: String,
    pub function: String,
    pub args: Vec<Vec<u8>>,
    pub transient_map: BTreeMap<String, Vec<u8>>,
}

impl ChaincodeProposalPayload {
    /// Copy of this payload without private data.
    pub fn without_transient(&self) -> Self {
        Self {
            transient_map: BTreeMap::new(),
            ..self.clone()
        }
    }
}

/// Unsigned proposal: encoded header plus encoded payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    pub header: Vec<u8>,
    pub payload: Vec<u8>,
}

impl Proposal {
    pub fn decode_header(&self) -> Result<Header, CodecError> {
        codec::decode("Header", &self.header)
    }

    pub fn decode_payload(&self) -> Result<ChaincodeProposalPayload, CodecError> {
        codec::decode("ChaincodeProposalPayload", &self.payload)
    }

    /// Hash binding a proposal response to this proposal.
    pub fn hash(&self) -> Vec<u8> {
        let mut hasher = Sha256::new();
        hasher.update(&self.header);
        hasher.update(&self.payload);
        hasher.finalize().to_vec()
    }
}

/// Proposal bytes plus the creator's signature over them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedProposal {
    pub proposal_bytes: Vec<u8>,
    pub signature: Vec<u8>,
}

impl SignedProposal {
    pub fn is_empty(&self) -> bool {
        self.proposal_bytes.is_empty() || self.signature.is_empty()
    }
}

/// A signed proposal ready to be sent to endorsers. Read-only once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionProposal {
    pub txn_id: TransactionId,
    pub channel_id: String,
    pub proposal: Proposal,
    pub signed_proposal: SignedProposal,
}

impl TransactionProposal {
    /// Build and sign a proposal invoking `invocation` on `channel_id`.
    pub fn new(
        channel_id: &str,
        invocation: ChaincodeInvocation,
        ctx: &dyn IdentityContext,
    ) -> Result<Self, ProposalError> {
        if channel_id.is_empty() {
            return Err(ProposalError::EmptyChannel);
        }
        if invocation.chaincode_id.is_empty() {
            return Err(ProposalError::EmptyChaincode);
        }

        let txn_id = TransactionId::generate(ctx)?;
        let creator = ctx.identity()?;

        let channel_header = ChannelHeader {
            header_type: HeaderType::EndorserTransaction,
            version: 0,
            timestamp: now_ms(),
            channel_id: channel_id.to_string(),
            tx_id: txn_id.id().to_string(),
            epoch: 0,
            chaincode_id: Some(invocation.chaincode_id.clone()),
        };
        let signature_header = SignatureHeader {
            creator,
            nonce: txn_id.nonce().to_vec(),
        };
        let header = Header {
            channel_header: codec::encode("ChannelHeader", &channel_header)?,
            signature_header: codec::encode("SignatureHeader", &signature_header)?,
        };
        let payload = ChaincodeProposalPayload {
            chaincode_id: invocation.chaincode_id,
            function: invocation.function,
            args: invocation.args,
            transient_map: invocation.transient_map,
        };
        let proposal = Proposal {
            header: codec::encode("Header", &header)?,
            payload: codec::encode("ChaincodeProposalPayload", &payload)?,
        };

        let proposal_bytes = codec::encode("Proposal", &proposal)?;
        let signature = ctx.sign(&proposal_bytes)?;

        Ok(Self {
            txn_id,
            channel_id: channel_id.to_string(),
            proposal,
            signed_proposal: SignedProposal {
                proposal_bytes,
                signature,
            },
        })
    }
}

// =============================================================================
// ENDORSEMENT RESPONSES
// =============================================================================

/// Chaincode-level response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub status: i32,
    pub message: String,
    pub payload: Vec<u8>,
}

/// Event emitted by chaincode during simulation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChaincodeEvent {
    pub chaincode_id: String,
    pub tx_id: String,
    pub event_name: String,
    pub payload: Vec<u8>,
}

/// Simulation result carried in a proposal response payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChaincodeAction {
    /// Encoded read/write set.
    pub results: Vec<u8>,
    pub events: Option<ChaincodeEvent>,
    pub response: Response,
}

/// What the endorser signs: the proposal hash plus the simulation result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalResponsePayload {
    pub proposal_hash: Vec<u8>,
    /// Encoded [`ChaincodeAction`].
    pub extension: Vec<u8>,
}

/// An endorser's signature over `proposal_response_payload || endorser`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endorsement {
    pub endorser: Vec<u8>,
    pub signature: Vec<u8>,
}

/// Response returned by an endorsing peer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalResponse {
    pub version: i32,
    pub response: Response,
    /// Encoded [`ProposalResponsePayload`].
    pub payload: Vec<u8>,
    pub endorsement: Option<Endorsement>,
}

impl ProposalResponse {
    /// Build an endorsed response the way a peer does after simulating
    /// `proposal`.
    pub fn endorse(
        proposal: &Proposal,
        response: Response,
        results: Vec<u8>,
        events: Option<ChaincodeEvent>,
        endorser: &dyn IdentityContext,
    ) -> Result<Self, SigningError> {
        let action = ChaincodeAction {
            results,
            events,
            response: response.clone(),
        };
        let payload = codec::encode(
            "ProposalResponsePayload",
            &ProposalResponsePayload {
                proposal_hash: proposal.hash(),
                extension: codec::encode("ChaincodeAction", &action)?,
            },
        )?;

        let endorser_identity = endorser.identity()?;
        let mut signed = payload.clone();
        signed.extend_from_slice(&endorser_identity);
        let signature = endorser.sign(&signed)?;

        Ok(Self {
            version: 1,
            response,
            payload,
            endorsement: Some(Endorsement {
                endorser: endorser_identity,
                signature,
            }),
        })
    }

    /// Rejection without an endorsement.
    pub fn rejected(status: i32, message: impl Into<String>) -> Self {
        Self {
            version: 1,
            response: Response {
                status,
                message: message.into(),
                payload: Vec::new(),
            },
            payload: Vec::new(),
            endorsement: None,
        }
    }

    pub fn decode_payload(&self) -> Result<ProposalResponsePayload, CodecError> {
        codec::decode("ProposalResponsePayload", &self.payload)
    }
}

/// One endorsement outcome per target peer.
#[derive(Debug, Clone)]
pub struct TransactionProposalResponse {
    /// Endpoint of the peer that produced this response.
    pub endorser: String,
    /// Proposal this response answers.
    pub proposal: Arc<TransactionProposal>,
    /// `Err` when the network call itself failed.
    pub outcome: Result<ProposalResponse, ProcessorError>,
}

impl TransactionProposalResponse {
    /// Ledger-level status, if the peer answered.
    pub fn status(&self) -> Option<i32> {
        self.outcome.as_ref().ok().map(|r| r.response.status)
    }

    /// True when the peer answered with status 200.
    pub fn is_success(&self) -> bool {
        self.status() == Some(STATUS_OK)
    }

    pub fn error(&self) -> Option<&ProcessorError> {
        self.outcome.as_ref().err()
    }
}

// =============================================================================
// ASSEMBLED TRANSACTION
// =============================================================================

/// Proposal payload plus the endorsements collected for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChaincodeEndorsedAction {
    pub proposal_response_payload: Vec<u8>,
    pub endorsements: Vec<Endorsement>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChaincodeActionPayload {
    /// Encoded [`ChaincodeProposalPayload`] without transient data.
    pub chaincode_proposal_payload: Vec<u8>,
    pub action: ChaincodeEndorsedAction,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionAction {
    /// Encoded [`SignatureHeader`] of the proposal creator.
    pub header: Vec<u8>,
    pub payload: ChaincodeActionPayload,
}

/// Envelope data of an endorser transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionData {
    pub actions: Vec<TransactionAction>,
}

/// A transaction assembled from successful endorsements.
#[derive(Debug, Clone)]
pub struct Transaction {
    pub proposal: Arc<TransactionProposal>,
    pub action: TransactionAction,
}

impl Transaction {
    pub fn txn_id(&self) -> &TransactionId {
        &self.proposal.txn_id
    }
}

/// Current wall-clock time in milliseconds.
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
