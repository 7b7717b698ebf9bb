//! # Blocks
//!
//! Full blocks as cut by the ordering service and the reduced filtered form
//! streamed to event clients.

use crate::codec;
use crate::envelope::SignedEnvelope;
use crate::errors::CodecError;
use crate::transaction::{ChaincodeEvent, HeaderType};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Block header linking a block to its predecessor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    pub number: u64,
    pub previous_hash: Vec<u8>,
    pub data_hash: Vec<u8>,
}

/// Full block. Each data entry is an encoded [`SignedEnvelope`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub header: BlockHeader,
    pub data: Vec<Vec<u8>>,
    pub metadata: Vec<Vec<u8>>,
}

impl Block {
    /// Build a block over already-encoded envelopes.
    pub fn new(number: u64, previous_hash: Vec<u8>, data: Vec<Vec<u8>>) -> Self {
        let mut hasher = Sha256::new();
        for entry in &data {
            hasher.update(entry);
        }
        Self {
            header: BlockHeader {
                number,
                previous_hash,
                data_hash: hasher.finalize().to_vec(),
            },
            data,
            metadata: Vec::new(),
        }
    }

    pub fn number(&self) -> u64 {
        self.header.number
    }

    /// Header type of the first envelope, which classifies the block.
    pub fn header_type(&self) -> Result<Option<HeaderType>, CodecError> {
        let Some(first) = self.data.first() else {
            return Ok(None);
        };
        let envelope: SignedEnvelope = codec::decode("SignedEnvelope", first)?;
        Ok(Some(envelope.channel_header()?.header_type))
    }
}

/// Validation outcome the committing peer assigned to a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TxValidationCode {
    Valid,
    NilEnvelope,
    BadPayload,
    BadCommonHeader,
    BadCreatorSignature,
    InvalidEndorserTransaction,
    InvalidConfigTransaction,
    UnsupportedTxPayload,
    BadProposalTxId,
    DuplicateTxId,
    EndorsementPolicyFailure,
    MvccReadConflict,
    PhantomReadConflict,
    UnknownTxType,
    TargetChainNotFound,
    MarshalTxError,
    NilTxAction,
    ExpiredChaincode,
    ChaincodeVersionConflict,
    BadHeaderExtension,
    BadChannelHeader,
    BadResponsePayload,
    BadRwset,
    IllegalWriteset,
    InvalidWriteset,
    NotValidated,
    InvalidOtherReason,
}

impl TxValidationCode {
    /// Numeric wire code.
    pub fn code(self) -> i32 {
        use TxValidationCode::*;
        match self {
            Valid => 0,
            NilEnvelope => 1,
            BadPayload => 2,
            BadCommonHeader => 3,
            BadCreatorSignature => 4,
            InvalidEndorserTransaction => 5,
            InvalidConfigTransaction => 6,
            UnsupportedTxPayload => 7,
            BadProposalTxId => 8,
            DuplicateTxId => 9,
            EndorsementPolicyFailure => 10,
            MvccReadConflict => 11,
            PhantomReadConflict => 12,
            UnknownTxType => 13,
            TargetChainNotFound => 14,
            MarshalTxError => 15,
            NilTxAction => 16,
            ExpiredChaincode => 17,
            ChaincodeVersionConflict => 18,
            BadHeaderExtension => 19,
            BadChannelHeader => 20,
            BadResponsePayload => 21,
            BadRwset => 22,
            IllegalWriteset => 23,
            InvalidWriteset => 24,
            NotValidated => 254,
            InvalidOtherReason => 255,
        }
    }

    pub fn is_valid(self) -> bool {
        self == TxValidationCode::Valid
    }
}

impl fmt::Display for TxValidationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} ({})", self, self.code())
    }
}

/// Per-transaction summary inside a filtered block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilteredTransaction {
    pub txid: String,
    pub header_type: HeaderType,
    pub tx_validation_code: TxValidationCode,
    /// Events with payloads removed.
    pub chaincode_events: Vec<ChaincodeEvent>,
}

/// Block reduced to transaction IDs, validation codes and chaincode events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilteredBlock {
    pub channel_id: String,
    pub number: u64,
    pub filtered_transactions: Vec<FilteredTransaction>,
}
