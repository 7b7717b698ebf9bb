//! Chaincode requests and execute results.

use crate::domain::ChannelClientError;
use shared_types::{ChaincodeInvocation, TransactionProposalResponse, TxValidationCode};
use std::collections::BTreeMap;

/// A chaincode function call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Request {
    pub chaincode_id: String,
    pub function: String,
    pub args: Vec<Vec<u8>>,
    /// Private data for endorsers only, never written to the ledger
    pub transient_map: BTreeMap<String, Vec<u8>>,
}

impl Request {
    pub fn new(chaincode_id: impl Into<String>, function: impl Into<String>) -> Self {
        Self {
            chaincode_id: chaincode_id.into(),
            function: function.into(),
            ..Default::default()
        }
    }

    pub fn with_arg(mut self, arg: impl Into<Vec<u8>>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn with_args<I, A>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<Vec<u8>>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn with_transient(mut self, key: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        self.transient_map.insert(key.into(), value.into());
        self
    }

    /// Check required fields.
    pub fn validate(&self) -> Result<(), ChannelClientError> {
        if self.chaincode_id.is_empty() || self.function.is_empty() {
            return Err(ChannelClientError::InvalidRequest(
                "chaincode ID and function are required".into(),
            ));
        }
        Ok(())
    }

    pub(crate) fn into_invocation(self) -> ChaincodeInvocation {
        ChaincodeInvocation {
            chaincode_id: self.chaincode_id,
            function: self.function,
            args: self.args,
            transient_map: self.transient_map,
        }
    }
}

/// Outcome of a committed `execute`.
#[derive(Debug, Clone)]
pub struct ExecuteResponse {
    pub tx_id: String,
    pub tx_validation_code: TxValidationCode,
    pub block_number: u64,
    /// Chaincode response payload from the first endorser
    pub payload: Vec<u8>,
    /// URL of the orderer that accepted the transaction
    pub orderer: String,
    pub responses: Vec<TransactionProposalResponse>,
}
