//! # Transaction Assembler
//!
//! Pure, synchronous assembly of endorsed responses into a [`Transaction`]
//! and of a transaction into a [`SignedEnvelope`].
//!
//! ## Validation Order
//!
//! 1. At least one response.
//! 2. The first response's proposal is canonical; its header and payload are
//!    decoded once.
//! 3. Every response, in input order, must have reached its peer, carry
//!    status 200, carry an endorsement and agree with the first response's
//!    payload bytes.

use crate::domain::AssemblyError;
use crate::ports::inbound::TransactionAssemblyApi;
use shared_types::codec;
use shared_types::{
    ChaincodeActionPayload, ChaincodeEndorsedAction, IdentityContext, Payload, SignedEnvelope,
    Transaction, TransactionAction, TransactionData, TransactionProposalResponse, STATUS_OK,
};
use std::sync::Arc;
use tracing::{debug, warn};

/// Stateless assembler.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransactionAssembler;

impl TransactionAssembler {
    pub fn new() -> Self {
        Self
    }
}

impl TransactionAssemblyApi for TransactionAssembler {
    fn assemble(
        &self,
        responses: &[TransactionProposalResponse],
    ) -> Result<Transaction, AssemblyError> {
        let first = responses.first().ok_or(AssemblyError::NoResponses)?;
        let proposal = Arc::clone(&first.proposal);

        let header = proposal.proposal.decode_header()?;
        let proposal_payload = proposal.proposal.decode_payload()?;

        let mut endorsements = Vec::with_capacity(responses.len());
        let mut response_payload: Option<&[u8]> = None;

        for r in responses {
            let response = match &r.outcome {
                Ok(response) => response,
                Err(e) => {
                    warn!(endorser = %r.endorser, error = %e, "Cannot assemble: endorser failed");
                    return Err(AssemblyError::EndorserFailed {
                        endorser: r.endorser.clone(),
                        source: e.clone(),
                    });
                }
            };

            if response.response.status != STATUS_OK {
                warn!(
                    endorser = %r.endorser,
                    status = response.response.status,
                    "Cannot assemble: proposal rejected"
                );
                return Err(AssemblyError::Rejected {
                    endorser: r.endorser.clone(),
                    status: response.response.status,
                    message: response.response.message.clone(),
                });
            }

            match response_payload {
                None => response_payload = Some(&response.payload),
                Some(expected) if expected != response.payload.as_slice() => {
                    return Err(AssemblyError::PayloadMismatch {
                        endorser: r.endorser.clone(),
                    });
                }
                Some(_) => {}
            }

            let endorsement =
                response
                    .endorsement
                    .clone()
                    .ok_or_else(|| AssemblyError::MissingEndorsement {
                        endorser: r.endorser.clone(),
                    })?;
            endorsements.push(endorsement);
        }

        // Private data never reaches the ledger.
        let chaincode_proposal_payload = codec::encode(
            "ChaincodeProposalPayload",
            &proposal_payload.without_transient(),
        )?;

        let action = TransactionAction {
            header: header.signature_header,
            payload: ChaincodeActionPayload {
                chaincode_proposal_payload,
                action: ChaincodeEndorsedAction {
                    proposal_response_payload: response_payload.unwrap_or_default().to_vec(),
                    endorsements,
                },
            },
        };

        debug!(
            tx_id = %proposal.txn_id,
            endorsements = responses.len(),
            "Transaction assembled"
        );

        Ok(Transaction { proposal, action })
    }

    fn create_signed_envelope(
        &self,
        transaction: &Transaction,
        ctx: &dyn IdentityContext,
    ) -> Result<SignedEnvelope, AssemblyError> {
        let header = transaction.proposal.proposal.decode_header()?;
        let signature_header = header.decode_signature_header()?;
        if ctx.identity()? != signature_header.creator {
            return Err(AssemblyError::SignerMismatch);
        }

        let data = codec::encode(
            "TransactionData",
            &TransactionData {
                actions: vec![transaction.action.clone()],
            },
        )?;

        let envelope = SignedEnvelope::sign(&Payload { header, data }, ctx)?;
        debug!(tx_id = %transaction.txn_id(), "Transaction envelope signed");
        Ok(envelope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use shared_types::{
        ChaincodeInvocation, Ed25519Identity, HeaderType, ProcessorError, ProposalResponse,
        Response, TransactionProposal,
    };
    use std::collections::BTreeMap;

    fn client() -> Ed25519Identity {
        Ed25519Identity::from_seed("Org1MSP", [7u8; 32])
    }

    fn proposal() -> Arc<TransactionProposal> {
        Arc::new(
            TransactionProposal::new(
                "mychannel",
                ChaincodeInvocation {
                    chaincode_id: "asset".to_string(),
                    function: "transfer".to_string(),
                    args: vec![b"a".to_vec()],
                    transient_map: BTreeMap::from([("price".to_string(), b"100".to_vec())]),
                },
                &client(),
            )
            .unwrap(),
        )
    }

    fn endorsed(
        proposal: &Arc<TransactionProposal>,
        peer: u8,
        results: &[u8],
    ) -> TransactionProposalResponse {
        let identity = Ed25519Identity::from_seed("PeerMSP", [peer; 32]);
        TransactionProposalResponse {
            endorser: format!("peer{peer}"),
            proposal: Arc::clone(proposal),
            outcome: Ok(ProposalResponse::endorse(
                &proposal.proposal,
                Response {
                    status: STATUS_OK,
                    ..Default::default()
                },
                results.to_vec(),
                None,
                &identity,
            )
            .unwrap()),
        }
    }

    fn rejected(
        proposal: &Arc<TransactionProposal>,
        peer: u8,
        status: i32,
    ) -> TransactionProposalResponse {
        TransactionProposalResponse {
            endorser: format!("peer{peer}"),
            proposal: Arc::clone(proposal),
            outcome: Ok(ProposalResponse::rejected(status, "simulation failed")),
        }
    }

    fn failed(proposal: &Arc<TransactionProposal>, peer: u8) -> TransactionProposalResponse {
        TransactionProposalResponse {
            endorser: format!("peer{peer}"),
            proposal: Arc::clone(proposal),
            outcome: Err(ProcessorError::Transport {
                endpoint: format!("peer{peer}"),
                reason: "connection reset".to_string(),
            }),
        }
    }

    #[test]
    fn test_empty_responses() {
        let result = TransactionAssembler::new().assemble(&[]);
        assert_eq!(result.unwrap_err(), AssemblyError::NoResponses);
    }

    #[test]
    fn test_assemble_collects_endorsements_in_order() {
        let p = proposal();
        let responses = vec![
            endorsed(&p, 3, b"rw"),
            endorsed(&p, 1, b"rw"),
            endorsed(&p, 2, b"rw"),
        ];

        let tx = TransactionAssembler::new().assemble(&responses).unwrap();
        assert_eq!(tx.txn_id(), &p.txn_id);

        let expected: Vec<_> = responses
            .iter()
            .map(|r| r.outcome.as_ref().unwrap().endorsement.clone().unwrap())
            .collect();
        assert_eq!(tx.action.payload.action.endorsements, expected);
    }

    #[test]
    fn test_transient_map_is_stripped() {
        let p = proposal();
        let tx = TransactionAssembler::new()
            .assemble(&[endorsed(&p, 1, b"rw")])
            .unwrap();

        let payload: shared_types::ChaincodeProposalPayload = codec::decode(
            "ChaincodeProposalPayload",
            &tx.action.payload.chaincode_proposal_payload,
        )
        .unwrap();
        assert!(payload.transient_map.is_empty());
        assert_eq!(payload.function, "transfer");
    }

    #[test]
    fn test_rejection_names_endorser() {
        let p = proposal();
        let responses = vec![endorsed(&p, 1, b"rw"), rejected(&p, 2, 500)];
        match TransactionAssembler::new().assemble(&responses) {
            Err(AssemblyError::Rejected { endorser, status, message }) => {
                assert_eq!(endorser, "peer2");
                assert_eq!(status, 500);
                assert_eq!(message, "simulation failed");
            }
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[test]
    fn test_network_failure_fails_assembly() {
        let p = proposal();
        let responses = vec![failed(&p, 1), endorsed(&p, 2, b"rw")];
        assert!(matches!(
            TransactionAssembler::new().assemble(&responses),
            Err(AssemblyError::EndorserFailed { endorser, .. }) if endorser == "peer1"
        ));
    }

    #[test]
    fn test_divergent_payloads_rejected() {
        let p = proposal();
        let responses = vec![endorsed(&p, 1, b"rw-a"), endorsed(&p, 2, b"rw-b")];
        assert_eq!(
            TransactionAssembler::new().assemble(&responses).unwrap_err(),
            AssemblyError::PayloadMismatch {
                endorser: "peer2".to_string()
            }
        );
    }

    #[test]
    fn test_signed_envelope() {
        let p = proposal();
        let assembler = TransactionAssembler::new();
        let tx = assembler.assemble(&[endorsed(&p, 1, b"rw")]).unwrap();
        let envelope = assembler.create_signed_envelope(&tx, &client()).unwrap();

        assert!(client().verify(&envelope.payload, &envelope.signature));
        let channel_header = envelope.channel_header().unwrap();
        assert_eq!(channel_header.header_type, HeaderType::EndorserTransaction);
        assert_eq!(channel_header.tx_id, p.txn_id.id());

        let data: TransactionData =
            codec::decode("TransactionData", &envelope.decode_payload().unwrap().data).unwrap();
        assert_eq!(data.actions, vec![tx.action]);
    }

    #[test]
    fn test_envelope_signer_must_be_creator() {
        let p = proposal();
        let assembler = TransactionAssembler::new();
        let tx = assembler.assemble(&[endorsed(&p, 1, b"rw")]).unwrap();
        let stranger = Ed25519Identity::generate("Org9MSP");
        assert_eq!(
            assembler.create_signed_envelope(&tx, &stranger).unwrap_err(),
            AssemblyError::SignerMismatch
        );
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        /// Any failed or non-200 response in the set prevents assembly.
        #[test]
        fn prop_any_bad_response_rejects(kinds in proptest::collection::vec(0u8..4, 1..6)) {
            let p = proposal();
            let responses: Vec<_> = kinds
                .iter()
                .enumerate()
                .map(|(i, kind)| match kind {
                    0 => failed(&p, i as u8),
                    1 => rejected(&p, i as u8, 400 + i as i32),
                    _ => endorsed(&p, i as u8, b"rw"),
                })
                .collect();

            let result = TransactionAssembler::new().assemble(&responses);
            if kinds.iter().all(|k| *k >= 2) {
                prop_assert!(result.is_ok());
            } else {
                prop_assert!(result.is_err());
            }
        }
    }
}
