//! # Ledger Client Benchmarks
//!
//! | Path | Operation |
//! |------|-----------|
//! | Proposal | Build and sign a transaction proposal |
//! | Assembly | Combine N endorsements into a transaction |
//! | Envelope | Sign the assembled transaction |

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use lc_02_tx_assembly::{TransactionAssembler, TransactionAssemblyApi};
use shared_types::{
    ChaincodeInvocation, Ed25519Identity, ProposalResponse, Response, TransactionProposal,
    TransactionProposalResponse, STATUS_OK,
};
use std::sync::Arc;

fn invocation() -> ChaincodeInvocation {
    ChaincodeInvocation {
        chaincode_id: "asset".to_string(),
        function: "transfer".to_string(),
        args: vec![b"10".to_vec(), b"alice".to_vec(), b"bob".to_vec()],
        ..Default::default()
    }
}

fn endorsed(
    proposal: &Arc<TransactionProposal>,
    endorsers: &[Ed25519Identity],
) -> Vec<TransactionProposalResponse> {
    endorsers
        .iter()
        .enumerate()
        .map(|(i, endorser)| TransactionProposalResponse {
            endorser: format!("peer{i}"),
            proposal: Arc::clone(proposal),
            outcome: Ok(ProposalResponse::endorse(
                &proposal.proposal,
                Response {
                    status: STATUS_OK,
                    ..Default::default()
                },
                b"rwset".to_vec(),
                None,
                endorser,
            )
            .unwrap()),
        })
        .collect()
}

fn bench_proposal_creation(c: &mut Criterion) {
    let identity = Ed25519Identity::from_seed("Org1MSP", [7u8; 32]);

    c.bench_function("proposal_new", |b| {
        b.iter(|| {
            black_box(TransactionProposal::new("mychannel", invocation(), &identity).unwrap())
        })
    });
}

fn bench_assembly(c: &mut Criterion) {
    let mut group = c.benchmark_group("tx-assembly");
    let identity = Ed25519Identity::from_seed("Org1MSP", [7u8; 32]);
    let assembler = TransactionAssembler::new();
    let proposal =
        Arc::new(TransactionProposal::new("mychannel", invocation(), &identity).unwrap());

    for size in [1usize, 4, 16] {
        let endorsers: Vec<_> = (0..size)
            .map(|i| Ed25519Identity::from_seed(format!("Org{i}MSP"), [i as u8; 32]))
            .collect();
        let responses = endorsed(&proposal, &endorsers);

        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("assemble", size), &responses, |b, r| {
            b.iter(|| black_box(assembler.assemble(r).unwrap()))
        });
    }

    let responses = endorsed(&proposal, &[Ed25519Identity::from_seed("PeerMSP", [1u8; 32])]);
    let transaction = assembler.assemble(&responses).unwrap();
    group.bench_function("create_signed_envelope", |b| {
        b.iter(|| {
            black_box(
                assembler
                    .create_signed_envelope(&transaction, &identity)
                    .unwrap(),
            )
        })
    });

    group.finish();
}

criterion_group!(benches, bench_proposal_creation, bench_assembly);
criterion_main!(benches);
