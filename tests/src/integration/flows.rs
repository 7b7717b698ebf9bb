//! # End-to-End Flows
//!
//! Proposal → endorsement → assembly → ordering → commit event, against the
//! in-memory network.
//!
//! ## Flows Tested
//!
//! 1. **Execute**: a committed transaction reaches block, chaincode and
//!    tx status listeners with the same transaction ID and block number.
//! 2. **Rejection**: a transaction invalidated at commit surfaces as
//!    `TxRejected` and fires no chaincode event.
//! 3. **Failover**: unavailable orderers and peers are tolerated up to the
//!    configured quorum.
//! 4. **Reconnect**: the event client recovers from a dropped stream and
//!    later commits are still observed.

#[cfg(test)]
mod tests {
    use crate::network::{OrdererBehaviour, PeerBehaviour, TestNetwork};
    use lc_01_endorsement::EndorsementError;
    use lc_03_ordering::{OrdererBroadcaster, OrderingApi, OrderingConfig, OrderingError};
    use lc_04_event_dispatch::domain::ChannelAction;
    use lc_04_event_dispatch::{
        ConnectionState, DispatcherConfig, EventClient, EventKind, EventServiceApi,
        ReconnectConfig,
    };
    use lc_05_channel_client::{ChannelApi, ChannelClientConfig, ChannelClientError, Request};
    use shared_types::{
        BroadcastStatus, Header, Payload, SignedEnvelope, TxValidationCode, STATUS_OK,
    };
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::mpsc;
    use tokio::time::timeout;

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    fn dispatcher_config() -> DispatcherConfig {
        DispatcherConfig {
            event_kinds: vec![EventKind::Block, EventKind::FilteredBlock],
            reconnect: ReconnectConfig {
                enabled: true,
                time_between_attempts: Duration::from_millis(10),
                max_attempts: 5,
            },
            ..Default::default()
        }
    }

    async fn connected_events(network: &TestNetwork) -> Arc<EventClient> {
        let events = Arc::new(network.event_client(dispatcher_config()).unwrap());
        events.connect().await.unwrap();
        events
    }

    fn transfer(amount: &str) -> Request {
        Request::new("asset", "transfer").with_args([amount, "alice", "bob"])
    }

    async fn recv<E>(rx: &mut mpsc::Receiver<E>) -> E {
        timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("timeout waiting for event")
            .expect("event queue closed")
    }

    async fn wait_until(condition: impl Fn() -> bool) {
        for _ in 0..200 {
            if condition() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("condition not reached");
    }

    // =============================================================================
    // EXECUTE
    // =============================================================================

    #[tokio::test]
    async fn test_execute_reaches_every_listener() {
        let network = TestNetwork::new(2, 1);
        let events = connected_events(&network).await;
        let client = network
            .channel_client(events.clone(), ChannelClientConfig::default())
            .unwrap();

        let (_blocks_reg, mut blocks) = events.register_block_event(None).await.unwrap();
        let (_cc_reg, mut cc_events) = events
            .register_chaincode_event("asset", "^transfer$")
            .await
            .unwrap();

        let response = client.execute(transfer("10")).await.unwrap();

        assert_eq!(response.tx_validation_code, TxValidationCode::Valid);
        assert_eq!(response.payload, b"10".to_vec());
        assert_eq!(response.responses.len(), 2);
        assert_eq!(network.ledger.height(), 1);

        let block = recv(&mut blocks).await;
        assert_eq!(block.block.number(), response.block_number);

        let cc_event = recv(&mut cc_events).await;
        assert_eq!(cc_event.tx_id, response.tx_id);
        assert_eq!(cc_event.event_name, "transfer");
        assert_eq!(cc_event.block_number, response.block_number);
    }

    #[tokio::test]
    async fn test_sequential_executes_get_distinct_ids() {
        let network = TestNetwork::new(1, 1);
        let events = connected_events(&network).await;
        let client = network
            .channel_client(events, ChannelClientConfig::default())
            .unwrap();

        let first = client.execute(transfer("1")).await.unwrap();
        let second = client.execute(transfer("1")).await.unwrap();

        assert_ne!(first.tx_id, second.tx_id);
        assert_eq!(second.block_number, first.block_number + 1);
    }

    #[tokio::test]
    async fn test_invalidated_transaction_is_reported() {
        let network = TestNetwork::new(2, 1);
        let events = connected_events(&network).await;
        let client = network
            .channel_client(events.clone(), ChannelClientConfig::default())
            .unwrap();
        let (_cc_reg, mut cc_events) = events
            .register_chaincode_event("asset", ".*")
            .await
            .unwrap();

        network
            .ledger
            .set_validation_code(TxValidationCode::MvccReadConflict);

        match client.execute(transfer("10")).await {
            Err(ChannelClientError::TxRejected { code, .. }) => {
                assert_eq!(code, TxValidationCode::MvccReadConflict);
            }
            other => panic!("expected TxRejected, got {other:?}"),
        }
        // Committed but invalid: no chaincode event.
        assert!(cc_events.try_recv().is_err());
        assert_eq!(network.ledger.height(), 1);
    }

    #[tokio::test]
    async fn test_query_does_not_order() {
        let network = TestNetwork::new(2, 1);
        let events = connected_events(&network).await;
        let client = network
            .channel_client(events, ChannelClientConfig::default())
            .unwrap();

        let response = client
            .query(Request::new("asset", "read").with_arg("alice"))
            .await
            .unwrap();

        assert_eq!(response.status, STATUS_OK);
        assert_eq!(response.payload, b"alice".to_vec());
        assert_eq!(network.orderers[0].received(), 0);
        assert_eq!(network.ledger.height(), 0);
    }

    // =============================================================================
    // FAILURE TOLERANCE
    // =============================================================================

    #[tokio::test]
    async fn test_orderer_failover() {
        let network = TestNetwork::new(1, 3);
        network.orderers[0].set_behaviour(OrdererBehaviour::Unreachable);
        network.orderers[1]
            .set_behaviour(OrdererBehaviour::Status(BroadcastStatus::ServiceUnavailable));
        let events = connected_events(&network).await;
        let client = network
            .channel_client(events, ChannelClientConfig::default())
            .unwrap();

        for _ in 0..10 {
            let response = client.execute(transfer("5")).await.unwrap();
            assert_eq!(response.orderer, "orderer2.example:7050");
        }
        assert_eq!(network.orderers[2].received(), 10);
        assert_eq!(network.ledger.height(), 10);
    }

    #[tokio::test]
    async fn test_all_orderers_down() {
        let network = TestNetwork::new(1, 2);
        for orderer in &network.orderers {
            orderer.set_behaviour(OrdererBehaviour::Unreachable);
        }
        let events = connected_events(&network).await;
        let client = network
            .channel_client(events, ChannelClientConfig::default())
            .unwrap();

        assert!(matches!(
            client.execute(transfer("5")).await,
            Err(ChannelClientError::Ordering(OrderingError::AllFailed { .. }))
        ));
        assert_eq!(network.ledger.height(), 0);
    }

    #[tokio::test]
    async fn test_endorsement_quorum() {
        let network = TestNetwork::new(3, 1);
        network.peers[0].set_behaviour(PeerBehaviour::Unavailable);
        network.peers[1].set_behaviour(PeerBehaviour::Delay(Duration::from_millis(50)));
        let events = connected_events(&network).await;

        let lenient = network
            .channel_client(
                events.clone(),
                ChannelClientConfig {
                    min_endorsements: 2,
                    ..Default::default()
                },
            )
            .unwrap();
        let response = lenient.execute(transfer("3")).await.unwrap();
        assert_eq!(response.responses.len(), 2);

        let strict = network
            .channel_client(
                events,
                ChannelClientConfig {
                    min_endorsements: 3,
                    ..Default::default()
                },
            )
            .unwrap();
        assert!(matches!(
            strict.execute(transfer("3")).await,
            Err(ChannelClientError::Endorsement(
                EndorsementError::InsufficientEndorsements {
                    got: 2,
                    required: 3
                }
            ))
        ));
        assert_eq!(network.ledger.height(), 1);
    }

    #[tokio::test]
    async fn test_rejecting_peer_fails_query() {
        let network = TestNetwork::new(1, 1);
        network.peers[0].set_behaviour(PeerBehaviour::Reject(500));
        let events = connected_events(&network).await;
        let client = network
            .channel_client(events, ChannelClientConfig::default())
            .unwrap();

        assert!(matches!(
            client.query(Request::new("asset", "read")).await,
            Err(ChannelClientError::Endorsement(_))
        ));
    }

    #[tokio::test]
    async fn test_deliver_first_block_wins() {
        let network = TestNetwork::new(1, 3);
        let events = connected_events(&network).await;
        let client = network
            .channel_client(events, ChannelClientConfig::default())
            .unwrap();
        let committed = client.execute(transfer("7")).await.unwrap();
        network.orderers[0].set_behaviour(OrdererBehaviour::Unreachable);

        let seek = SignedEnvelope::sign(
            &Payload {
                header: Header {
                    channel_header: Vec::new(),
                    signature_header: Vec::new(),
                },
                data: Vec::new(),
            },
            network.identity.as_ref(),
        )
        .unwrap();
        let broadcaster = OrdererBroadcaster::new(OrderingConfig::default()).unwrap();
        let block = broadcaster
            .deliver(&seek, &network.orderer_clients())
            .await
            .unwrap();

        assert_eq!(block.number(), committed.block_number);
    }

    // =============================================================================
    // EVENT CONNECTION LIFECYCLE
    // =============================================================================

    #[tokio::test]
    async fn test_commits_observed_after_reconnect() {
        let network = TestNetwork::new(1, 1);
        let (notify_tx, mut notify_rx) = mpsc::channel(16);
        let events = Arc::new(
            network
                .event_client(dispatcher_config())
                .unwrap()
                .with_connection_notifier(notify_tx),
        );
        events.connect().await.unwrap();
        assert!(recv(&mut notify_rx).await.connected);

        network.hub.refuse_next_connects(1);
        network.hub.drop_connection();

        let lost = recv(&mut notify_rx).await;
        assert!(!lost.connected);
        assert!(lost.error.is_some());
        assert!(recv(&mut notify_rx).await.connected);

        wait_until(|| network.hub.connects() == 3).await;
        wait_until(|| events.state() == ConnectionState::Connected).await;

        let client = network
            .channel_client(events.clone(), ChannelClientConfig::default())
            .unwrap();
        let response = client.execute(transfer("9")).await.unwrap();
        assert_eq!(response.tx_validation_code, TxValidationCode::Valid);
    }

    #[tokio::test]
    async fn test_close_ends_every_stream() {
        let network = TestNetwork::new(1, 1);
        let events = connected_events(&network).await;
        let (_a, mut blocks) = events.register_block_event(None).await.unwrap();
        let (_b, mut filtered) = events.register_filtered_block_event().await.unwrap();
        let (_c, mut tx_status) = events.register_tx_status_event("pending").await.unwrap();

        events.close().await.unwrap();

        assert!(blocks.recv().await.is_none());
        assert!(filtered.recv().await.is_none());
        assert!(tx_status.recv().await.is_none());

        let actions: Vec<ChannelAction> = network
            .hub
            .requests()
            .iter()
            .map(|body| body.action)
            .collect();
        assert_eq!(actions, vec![ChannelAction::Register, ChannelAction::Deregister]);

        let client = network
            .channel_client(events, ChannelClientConfig::default())
            .unwrap();
        assert!(matches!(
            client.execute(transfer("1")).await,
            Err(ChannelClientError::Events(_))
        ));
    }

    #[tokio::test]
    async fn test_metrics_exported() {
        lc_telemetry::register_metrics().unwrap();
        let network = TestNetwork::new(1, 1);
        let events = connected_events(&network).await;
        let client = network
            .channel_client(events, ChannelClientConfig::default())
            .unwrap();
        client.execute(transfer("2")).await.unwrap();

        let text = lc_telemetry::encode_metrics().unwrap();
        assert!(text.contains("lc_endorsement_proposals_sent_total"));
        assert!(text.contains("lc_ordering_broadcast_attempts_total"));
        assert!(text.contains("lc_events_dispatched_total"));
    }
}
