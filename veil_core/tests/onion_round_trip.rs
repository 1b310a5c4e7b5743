//! End-to-end overlay runs over an in-memory transport: a sender, three
//! relays and a destination user wired together without sockets.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use futures::future::BoxFuture;
use rand::thread_rng;

use veil_core::circuit::CIRCUIT_LENGTH;
use veil_core::directory::{Registry, RelayDescriptor};
use veil_core::relay::ForwardingEngine;
use veil_core::sender::Sender;
use veil_core::transport::{HopKind, Transport, TransportError};
use veil_crypto::{decode_text, SecretKey};
use veil_packet::NodeId;

type Engine = ForwardingEngine<Registry, RouterTransport>;

/// Dispatches relay hops straight into the target engine and records user
/// deliveries, standing in for the HTTP transport.
#[derive(Clone, Default)]
struct RouterTransport {
    relays: Arc<Mutex<HashMap<NodeId, Arc<Engine>>>>,
    hops: Arc<Mutex<Vec<NodeId>>>,
    delivered: Arc<Mutex<Vec<(NodeId, String)>>>,
}

impl Transport for RouterTransport {
    fn send_message<'a>(&'a self, target: NodeId, kind: HopKind, message: &'a str) -> BoxFuture<'a, Result<(), TransportError>> {
        match kind {
            HopKind::Relay => {
                let engine = self.relays.lock().unwrap().get(&target).cloned();
                Box::pin(async move {
                    let engine = engine.ok_or_else(|| TransportError::Unreachable {
                        id: target,
                        reason: "unknown relay".to_owned(),
                    })?;
                    self.hops.lock().unwrap().push(target);
                    engine.handle_message(message).await.map_err(|e| TransportError::Unreachable {
                        id: target,
                        reason: e.to_string(),
                    })?;
                    Ok(())
                })
            },
            HopKind::User => {
                self.delivered.lock().unwrap().push((target, message.to_owned()));
                Box::pin(futures::future::ready(Ok(())))
            },
        }
    }
}

/// Spin up a registry and `n` registered relays wired through one router.
fn overlay(n: u64) -> (Registry, RouterTransport) {
    let mut rng = thread_rng();
    let registry = Registry::new();
    let router = RouterTransport::default();
    for id in 1..=n {
        let secret_key = SecretKey::generate(&mut rng);
        registry.register(RelayDescriptor {
            id: NodeId(id),
            public_key: secret_key.public_key(),
        }).unwrap();
        let engine = Engine::new(NodeId(id), secret_key, registry.clone(), router.clone());
        router.relays.lock().unwrap().insert(NodeId(id), Arc::new(engine));
    }
    (registry, router)
}

#[tokio::test]
async fn round_trip_through_three_relays() {
    let (registry, router) = overlay(3);
    let sender = Sender::new(NodeId(42), registry, router.clone());

    sender.send_message(NodeId(7), "hello").await.unwrap();

    // exactly one delivery, plaintext intact
    let delivered = router.delivered.lock().unwrap().clone();
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0].0, NodeId(7));
    assert_eq!(decode_text(&delivered[0].1).unwrap(), b"hello");

    // every relay was visited exactly once
    let hops = router.hops.lock().unwrap().clone();
    assert_eq!(hops.len(), CIRCUIT_LENGTH);
    let mut sorted = hops.clone();
    sorted.sort();
    sorted.dedup();
    assert_eq!(sorted.len(), CIRCUIT_LENGTH);

    // each relay observed exactly one correct next-hop identity
    let relays = router.relays.lock().unwrap();
    for window in hops.windows(2) {
        let observation = relays[&window[0]].observation();
        assert_eq!(observation.last_forward_target, Some(window[1]));
    }
    let exit_observation = relays[hops.last().unwrap()].observation();
    assert_eq!(exit_observation.last_forward_target, Some(NodeId(7)));

    assert_eq!(sender.observation().last_sent_message, Some("hello".to_owned()));
}

#[tokio::test]
async fn sequential_sends_pick_independent_circuits() {
    let (registry, router) = overlay(8);
    let sender = Sender::new(NodeId(42), registry, router.clone());

    sender.send_message(NodeId(7), "first").await.unwrap();
    sender.send_message(NodeId(7), "second").await.unwrap();

    let delivered = router.delivered.lock().unwrap().clone();
    assert_eq!(delivered.len(), 2);
    assert_eq!(decode_text(&delivered[0].1).unwrap(), b"first");
    assert_eq!(decode_text(&delivered[1].1).unwrap(), b"second");

    // each send took exactly one full circuit
    assert_eq!(router.hops.lock().unwrap().len(), 2 * CIRCUIT_LENGTH);
}

#[tokio::test]
async fn destination_sharing_a_relay_id_is_classified_as_a_relay() {
    let (registry, router) = overlay(4);
    let sender = Sender::new(NodeId(42), registry, router.clone());

    // NodeId(2) is a registered relay, so the exit hop classifies it as a
    // relay endpoint and hands it the bare plaintext, which is not a valid
    // envelope. The failure surfaces all the way back to the sender.
    let result = sender.send_message(NodeId(2), "hi there").await;
    assert!(result.is_err());

    let hops = router.hops.lock().unwrap().clone();
    // the circuit itself still routed around the destination identity
    assert!(!hops[..CIRCUIT_LENGTH].contains(&NodeId(2)));
    assert_eq!(hops.last(), Some(&NodeId(2)));

    assert!(router.delivered.lock().unwrap().is_empty());
    assert_eq!(sender.observation().last_sent_message, None);
}
