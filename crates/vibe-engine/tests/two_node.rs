//! Two engines exchanging vibe messages over the loopback transport.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use vibe_engine::{
    spawn_engine, Collaborators, EventSink, InboundFrame, LoopbackNetwork, MatchingEngine,
    PeerInfoResolver, VibeEvent,
};
use vibe_shared::identity::Identity;
use vibe_shared::PeerIdentity;
use vibe_store::{MemoryPersistence, VibeStatus, VibeStore};

struct Node {
    id: PeerIdentity,
    engine: MatchingEngine,
    inbox: mpsc::Receiver<InboundFrame>,
    events: mpsc::UnboundedReceiver<VibeEvent>,
}

type Parts = (
    MatchingEngine,
    mpsc::Receiver<InboundFrame>,
    mpsc::UnboundedReceiver<VibeEvent>,
);

fn build(net: &LoopbackNetwork, id: PeerIdentity) -> Parts {
    let inbox = net.register(id.clone(), 256);
    let (sink, events) = EventSink::new();
    let sink = Arc::new(sink);
    let engine = MatchingEngine::new(
        id.clone(),
        VibeStore::open(MemoryPersistence::new()).unwrap(),
        Collaborators {
            transport: Arc::new(net.transport_for(id)),
            notifier: sink.clone(),
            announcer: sink,
            resolver: PeerInfoResolver::new(),
        },
    );
    (engine, inbox, events)
}

fn node(net: &LoopbackNetwork, id: PeerIdentity) -> Node {
    let (engine, inbox, events) = build(net, id.clone());
    Node {
        id,
        engine,
        inbox,
        events,
    }
}

fn fixed(c: char) -> PeerIdentity {
    PeerIdentity::parse(&c.to_string().repeat(64)).unwrap()
}

fn drain<T>(rx: &mut mpsc::Receiver<T>) -> Vec<T> {
    let mut out = Vec::new();
    while let Ok(item) = rx.try_recv() {
        out.push(item);
    }
    out
}

fn drain_events(node: &mut Node) -> Vec<VibeEvent> {
    let mut out = Vec::new();
    while let Ok(e) = node.events.try_recv() {
        out.push(e);
    }
    out
}

#[derive(Clone, Copy, Debug)]
enum Delivery {
    InOrder,
    Reversed,
    Duplicated,
    ReversedAndDuplicated,
}

fn shape(mut frames: Vec<InboundFrame>, delivery: Delivery) -> Vec<InboundFrame> {
    if matches!(delivery, Delivery::Reversed | Delivery::ReversedAndDuplicated) {
        frames.reverse();
    }
    if matches!(delivery, Delivery::Duplicated | Delivery::ReversedAndDuplicated) {
        frames = frames
            .into_iter()
            .flat_map(|f| [f.clone(), f])
            .collect();
    }
    frames
}

/// Deliver queued frames back and forth until both inboxes stay empty.
async fn pump(a: &mut Node, b: &mut Node, delivery: Delivery) {
    for _ in 0..16 {
        let to_a = shape(drain(&mut a.inbox), delivery);
        let to_b = shape(drain(&mut b.inbox), delivery);
        if to_a.is_empty() && to_b.is_empty() {
            return;
        }
        for frame in to_a {
            a.engine.handle_frame(frame).await;
        }
        for frame in to_b {
            b.engine.handle_frame(frame).await;
        }
    }
    panic!("message exchange did not settle");
}

fn assert_matched(node: &Node, peer: &PeerIdentity) {
    let record = node.engine.record_for(peer).expect("record exists");
    assert_eq!(record.status, VibeStatus::Matched, "node {} not matched", node.id.short());
    assert!(record.matched_at.is_some());
    assert_eq!(node.engine.records().len(), 1);
}

fn opened_count(events: &[VibeEvent]) -> usize {
    events
        .iter()
        .filter(|e| matches!(e, VibeEvent::MatchOpened { .. }))
        .count()
}

#[tokio::test]
async fn mutual_initiate_converges_under_any_delivery() {
    for delivery in [
        Delivery::InOrder,
        Delivery::Reversed,
        Delivery::Duplicated,
        Delivery::ReversedAndDuplicated,
    ] {
        let net = LoopbackNetwork::new();
        let mut a = node(&net, fixed('a'));
        let mut b = node(&net, fixed('b'));

        a.engine.initiate(&b.id.clone(), None).await.unwrap();
        b.engine.initiate(&a.id.clone(), None).await.unwrap();
        pump(&mut a, &mut b, delivery).await;

        assert_matched(&a, &b.id);
        assert_matched(&b, &a.id);

        let a_events = drain_events(&mut a);
        let b_events = drain_events(&mut b);
        assert_eq!(opened_count(&a_events), 1, "{delivery:?}");
        assert_eq!(opened_count(&b_events), 0, "{delivery:?}");
    }
}

#[tokio::test]
async fn one_sided_then_match_under_any_delivery() {
    for delivery in [Delivery::InOrder, Delivery::Reversed, Delivery::Duplicated] {
        let net = LoopbackNetwork::new();
        let mut a = node(&net, fixed('a'));
        let mut b = node(&net, fixed('b'));

        a.engine.initiate(&b.id.clone(), None).await.unwrap();
        pump(&mut a, &mut b, delivery).await;
        assert_eq!(
            b.engine.record_for(&a.id).unwrap().status,
            VibeStatus::Received
        );
        assert_eq!(
            a.engine.record_for(&b.id).unwrap().status,
            VibeStatus::Pending
        );

        b.engine.initiate(&a.id.clone(), None).await.unwrap();
        assert_matched(&b, &a.id);

        pump(&mut a, &mut b, delivery).await;
        assert_matched(&a, &b.id);
    }
}

#[tokio::test]
async fn shared_effect_fires_on_smaller_identity_only() {
    for _ in 0..8 {
        let net = LoopbackNetwork::new();
        let mut x = node(&net, Identity::generate().peer_identity());
        let mut y = node(&net, Identity::generate().peer_identity());

        x.engine.initiate(&y.id.clone(), None).await.unwrap();
        pump(&mut x, &mut y, Delivery::InOrder).await;
        y.engine.initiate(&x.id.clone(), None).await.unwrap();
        pump(&mut x, &mut y, Delivery::Duplicated).await;

        let x_opened = opened_count(&drain_events(&mut x));
        let y_opened = opened_count(&drain_events(&mut y));
        if x.id < y.id {
            assert_eq!((x_opened, y_opened), (1, 0));
        } else {
            assert_eq!((x_opened, y_opened), (0, 1));
        }
    }
}

#[tokio::test]
async fn spawned_engines_match_over_loopback() {
    let net = LoopbackNetwork::new();
    let (a_engine, a_inbox, mut a_events) = build(&net, fixed('a'));
    let (b_engine, b_inbox, mut b_events) = build(&net, fixed('b'));

    let (a, a_join) = spawn_engine(a_engine, a_inbox, 16);
    let (b, b_join) = spawn_engine(b_engine, b_inbox, 16);

    a.initiate(fixed('b'), None).await.unwrap();

    let received = tokio::time::timeout(Duration::from_secs(5), b_events.recv())
        .await
        .unwrap()
        .unwrap();
    assert!(matches!(received, VibeEvent::VibeReceived { .. }));

    let report = b.initiate(fixed('a'), None).await.unwrap();
    assert_eq!(report.status, VibeStatus::Matched);

    // A matches when B's commitment arrives, then opens the conversation.
    let mut a_seen = Vec::new();
    while a_seen.len() < 2 {
        let event = tokio::time::timeout(Duration::from_secs(5), a_events.recv())
            .await
            .unwrap()
            .unwrap();
        a_seen.push(event);
    }
    assert!(matches!(a_seen[0], VibeEvent::VibeMatched { .. }));
    assert!(matches!(a_seen[1], VibeEvent::MatchOpened { .. }));

    a.shutdown().await.unwrap();
    b.shutdown().await.unwrap();
    let a_engine = a_join.await.unwrap();
    let b_engine = b_join.await.unwrap();

    assert_eq!(
        a_engine.record_for(&fixed('b')).unwrap().status,
        VibeStatus::Matched
    );
    assert_eq!(a_engine.matches().len(), 1);
    assert_eq!(b_engine.matches().len(), 1);
}
