//! # vibe-node
//!
//! Runs two matching engines in one process, connected by the loopback
//! transport, and plays a complete vibe exchange between them:
//! Alice vibes Bob, Bob receives it, Bob vibes back, both end up matched and
//! exactly one of them opens the match conversation.
//!
//! Alice's records go to SQLite (see `EngineConfig`); Bob is a throwaway
//! in-memory peer.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use vibe_engine::{
    spawn_engine, Collaborators, EngineConfig, EngineHandle, EventSink, LoopbackNetwork,
    MatchingEngine, PeerInfo, PeerInfoResolver, StaticDirectory, VibeEvent,
};
use vibe_shared::identity::Identity;
use vibe_shared::PeerIdentity;
use vibe_store::{Database, MemoryPersistence, VibeStore};

const EVENT_TIMEOUT: Duration = Duration::from_secs(5);

struct Node {
    name: &'static str,
    identity: PeerIdentity,
    handle: EngineHandle,
    events: mpsc::UnboundedReceiver<VibeEvent>,
    join: tokio::task::JoinHandle<MatchingEngine>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // -----------------------------------------------------------------------
    // 1. Initialize tracing (respects RUST_LOG env var)
    // -----------------------------------------------------------------------
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,vibe_engine=debug,vibe_store=info")),
        )
        .init();

    info!("Starting vibe node v{}", env!("CARGO_PKG_VERSION"));

    // -----------------------------------------------------------------------
    // 2. Load configuration
    // -----------------------------------------------------------------------
    let config = EngineConfig::from_env();
    info!(?config, "Loaded configuration");

    // -----------------------------------------------------------------------
    // 3. Build both nodes
    // -----------------------------------------------------------------------
    let alice_id = Identity::generate().peer_identity();
    let bob_id = Identity::generate().peer_identity();
    let net = LoopbackNetwork::new();

    let alice_store = if config.in_memory {
        VibeStore::open(MemoryPersistence::new())?
    } else {
        let db = match config.database_path {
            Some(ref path) => Database::open_at(path)?,
            None => Database::new()?,
        };
        VibeStore::open(db)?
    };
    let bob_store = VibeStore::open(MemoryPersistence::new())?;

    let mut alice = start_node("alice", &alice_id, alice_store, &net, &config, {
        let contacts = Arc::new(StaticDirectory::new());
        contacts.insert(bob_id.clone(), PeerInfo::new("Bob"));
        contacts
    });
    let mut bob = start_node("bob", &bob_id, bob_store, &net, &config, {
        let feed = Arc::new(StaticDirectory::new());
        feed.insert(alice_id.clone(), PeerInfo::new("alice_in_wonderland").with_avatar("blob:alice"));
        feed
    });

    // -----------------------------------------------------------------------
    // 4. Play the exchange
    // -----------------------------------------------------------------------
    let report = alice.handle.initiate(bob.identity.clone(), None).await?;
    info!(status = %report.status, delivered = report.delivered(), "alice vibed bob");

    expect_event(&mut bob, |e| matches!(e, VibeEvent::VibeReceived { .. })).await?;

    let report = bob.handle.initiate(alice.identity.clone(), None).await?;
    info!(status = %report.status, delivered = report.delivered(), "bob vibed back");

    expect_event(&mut alice, |e| matches!(e, VibeEvent::VibeMatched { .. })).await?;

    let (opener, other) = if alice.identity < bob.identity {
        (&mut alice, &mut bob)
    } else {
        (&mut bob, &mut alice)
    };
    expect_event(opener, |e| matches!(e, VibeEvent::MatchOpened { .. })).await?;
    info!(opener = opener.name, other = other.name, "match conversation opened");

    // -----------------------------------------------------------------------
    // 5. Shut down and report
    // -----------------------------------------------------------------------
    for node in [alice, bob] {
        node.handle.shutdown().await?;
        let engine = node.join.await.context("engine task panicked")?;
        for record in engine.records() {
            info!(
                node = node.name,
                peer = record.peer_identity.short(),
                name = record.peer_display_name.as_deref().unwrap_or("?"),
                status = %record.status,
                matched_at = ?record.matched_at,
                "final record"
            );
        }
    }

    Ok(())
}

fn start_node(
    name: &'static str,
    identity: &PeerIdentity,
    store: VibeStore,
    net: &LoopbackNetwork,
    config: &EngineConfig,
    directory: Arc<StaticDirectory>,
) -> Node {
    let inbound = net.register(identity.clone(), config.inbound_queue_capacity);
    let (sink, events) = EventSink::new();
    let sink = Arc::new(sink);

    let mut resolver = PeerInfoResolver::new();
    resolver.push_source(directory);

    let engine = MatchingEngine::new(
        identity.clone(),
        store,
        Collaborators {
            transport: Arc::new(net.transport_for(identity.clone())),
            notifier: sink.clone(),
            announcer: sink,
            resolver,
        },
    );
    let (handle, join) = spawn_engine(engine, inbound, config.action_queue_capacity);

    info!(node = name, identity = identity.short(), "node started");
    Node {
        name,
        identity: identity.clone(),
        handle,
        events,
        join,
    }
}

/// Wait for an event matching `wanted`, logging the ones that go by.
async fn expect_event(node: &mut Node, wanted: impl Fn(&VibeEvent) -> bool) -> anyhow::Result<()> {
    loop {
        let event = tokio::time::timeout(EVENT_TIMEOUT, node.events.recv())
            .await
            .with_context(|| format!("{} timed out waiting for an event", node.name))?
            .with_context(|| format!("{} event stream closed", node.name))?;

        info!(node = node.name, event = event.name(), peer = event.peer().short(), "event");
        if wanted(&event) {
            return Ok(());
        }
        if matches!(event, VibeEvent::MatchOpened { .. }) {
            warn!(node = node.name, "unexpected match-opened event");
        }
    }
}
