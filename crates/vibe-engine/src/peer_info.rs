//! Best-effort display names for bare peer identities.
//!
//! Names and avatars are cosmetic: nothing in the protocol depends on them.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use vibe_shared::constants::SHORT_ID_LEN;
use vibe_shared::PeerIdentity;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerInfo {
    pub display_name: String,
    pub avatar_ref: Option<String>,
}

impl PeerInfo {
    pub fn new(display_name: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            avatar_ref: None,
        }
    }

    pub fn with_avatar(mut self, avatar_ref: impl Into<String>) -> Self {
        self.avatar_ref = Some(avatar_ref.into());
        self
    }

    /// Truncated-identity name used when no source knows the peer.
    pub fn placeholder(peer: &PeerIdentity) -> Self {
        Self::new(format!("{}...", &peer.as_str()[..SHORT_ID_LEN]))
    }
}

/// A source of peer profiles: the contact list, the discovery feed, ...
pub trait PeerDirectory: Send + Sync {
    fn lookup_display_name(&self, peer: &PeerIdentity) -> Option<PeerInfo>;
}

/// Consults its sources in order and falls back to a placeholder.
#[derive(Clone, Default)]
pub struct PeerInfoResolver {
    sources: Vec<Arc<dyn PeerDirectory>>,
}

impl PeerInfoResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Standard lookup order: contacts first, then the discovery feed.
    pub fn with_sources(contacts: Arc<dyn PeerDirectory>, discovery: Arc<dyn PeerDirectory>) -> Self {
        Self {
            sources: vec![contacts, discovery],
        }
    }

    pub fn push_source(&mut self, source: Arc<dyn PeerDirectory>) {
        self.sources.push(source);
    }

    pub fn resolve(&self, peer: &PeerIdentity) -> PeerInfo {
        self.sources
            .iter()
            .filter_map(|source| source.lookup_display_name(peer))
            .find(|info| !info.display_name.trim().is_empty())
            .unwrap_or_else(|| PeerInfo::placeholder(peer))
    }
}

/// A directory backed by a map, filled by the host application.
#[derive(Debug, Default)]
pub struct StaticDirectory {
    entries: RwLock<HashMap<PeerIdentity, PeerInfo>>,
}

impl StaticDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, peer: PeerIdentity, info: PeerInfo) {
        if let Ok(mut entries) = self.entries.write() {
            entries.insert(peer, info);
        }
    }

    pub fn remove(&self, peer: &PeerIdentity) {
        if let Ok(mut entries) = self.entries.write() {
            entries.remove(peer);
        }
    }
}

impl PeerDirectory for StaticDirectory {
    fn lookup_display_name(&self, peer: &PeerIdentity) -> Option<PeerInfo> {
        self.entries.read().ok()?.get(peer).cloned()
    }
}
