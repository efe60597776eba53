//! The commit-reveal state machine.
//!
//! Every handler looks up the peer's current record and branches on its
//! [`VibeStatus`]. Duplicate and out-of-order messages are ordinary branches:
//! they either fill in missing data or do nothing.
//!
//! State is always persisted before anything is sent, so a failed send never
//! needs to be rolled back.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, error, info, warn};

use vibe_shared::{
    commit, generate_secret, verify, Commitment, PeerIdentity, Secret, VibeId, VibeMessage,
};
use vibe_store::{VibeRecord, VibeStatus, VibeStore};

use crate::collaborators::{Collaborators, InboundFrame, MatchAnnouncer, Notifier, Transport};
use crate::error::{EngineError, SendError};
use crate::peer_info::{PeerInfo, PeerInfoResolver};
use crate::tiebreak;

/// What a local action did to the peer's record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// A new Pending record was created and our commitment sent.
    Started,
    /// The action completed a mutual match.
    Matched,
    /// The record is now Skipped.
    Skipped,
    /// Nothing changed (already pending, matched or skipped).
    Unchanged,
}

/// Result of a local action. Send failures are reported here but do not
/// undo the transition.
#[derive(Debug, Clone)]
pub struct ActionReport {
    pub vibe_id: VibeId,
    pub status: VibeStatus,
    pub transition: Transition,
    pub send_failures: Vec<SendError>,
}

impl ActionReport {
    pub fn delivered(&self) -> bool {
        self.send_failures.is_empty()
    }
}

pub struct MatchingEngine {
    local: PeerIdentity,
    store: VibeStore,
    transport: Arc<dyn Transport>,
    notifier: Arc<dyn Notifier>,
    announcer: Arc<dyn MatchAnnouncer>,
    resolver: PeerInfoResolver,
}

impl MatchingEngine {
    pub fn new(local: PeerIdentity, store: VibeStore, collaborators: Collaborators) -> Self {
        Self {
            local,
            store,
            transport: collaborators.transport,
            notifier: collaborators.notifier,
            announcer: collaborators.announcer,
            resolver: collaborators.resolver,
        }
    }

    pub fn local_identity(&self) -> &PeerIdentity {
        &self.local
    }

    // ------------------------------------------------------------------
    // Local actions
    // ------------------------------------------------------------------

    /// Express interest in `peer`.
    ///
    /// `info` is the profile the UI already has on screen; when absent the
    /// resolver is consulted.
    pub async fn initiate(
        &mut self,
        peer: &PeerIdentity,
        info: Option<PeerInfo>,
    ) -> Result<ActionReport, EngineError> {
        if *peer == self.local {
            return Err(EngineError::SelfVibe);
        }

        let mut failures = Vec::new();
        let existing = self.store.get(peer);

        match existing {
            Some(record) if record.status == VibeStatus::Received => {
                let mut record = record;
                if let Some(info) = info {
                    apply_info(&mut record, info);
                }
                // We never committed to this peer; commit now so the reveal
                // that follows has something to open.
                let secret = generate_secret()?;
                record.our_commitment = Some(commit(&secret));
                record.our_secret = Some(secret);

                let record = self.complete_match(record, true, &mut failures).await?;
                Ok(report(&record, Transition::Matched, failures))
            }

            Some(record) if matches!(record.status, VibeStatus::Pending | VibeStatus::Matched) => {
                debug!(
                    peer = peer.short(),
                    status = %record.status,
                    "initiate ignored, vibe already in progress"
                );
                Ok(report(&record, Transition::Unchanged, failures))
            }

            previous => {
                let secret = generate_secret()?;
                let commitment = commit(&secret);

                let mut record = VibeRecord::new(peer.clone(), VibeStatus::Pending);
                match info {
                    Some(info) => apply_info(&mut record, info),
                    None => match previous {
                        Some(prev) => copy_cosmetics(&mut record, &prev),
                        None => apply_info(&mut record, self.resolver.resolve(peer)),
                    },
                }
                record.our_commitment = Some(commitment);
                record.our_secret = Some(secret);

                self.persist(record.clone())?;
                info!(peer = peer.short(), vibe_id = %record.id, "vibe sent");

                let message = VibeMessage::Commitment {
                    vibe_id: record.wire_vibe_id().clone(),
                    commitment,
                };
                if let Err(e) = deliver(self.transport.as_ref(), peer, &message).await {
                    failures.push(e);
                }

                Ok(report(&record, Transition::Started, failures))
            }
        }
    }

    /// Dismiss `peer`. Always allowed; a later [`initiate`](Self::initiate)
    /// starts a fresh vibe.
    pub async fn skip(&mut self, peer: &PeerIdentity) -> Result<ActionReport, EngineError> {
        let existing = self.store.get(peer);

        if let Some(ref record) = existing {
            if record.status == VibeStatus::Skipped {
                return Ok(report(record, Transition::Unchanged, Vec::new()));
            }
        }

        let mut record = VibeRecord::new(peer.clone(), VibeStatus::Skipped);
        match existing {
            Some(prev) => copy_cosmetics(&mut record, &prev),
            None => apply_info(&mut record, self.resolver.resolve(peer)),
        }

        self.persist(record.clone())?;
        info!(peer = peer.short(), "vibe skipped");

        Ok(report(&record, Transition::Skipped, Vec::new()))
    }

    /// Operator action: delete one record.
    pub fn clear_match(&mut self, id: &VibeId) -> Result<Option<VibeRecord>, EngineError> {
        let removed = self.store.remove_by_id(id)?;
        if removed.is_some() {
            info!(vibe_id = %id, "vibe record cleared");
        }
        Ok(removed)
    }

    /// Operator action: delete every record.
    pub fn reset(&mut self) -> Result<(), EngineError> {
        self.store.clear_all()?;
        info!("all vibe records cleared");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn record_for(&self, peer: &PeerIdentity) -> Option<VibeRecord> {
        self.store.get(peer)
    }

    /// All records, newest first.
    pub fn records(&self) -> Vec<VibeRecord> {
        let mut records = self.store.list_all();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        records
    }

    /// Matched records, most recent match first.
    pub fn matches(&self) -> Vec<VibeRecord> {
        let mut matches: Vec<_> = self
            .store
            .list_all()
            .into_iter()
            .filter(|r| r.status == VibeStatus::Matched)
            .collect();
        matches.sort_by(|a, b| b.matched_at.cmp(&a.matched_at));
        matches
    }

    // ------------------------------------------------------------------
    // Inbound messages
    // ------------------------------------------------------------------

    /// Entry point for frames coming off the transport. Never fails: bad
    /// input is logged and dropped, storage errors are logged.
    pub async fn handle_frame(&mut self, inbound: InboundFrame) {
        let InboundFrame { from, frame } = inbound;

        if !frame.is_vibe() {
            debug!(
                from = from.short(),
                message_type = %frame.message_type,
                "ignoring non-vibe frame"
            );
            return;
        }

        let message = match VibeMessage::from_bytes(&frame.body) {
            Ok(m) => m,
            Err(e) => {
                debug!(from = from.short(), error = %e, "dropping undecodable vibe payload");
                return;
            }
        };

        let kind = message.kind();
        let result = match message {
            VibeMessage::Commitment {
                vibe_id,
                commitment,
            } => self.on_commitment_received(&from, vibe_id, commitment).await,
            VibeMessage::Reveal { vibe_id, secret } => {
                self.on_reveal_received(&from, vibe_id, secret).await
            }
        };

        if let Err(e) = result {
            error!(from = from.short(), kind, error = %e, "failed to process vibe message");
        }
    }

    pub async fn on_commitment_received(
        &mut self,
        from: &PeerIdentity,
        vibe_id: VibeId,
        commitment: Commitment,
    ) -> Result<(), EngineError> {
        match self.store.get(from) {
            None => self.record_received(from, vibe_id, commitment, None),

            Some(record) => match record.status {
                VibeStatus::Skipped => self.record_received(from, vibe_id, commitment, Some(record)),

                VibeStatus::Pending => {
                    let mut record = record;
                    record.their_commitment = Some(commitment);
                    let mut failures = Vec::new();
                    self.complete_match(record, false, &mut failures).await?;
                    Ok(())
                }

                VibeStatus::Matched => {
                    if record.their_commitment.is_none() {
                        let mut record = record;
                        record.their_commitment = Some(commitment);
                        self.persist(record)?;
                        debug!(peer = from.short(), "stored late commitment on matched vibe");
                    } else {
                        debug!(peer = from.short(), "duplicate commitment on matched vibe");
                    }
                    Ok(())
                }

                VibeStatus::Received => {
                    if record.their_commitment == Some(commitment) {
                        debug!(peer = from.short(), "duplicate commitment ignored");
                        return Ok(());
                    }
                    let mut record = record;
                    record.their_commitment = Some(commitment);
                    record.their_vibe_id = Some(vibe_id);
                    self.persist(record)?;
                    info!(peer = from.short(), "peer replaced its commitment");
                    Ok(())
                }
            },
        }
    }

    pub async fn on_reveal_received(
        &mut self,
        from: &PeerIdentity,
        vibe_id: VibeId,
        secret: Secret,
    ) -> Result<(), EngineError> {
        let Some(record) = self.store.get(from) else {
            warn!(peer = from.short(), vibe_id = %vibe_id, "unexpected reveal, no vibe for peer");
            return Ok(());
        };

        match record.status {
            VibeStatus::Pending => {
                let Some(their_commitment) = record.their_commitment else {
                    warn!(
                        peer = from.short(),
                        vibe_id = %vibe_id,
                        "reveal arrived before the peer's commitment, dropping"
                    );
                    return Ok(());
                };

                if !verify(&secret, &their_commitment) {
                    warn!(
                        peer = from.short(),
                        vibe_id = %vibe_id,
                        "reveal does not match stored commitment, possible tampering or desync"
                    );
                    return Ok(());
                }

                let mut failures = Vec::new();
                self.complete_match(record, false, &mut failures).await?;
                Ok(())
            }

            VibeStatus::Matched => {
                match record.their_commitment {
                    Some(c) if !verify(&secret, &c) => warn!(
                        peer = from.short(),
                        vibe_id = %vibe_id,
                        "reveal on matched vibe does not match stored commitment"
                    ),
                    _ => debug!(peer = from.short(), "reveal on matched vibe ignored"),
                }
                Ok(())
            }

            VibeStatus::Received | VibeStatus::Skipped => {
                warn!(
                    peer = from.short(),
                    vibe_id = %vibe_id,
                    status = %record.status,
                    "unexpected reveal, dropping"
                );
                Ok(())
            }
        }
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn record_received(
        &mut self,
        from: &PeerIdentity,
        vibe_id: VibeId,
        commitment: Commitment,
        previous: Option<VibeRecord>,
    ) -> Result<(), EngineError> {
        let mut record = VibeRecord::new(from.clone(), VibeStatus::Received);
        match previous {
            Some(prev) => copy_cosmetics(&mut record, &prev),
            None => apply_info(&mut record, self.resolver.resolve(from)),
        }
        record.their_commitment = Some(commitment);
        record.their_vibe_id = Some(vibe_id);

        self.persist(record.clone())?;
        info!(peer = from.short(), vibe_id = %record.id, "vibe received");

        self.notifier
            .notify_received(from, &display_name(&record));
        Ok(())
    }

    /// Mark `record` matched, persist, notify, reveal our secret and, on one
    /// side only, open the match conversation.
    ///
    /// With `send_commitment` set our commitment goes out first, for records
    /// where the peer has never seen it.
    async fn complete_match(
        &mut self,
        mut record: VibeRecord,
        send_commitment: bool,
        failures: &mut Vec<SendError>,
    ) -> Result<VibeRecord, EngineError> {
        record.status = VibeStatus::Matched;
        record.matched_at = Some(Utc::now());
        self.persist(record.clone())?;

        let peer = record.peer_identity.clone();
        let name = display_name(&record);
        info!(peer = peer.short(), vibe_id = %record.id, "vibe matched");
        self.notifier.notify_matched(&peer, &name);

        let vibe_id = record.wire_vibe_id().clone();
        let mut outbound = Vec::with_capacity(2);
        if send_commitment {
            if let Some(commitment) = record.our_commitment {
                outbound.push(VibeMessage::Commitment {
                    vibe_id: vibe_id.clone(),
                    commitment,
                });
            }
        }
        match record.our_secret.clone() {
            Some(secret) => outbound.push(VibeMessage::Reveal { vibe_id, secret }),
            None => warn!(peer = peer.short(), "matched without a local secret, nothing to reveal"),
        }

        for message in &outbound {
            if let Err(e) = deliver(self.transport.as_ref(), &peer, message).await {
                failures.push(e);
            }
        }

        if tiebreak::performs_shared_effect(&self.local, &peer) {
            if let Err(e) = self.announcer.announce_match(&peer, &name).await {
                warn!(peer = peer.short(), error = %e, "failed to open match conversation");
            }
        }

        Ok(record)
    }

    fn persist(&mut self, record: VibeRecord) -> Result<(), EngineError> {
        let id = record.id.clone();
        self.store.upsert(record).map_err(|e| {
            error!(vibe_id = %id, error = %e, "failed to persist vibe record");
            EngineError::Store(e)
        })
    }
}

/// Encode and hand one message to the transport. Failures are logged and
/// returned; nothing is retried here.
async fn deliver(
    transport: &dyn Transport,
    peer: &PeerIdentity,
    message: &VibeMessage,
) -> Result<(), SendError> {
    let frame = message
        .to_frame()
        .map_err(|e| SendError::Encode(e.to_string()))?;

    let result = transport.send_to_peer(peer, frame).await;
    match &result {
        Ok(()) => debug!(peer = peer.short(), kind = message.kind(), "vibe message sent"),
        Err(e) => warn!(
            peer = peer.short(),
            kind = message.kind(),
            error = %e,
            "failed to send vibe message"
        ),
    }
    result
}

fn report(record: &VibeRecord, transition: Transition, send_failures: Vec<SendError>) -> ActionReport {
    ActionReport {
        vibe_id: record.id.clone(),
        status: record.status,
        transition,
        send_failures,
    }
}

fn apply_info(record: &mut VibeRecord, info: PeerInfo) {
    record.peer_display_name = Some(info.display_name);
    record.peer_avatar_ref = info.avatar_ref;
}

fn copy_cosmetics(record: &mut VibeRecord, from: &VibeRecord) {
    record.peer_display_name = from.peer_display_name.clone();
    record.peer_avatar_ref = from.peer_avatar_ref.clone();
}

fn display_name(record: &VibeRecord) -> String {
    record
        .peer_display_name
        .clone()
        .unwrap_or_else(|| PeerInfo::placeholder(&record.peer_identity).display_name)
}
