//! In-memory index over persisted vibe records.

use std::collections::HashMap;

use tracing::{debug, info};

use vibe_shared::{PeerIdentity, VibeId};

use crate::error::Result;
use crate::models::VibeRecord;
use crate::persistence::RecordPersistence;

/// Indexed collection of [`VibeRecord`]s, keyed by id and by peer.
///
/// Every mutation is written through to the persistence backend first; the
/// in-memory index only changes once the backend has accepted the write.
pub struct VibeStore {
    persistence: Box<dyn RecordPersistence>,
    by_id: HashMap<VibeId, VibeRecord>,
    by_peer: HashMap<PeerIdentity, VibeId>,
}

impl VibeStore {
    /// Load every persisted record and build the indexes.
    ///
    /// A peer keeps only its most recently created record; older ones left
    /// behind by earlier versions are deleted from the backend.
    pub fn open(mut persistence: impl RecordPersistence + 'static) -> Result<Self> {
        let mut records = persistence.list_all_records()?;
        records.sort_by_key(|r| r.created_at);

        let mut by_id = HashMap::new();
        let mut by_peer: HashMap<PeerIdentity, VibeId> = HashMap::new();
        for record in records {
            if let Some(older) = by_peer.insert(record.peer_identity.clone(), record.id.clone()) {
                persistence.delete_record(&older)?;
                by_id.remove(&older);
                info!(
                    peer = record.peer_identity.short(),
                    vibe_id = %older,
                    "deleted superseded vibe record"
                );
            }
            by_id.insert(record.id.clone(), record);
        }

        debug!(records = by_id.len(), "vibe store loaded");
        Ok(Self {
            persistence: Box::new(persistence),
            by_id,
            by_peer,
        })
    }

    /// The current record for `peer`, if any.
    pub fn get(&self, peer: &PeerIdentity) -> Option<VibeRecord> {
        self.by_peer
            .get(peer)
            .and_then(|id| self.by_id.get(id))
            .cloned()
    }

    pub fn get_by_id(&self, id: &VibeId) -> Option<VibeRecord> {
        self.by_id.get(id).cloned()
    }

    /// Persist and index `record`, overwriting any record with the same id.
    ///
    /// A different record previously held for the same peer is deleted in
    /// the same backend write. On error nothing changes.
    pub fn upsert(&mut self, record: VibeRecord) -> Result<()> {
        let superseded = self
            .by_peer
            .get(&record.peer_identity)
            .filter(|id| **id != record.id)
            .cloned();

        match superseded {
            Some(old_id) => {
                self.persistence.replace_record(&old_id, &record)?;
                self.by_id.remove(&old_id);
            }
            None => self.persistence.save_record(&record)?,
        }

        self.index(record);
        Ok(())
    }

    /// Delete by id. Returns the removed record.
    pub fn remove_by_id(&mut self, id: &VibeId) -> Result<Option<VibeRecord>> {
        if !self.by_id.contains_key(id) {
            return Ok(None);
        }
        self.persistence.delete_record(id)?;

        let removed = self.by_id.remove(id);
        if let Some(ref record) = removed {
            if self.by_peer.get(&record.peer_identity) == Some(id) {
                self.by_peer.remove(&record.peer_identity);
            }
        }
        Ok(removed)
    }

    pub fn clear_all(&mut self) -> Result<()> {
        self.persistence.clear_all()?;
        self.by_id.clear();
        self.by_peer.clear();
        Ok(())
    }

    /// Every record, in no particular order.
    pub fn list_all(&self) -> Vec<VibeRecord> {
        self.by_id.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    fn index(&mut self, record: VibeRecord) {
        self.by_peer
            .insert(record.peer_identity.clone(), record.id.clone());
        self.by_id.insert(record.id.clone(), record);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryPersistence;
    use crate::models::VibeStatus;
    use crate::Database;
    use chrono::{Duration, Utc};

    fn peer(c: char) -> PeerIdentity {
        PeerIdentity::parse(&c.to_string().repeat(64)).unwrap()
    }

    #[test]
    fn test_upsert_and_get() {
        let mut store = VibeStore::open(MemoryPersistence::new()).unwrap();
        let record = VibeRecord::new(peer('a'), VibeStatus::Pending);
        store.upsert(record.clone()).unwrap();

        assert_eq!(store.get(&peer('a')), Some(record.clone()));
        assert_eq!(store.get_by_id(&record.id), Some(record));
        assert!(store.get(&peer('b')).is_none());
    }

    #[test]
    fn test_new_record_supersedes_old_one_for_peer() {
        let mut store = VibeStore::open(MemoryPersistence::new()).unwrap();
        let skipped = VibeRecord::new(peer('a'), VibeStatus::Skipped);
        store.upsert(skipped.clone()).unwrap();

        let fresh = VibeRecord::new(peer('a'), VibeStatus::Pending);
        store.upsert(fresh.clone()).unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(store.get(&peer('a')).unwrap().id, fresh.id);
        assert!(store.get_by_id(&skipped.id).is_none());
    }

    #[test]
    fn test_failed_write_leaves_index_untouched() {
        let mut backend = MemoryPersistence::new();
        backend.set_fail_writes(true);
        let mut store = VibeStore::open(backend).unwrap();

        let record = VibeRecord::new(peer('a'), VibeStatus::Pending);
        assert!(store.upsert(record).is_err());
        assert!(store.get(&peer('a')).is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn test_remove_and_clear() {
        let mut store = VibeStore::open(MemoryPersistence::new()).unwrap();
        let a = VibeRecord::new(peer('a'), VibeStatus::Matched);
        let b = VibeRecord::new(peer('b'), VibeStatus::Received);
        store.upsert(a.clone()).unwrap();
        store.upsert(b).unwrap();

        assert_eq!(store.remove_by_id(&a.id).unwrap().map(|r| r.id), Some(a.id.clone()));
        assert!(store.remove_by_id(&a.id).unwrap().is_none());
        assert!(store.get(&peer('a')).is_none());
        assert_eq!(store.list_all().len(), 1);

        store.clear_all().unwrap();
        assert!(store.is_empty());
        assert!(store.get(&peer('b')).is_none());
    }

    #[test]
    fn test_failed_replace_keeps_previous_record() {
        let old = VibeRecord::new(peer('a'), VibeStatus::Skipped);
        let mut backend = MemoryPersistence::with_records([old.clone()]);
        backend.set_fail_writes(true);
        let mut store = VibeStore::open(backend).unwrap();

        let fresh = VibeRecord::new(peer('a'), VibeStatus::Pending);
        assert!(store.upsert(fresh.clone()).is_err());
        assert_eq!(store.get(&peer('a')).unwrap().id, old.id);
        assert!(store.get_by_id(&fresh.id).is_none());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_hydration_keeps_one_record_per_peer() {
        let mut old = VibeRecord::new(peer('a'), VibeStatus::Matched);
        old.created_at = Utc::now() - Duration::hours(1);
        let new = VibeRecord::new(peer('a'), VibeStatus::Skipped);

        let mut store =
            VibeStore::open(MemoryPersistence::with_records([new.clone(), old.clone()])).unwrap();
        assert_eq!(store.get(&peer('a')).unwrap().id, new.id);
        assert!(store.get_by_id(&old.id).is_none());
        assert_eq!(store.list_all().len(), 1);

        let pending = VibeRecord::new(peer('a'), VibeStatus::Pending);
        store.upsert(pending.clone()).unwrap();
        let all = store.list_all();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].status, VibeStatus::Pending);
    }

    #[test]
    fn test_hydration_deletes_stale_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vibes.db");

        let mut old = VibeRecord::new(peer('e'), VibeStatus::Matched);
        old.created_at = Utc::now() - Duration::hours(1);
        let new = VibeRecord::new(peer('e'), VibeStatus::Pending);
        {
            let mut db = Database::open_at(&path).unwrap();
            db.save_record(&old).unwrap();
            db.save_record(&new).unwrap();
        }

        let store = VibeStore::open(Database::open_at(&path).unwrap()).unwrap();
        assert_eq!(store.list_all().len(), 1);
        drop(store);

        let db = Database::open_at(&path).unwrap();
        let rows = db.list_all_records().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, new.id);
    }

    #[test]
    fn test_survives_reopen_with_sqlite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vibes.db");

        let record = VibeRecord::new(peer('d'), VibeStatus::Received);
        {
            let mut store = VibeStore::open(Database::open_at(&path).unwrap()).unwrap();
            store.upsert(record.clone()).unwrap();
        }

        let store = VibeStore::open(Database::open_at(&path).unwrap()).unwrap();
        let loaded = store.get(&peer('d')).unwrap();
        assert_eq!(loaded.id, record.id);
        assert_eq!(loaded.status, VibeStatus::Received);
    }
}
