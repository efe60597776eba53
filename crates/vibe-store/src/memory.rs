use std::collections::HashMap;

use vibe_shared::VibeId;

use crate::error::{Result, StoreError};
use crate::models::VibeRecord;
use crate::persistence::RecordPersistence;

/// Non-durable backend. Can be told to fail writes, which lets callers
/// exercise their storage-failure paths.
#[derive(Debug, Default)]
pub struct MemoryPersistence {
    records: HashMap<VibeId, VibeRecord>,
    fail_writes: bool,
}

impl MemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a set of already-persisted records.
    pub fn with_records(records: impl IntoIterator<Item = VibeRecord>) -> Self {
        Self {
            records: records.into_iter().map(|r| (r.id.clone(), r)).collect(),
            fail_writes: false,
        }
    }

    pub fn set_fail_writes(&mut self, fail: bool) {
        self.fail_writes = fail;
    }

    fn check_writable(&self) -> Result<()> {
        if self.fail_writes {
            return Err(StoreError::Unavailable("writes disabled".to_string()));
        }
        Ok(())
    }
}

impl RecordPersistence for MemoryPersistence {
    fn save_record(&mut self, record: &VibeRecord) -> Result<()> {
        self.check_writable()?;
        self.records.insert(record.id.clone(), record.clone());
        Ok(())
    }

    fn replace_record(&mut self, old: &VibeId, record: &VibeRecord) -> Result<()> {
        self.check_writable()?;
        self.records.remove(old);
        self.records.insert(record.id.clone(), record.clone());
        Ok(())
    }

    fn delete_record(&mut self, id: &VibeId) -> Result<bool> {
        self.check_writable()?;
        Ok(self.records.remove(id).is_some())
    }

    fn list_all_records(&self) -> Result<Vec<VibeRecord>> {
        Ok(self.records.values().cloned().collect())
    }

    fn clear_all(&mut self) -> Result<()> {
        self.check_writable()?;
        self.records.clear();
        Ok(())
    }
}
