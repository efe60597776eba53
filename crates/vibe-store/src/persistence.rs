//! The durability seam behind [`VibeStore`](crate::VibeStore).

use vibe_shared::VibeId;

use crate::error::Result;
use crate::models::VibeRecord;

/// Durable storage of vibe records keyed by record id.
///
/// Implementations hold no business rules; a failed call must leave the
/// stored data as it was before the call.
pub trait RecordPersistence: Send {
    /// Insert or overwrite the record with the same id.
    fn save_record(&mut self, record: &VibeRecord) -> Result<()>;

    /// Delete `old` and save `record` as one atomic step: after an error
    /// neither change is visible.
    fn replace_record(&mut self, old: &VibeId, record: &VibeRecord) -> Result<()>;

    /// Delete by id. Returns whether a row existed.
    fn delete_record(&mut self, id: &VibeId) -> Result<bool>;

    fn list_all_records(&self) -> Result<Vec<VibeRecord>>;

    fn clear_all(&mut self) -> Result<()>;
}
