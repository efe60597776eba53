//! SQLite-backed [`RecordPersistence`] for [`VibeRecord`]s.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};

use vibe_shared::{Commitment, PeerIdentity, Secret, VibeId};

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::{VibeRecord, VibeStatus};
use crate::persistence::RecordPersistence;

const SELECT_COLUMNS: &str = "SELECT id, peer_identity, display_name, avatar_ref, their_vibe_id,
            our_commitment, our_secret, their_commitment, status, created_at, matched_at
     FROM vibes";

impl Database {
    /// Fetch a single record by id.
    pub fn get_vibe(&self, id: &VibeId) -> Result<VibeRecord> {
        self.conn()
            .query_row(
                &format!("{SELECT_COLUMNS} WHERE id = ?1"),
                params![id.as_str()],
                row_to_vibe,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
                other => StoreError::Sqlite(other),
            })
    }

    /// All records for one peer, newest first. Normally at most one is live.
    pub fn get_vibes_for_peer(&self, peer: &PeerIdentity) -> Result<Vec<VibeRecord>> {
        let mut stmt = self.conn().prepare(&format!(
            "{SELECT_COLUMNS} WHERE peer_identity = ?1 ORDER BY created_at DESC"
        ))?;
        let rows = stmt.query_map(params![peer.as_str()], row_to_vibe)?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        Ok(records)
    }
}

impl RecordPersistence for Database {
    fn save_record(&mut self, record: &VibeRecord) -> Result<()> {
        insert_vibe(self.conn(), record)
    }

    fn replace_record(&mut self, old: &VibeId, record: &VibeRecord) -> Result<()> {
        let tx = self.conn_mut().transaction()?;
        tx.execute("DELETE FROM vibes WHERE id = ?1", params![old.as_str()])?;
        insert_vibe(&tx, record)?;
        tx.commit()?;
        Ok(())
    }

    fn delete_record(&mut self, id: &VibeId) -> Result<bool> {
        let affected = self
            .conn()
            .execute("DELETE FROM vibes WHERE id = ?1", params![id.as_str()])?;
        Ok(affected > 0)
    }

    fn list_all_records(&self) -> Result<Vec<VibeRecord>> {
        let mut stmt = self
            .conn()
            .prepare(&format!("{SELECT_COLUMNS} ORDER BY created_at ASC"))?;
        let rows = stmt.query_map([], row_to_vibe)?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        Ok(records)
    }

    fn clear_all(&mut self) -> Result<()> {
        self.conn().execute("DELETE FROM vibes", [])?;
        Ok(())
    }
}

fn insert_vibe(conn: &Connection, record: &VibeRecord) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO vibes (id, peer_identity, display_name, avatar_ref,
            their_vibe_id, our_commitment, our_secret, their_commitment, status,
            created_at, matched_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            record.id.as_str(),
            record.peer_identity.as_str(),
            record.peer_display_name,
            record.peer_avatar_ref,
            record.their_vibe_id.as_ref().map(|v| v.as_str().to_string()),
            record.our_commitment.map(|c| c.to_hex()),
            record.our_secret.as_ref().map(Secret::to_hex),
            record.their_commitment.map(|c| c.to_hex()),
            record.status.as_str(),
            record.created_at.to_rfc3339(),
            record.matched_at.map(|t| t.to_rfc3339()),
        ],
    )?;
    Ok(())
}

fn conversion_err<E>(idx: usize, e: E) -> rusqlite::Error
where
    E: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, e.into())
}

fn parse_ts(idx: usize, s: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_err(idx, e))
}

fn parse_commitment(idx: usize, s: Option<String>) -> rusqlite::Result<Option<Commitment>> {
    s.map(|hex| Commitment::from_hex(&hex).map_err(|e| conversion_err(idx, e)))
        .transpose()
}

fn row_to_vibe(row: &rusqlite::Row<'_>) -> rusqlite::Result<VibeRecord> {
    let id: String = row.get(0)?;
    let peer_str: String = row.get(1)?;
    let peer_display_name: Option<String> = row.get(2)?;
    let peer_avatar_ref: Option<String> = row.get(3)?;
    let their_vibe_id: Option<String> = row.get(4)?;
    let our_commitment: Option<String> = row.get(5)?;
    let our_secret: Option<String> = row.get(6)?;
    let their_commitment: Option<String> = row.get(7)?;
    let status_str: String = row.get(8)?;
    let created_str: String = row.get(9)?;
    let matched_str: Option<String> = row.get(10)?;

    let peer_identity = PeerIdentity::parse(&peer_str).map_err(|e| conversion_err(1, e))?;
    let our_secret = our_secret
        .map(|hex| Secret::from_hex(&hex).map_err(|e| conversion_err(6, e)))
        .transpose()?;
    let status: VibeStatus = status_str.parse().map_err(|e: String| conversion_err(8, e))?;
    let created_at = parse_ts(9, &created_str)?;
    let matched_at = matched_str.map(|s| parse_ts(10, &s)).transpose()?;

    Ok(VibeRecord {
        id: VibeId(id),
        peer_identity,
        peer_display_name,
        peer_avatar_ref,
        their_vibe_id: their_vibe_id.map(VibeId),
        our_commitment: parse_commitment(5, our_commitment)?,
        our_secret,
        their_commitment: parse_commitment(7, their_commitment)?,
        status,
        created_at,
        matched_at,
    })
}
