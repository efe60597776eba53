//! v001 -- Initial schema creation: the `vibes` table.

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS vibes (
    id                TEXT PRIMARY KEY NOT NULL,  -- locally generated vibe id
    peer_identity     TEXT NOT NULL,              -- hex-encoded Ed25519 pubkey
    display_name      TEXT,
    avatar_ref        TEXT,
    their_vibe_id     TEXT,
    our_commitment    TEXT,                       -- hex
    our_secret        TEXT,                       -- hex, never leaves this file
    their_commitment  TEXT,                       -- hex
    status            TEXT NOT NULL,              -- pending | received | matched | skipped
    created_at        TEXT NOT NULL,              -- RFC-3339
    matched_at        TEXT                        -- RFC-3339
);

CREATE INDEX IF NOT EXISTS idx_vibes_peer ON vibes(peer_identity);
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
