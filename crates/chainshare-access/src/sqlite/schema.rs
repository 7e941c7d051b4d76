//! SQLite schema definitions

use crate::error::AccessResult;
use rusqlite::Connection;

pub const SCHEMA_VERSION: u32 = 1;

/// Initialize the database schema
pub fn init_schema(conn: &Connection) -> AccessResult<()> {
    conn.execute_batch(
        r#"
        PRAGMA foreign_keys = ON;

        -- Schema version tracking
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );

        -- Uploaded file metadata
        CREATE TABLE IF NOT EXISTS files (
            content_id TEXT PRIMARY KEY,           -- CID
            name TEXT NOT NULL,
            size INTEGER NOT NULL,
            mime_type TEXT NOT NULL,
            created_at INTEGER NOT NULL,           -- Unix timestamp
            uploader TEXT NOT NULL                 -- 0x-prefixed lowercase hex
        );

        CREATE INDEX IF NOT EXISTS idx_files_uploader
            ON files(uploader);

        -- Mirrored grants, blacklist and whitelist entries
        CREATE TABLE IF NOT EXISTS file_access (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            file_id TEXT NOT NULL REFERENCES files(content_id),
            user_address TEXT NOT NULL,
            access_type TEXT NOT NULL,             -- grant | blacklist | whitelist
            is_active INTEGER NOT NULL DEFAULT 1,
            granted_by TEXT,
            granted_at INTEGER NOT NULL,
            revoked_at INTEGER,                    -- set while revoked
            UNIQUE(file_id, user_address, access_type)
        );

        CREATE INDEX IF NOT EXISTS idx_access_file
            ON file_access(file_id);
        CREATE INDEX IF NOT EXISTS idx_access_user
            ON file_access(user_address, is_active);

        -- Access log
        CREATE TABLE IF NOT EXISTS file_access_history (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            file_id TEXT NOT NULL,
            user_address TEXT NOT NULL,
            operation TEXT NOT NULL,
            accessed_at INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_history_file
            ON file_access_history(file_id);
    "#,
    )?;

    conn.execute(
        "INSERT OR REPLACE INTO schema_version (version) VALUES (?)",
        [SCHEMA_VERSION],
    )?;

    Ok(())
}

/// Check schema version
pub fn check_version(conn: &Connection) -> AccessResult<u32> {
    let version: u32 = conn
        .query_row("SELECT MAX(version) FROM schema_version", [], |row| {
            row.get::<_, Option<u32>>(0)
        })?
        .unwrap_or(0);
    Ok(version)
}
