//! SQLite mirror store

use async_trait::async_trait;
use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, Row, params};

use super::schema::init_schema;
use crate::address::Address;
use crate::content::{ContentId, FileRecord};
use crate::decision::Operation;
use crate::error::{AccessError, AccessResult};
use crate::mirror::{AccessEntry, AccessEvent, AccessType, MirrorStore};

/// SQLite-backed mirror store
pub struct SqliteMirror {
    conn: Mutex<Connection>,
}

impl SqliteMirror {
    /// Open or create a database at the given path
    pub fn open(path: &str) -> AccessResult<Self> {
        let conn = Connection::open(path)?;
        init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory database (for testing)
    pub fn in_memory() -> AccessResult<Self> {
        let conn = Connection::open_in_memory()?;
        init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

fn file_from_row(row: &Row<'_>) -> rusqlite::Result<Option<FileRecord>> {
    let content_id: String = row.get(0)?;
    let uploader: String = row.get(5)?;
    let size: i64 = row.get(2)?;
    let created_at: i64 = row.get(4)?;

    let (Ok(content_id), Some(uploader)) = (ContentId::new(&content_id), Address::parse(&uploader))
    else {
        return Ok(None);
    };

    Ok(Some(FileRecord {
        content_id,
        name: row.get(1)?,
        size: size as u64,
        mime_type: row.get(3)?,
        created_at: created_at as u64,
        uploader,
    }))
}

fn entry_from_row(file: &ContentId, row: &Row<'_>) -> rusqlite::Result<Option<AccessEntry>> {
    let identity: String = row.get(0)?;
    let access_type: String = row.get(1)?;
    let is_active: bool = row.get(2)?;
    let granted_by: Option<String> = row.get(3)?;
    let granted_at: i64 = row.get(4)?;
    let revoked_at: Option<i64> = row.get(5)?;

    let (Some(identity), Some(access_type)) =
        (Address::parse(&identity), AccessType::parse(&access_type))
    else {
        return Ok(None);
    };

    Ok(Some(AccessEntry {
        file: file.clone(),
        identity,
        access_type,
        is_active,
        granted_by: granted_by.as_deref().and_then(Address::parse),
        granted_at: granted_at as u64,
        revoked_at: revoked_at.map(|t| t as u64),
    }))
}

#[async_trait]
impl MirrorStore for SqliteMirror {
    async fn upsert_file(&self, record: &FileRecord) -> AccessResult<()> {
        let conn = self.conn.lock();
        conn.execute(
            r#"INSERT INTO files (content_id, name, size, mime_type, created_at, uploader)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6)
               ON CONFLICT(content_id) DO UPDATE SET
                   name = excluded.name,
                   size = excluded.size,
                   mime_type = excluded.mime_type"#,
            params![
                record.content_id.as_str(),
                record.name,
                record.size as i64,
                record.mime_type,
                record.created_at as i64,
                record.uploader.to_hex(),
            ],
        )?;
        Ok(())
    }

    async fn find_file_by_content_id(&self, file: &ContentId) -> AccessResult<Option<FileRecord>> {
        let conn = self.conn.lock();
        let record = conn
            .query_row(
                r#"SELECT content_id, name, size, mime_type, created_at, uploader
                   FROM files WHERE content_id = ?"#,
                [file.as_str()],
                file_from_row,
            )
            .optional()?
            .flatten();
        Ok(record)
    }

    async fn upsert_entry(
        &self,
        file: &ContentId,
        identity: &Address,
        access_type: AccessType,
        granted_by: Option<&Address>,
    ) -> AccessResult<()> {
        let conn = self.conn.lock();

        let known: i64 = conn.query_row(
            "SELECT COUNT(*) FROM files WHERE content_id = ?",
            [file.as_str()],
            |row| row.get(0),
        )?;
        if known == 0 {
            return Err(AccessError::MirrorWriteFailed(format!(
                "file {file} is not mirrored"
            )));
        }

        // Re-activation resets granted_at; an already active row keeps it
        conn.execute(
            r#"INSERT INTO file_access
                   (file_id, user_address, access_type, is_active, granted_by, granted_at, revoked_at)
               VALUES (?1, ?2, ?3, 1, ?4, ?5, NULL)
               ON CONFLICT(file_id, user_address, access_type) DO UPDATE SET
                   granted_at = CASE WHEN file_access.is_active = 1
                                     THEN file_access.granted_at
                                     ELSE excluded.granted_at END,
                   is_active = 1,
                   revoked_at = NULL,
                   granted_by = COALESCE(excluded.granted_by, file_access.granted_by)"#,
            params![
                file.as_str(),
                identity.to_hex(),
                access_type.as_str(),
                granted_by.map(|a| a.to_hex()),
                crate::unix_now() as i64,
            ],
        )
        .map_err(|e| AccessError::MirrorWriteFailed(e.to_string()))?;

        Ok(())
    }

    async fn deactivate_entry(
        &self,
        file: &ContentId,
        identity: &Address,
        access_type: AccessType,
    ) -> AccessResult<()> {
        let conn = self.conn.lock();
        conn.execute(
            r#"UPDATE file_access SET is_active = 0, revoked_at = ?4
               WHERE file_id = ?1 AND user_address = ?2 AND access_type = ?3 AND is_active = 1"#,
            params![
                file.as_str(),
                identity.to_hex(),
                access_type.as_str(),
                crate::unix_now() as i64,
            ],
        )
        .map_err(|e| AccessError::MirrorWriteFailed(e.to_string()))?;
        Ok(())
    }

    async fn list_entries(&self, file: &ContentId) -> AccessResult<Vec<AccessEntry>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            r#"SELECT user_address, access_type, is_active, granted_by, granted_at, revoked_at
               FROM file_access WHERE file_id = ? ORDER BY id"#,
        )?;

        let entries = stmt
            .query_map([file.as_str()], |row| entry_from_row(file, row))?
            .filter_map(|r| r.ok().flatten())
            .collect();

        Ok(entries)
    }

    async fn list_files_granted_to(&self, identity: &Address) -> AccessResult<Vec<FileRecord>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            r#"SELECT f.content_id, f.name, f.size, f.mime_type, f.created_at, f.uploader
               FROM files f
               WHERE EXISTS (
                   SELECT 1 FROM file_access a
                   WHERE a.file_id = f.content_id AND a.user_address = ?1
                     AND a.is_active = 1 AND a.access_type IN ('grant', 'whitelist'))
               AND NOT EXISTS (
                   SELECT 1 FROM file_access b
                   WHERE b.file_id = f.content_id AND b.user_address = ?1
                     AND b.is_active = 1 AND b.access_type = 'blacklist')
               ORDER BY f.content_id"#,
        )?;

        let files = stmt
            .query_map([identity.to_hex()], file_from_row)?
            .filter_map(|r| r.ok().flatten())
            .collect();

        Ok(files)
    }

    async fn record_access_event(
        &self,
        file: &ContentId,
        identity: &Address,
        operation: Operation,
    ) -> AccessResult<()> {
        let conn = self.conn.lock();
        conn.execute(
            r#"INSERT INTO file_access_history (file_id, user_address, operation, accessed_at)
               VALUES (?1, ?2, ?3, ?4)"#,
            params![
                file.as_str(),
                identity.to_hex(),
                operation.as_str(),
                crate::unix_now() as i64,
            ],
        )
        .map_err(|e| AccessError::MirrorWriteFailed(e.to_string()))?;
        Ok(())
    }

    async fn access_history(&self, file: &ContentId) -> AccessResult<Vec<AccessEvent>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            r#"SELECT user_address, operation, accessed_at
               FROM file_access_history WHERE file_id = ? ORDER BY id"#,
        )?;

        let events = stmt
            .query_map([file.as_str()], |row| {
                let identity: String = row.get(0)?;
                let operation: String = row.get(1)?;
                let accessed_at: i64 = row.get(2)?;
                Ok((identity, operation, accessed_at))
            })?
            .filter_map(|r| r.ok())
            .filter_map(|(identity, operation, accessed_at)| {
                Some(AccessEvent {
                    file: file.clone(),
                    identity: Address::parse(&identity)?,
                    operation: Operation::parse(&operation)?,
                    accessed_at: accessed_at as u64,
                })
            })
            .collect();

        Ok(events)
    }
}
