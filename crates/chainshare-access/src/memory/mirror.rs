//! In-memory mirror store

use std::collections::{BTreeMap, BTreeSet, HashMap};

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::address::Address;
use crate::content::{ContentId, FileRecord};
use crate::decision::Operation;
use crate::error::{AccessError, AccessResult};
use crate::mirror::{AccessEntry, AccessEvent, AccessType, MirrorStore};

type EntryKey = (ContentId, Address, AccessType);

/// In-memory mirror for tests and single-process runs
#[derive(Default)]
pub struct InMemoryMirror {
    /// content id -> metadata
    files: RwLock<HashMap<ContentId, FileRecord>>,
    /// (file, identity, access type) -> entry
    entries: RwLock<BTreeMap<EntryKey, AccessEntry>>,
    history: RwLock<Vec<AccessEvent>>,
}

impl InMemoryMirror {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of mirrored files
    pub fn file_count(&self) -> usize {
        self.files.read().len()
    }

    /// Number of active entries of any type
    pub fn active_entry_count(&self) -> usize {
        self.entries.read().values().filter(|e| e.is_active).count()
    }

    /// Clear all data
    pub fn clear(&self) {
        self.files.write().clear();
        self.entries.write().clear();
        self.history.write().clear();
    }
}

#[async_trait]
impl MirrorStore for InMemoryMirror {
    async fn upsert_file(&self, record: &FileRecord) -> AccessResult<()> {
        self.files
            .write()
            .insert(record.content_id.clone(), record.clone());
        Ok(())
    }

    async fn find_file_by_content_id(&self, file: &ContentId) -> AccessResult<Option<FileRecord>> {
        Ok(self.files.read().get(file).cloned())
    }

    async fn upsert_entry(
        &self,
        file: &ContentId,
        identity: &Address,
        access_type: AccessType,
        granted_by: Option<&Address>,
    ) -> AccessResult<()> {
        if !self.files.read().contains_key(file) {
            return Err(AccessError::MirrorWriteFailed(format!(
                "file {file} is not mirrored"
            )));
        }

        let now = crate::unix_now();
        let key = (file.clone(), *identity, access_type);
        let mut entries = self.entries.write();
        let entry = entries.entry(key).or_insert_with(|| AccessEntry {
            file: file.clone(),
            identity: *identity,
            access_type,
            is_active: false,
            granted_by: None,
            granted_at: now,
            revoked_at: None,
        });

        // Already active: keep the original grant time
        if !entry.is_active {
            entry.is_active = true;
            entry.granted_at = now;
            entry.revoked_at = None;
        }
        entry.granted_by = granted_by.copied().or(entry.granted_by);
        Ok(())
    }

    async fn deactivate_entry(
        &self,
        file: &ContentId,
        identity: &Address,
        access_type: AccessType,
    ) -> AccessResult<()> {
        let key = (file.clone(), *identity, access_type);
        if let Some(entry) = self.entries.write().get_mut(&key) {
            if entry.is_active {
                entry.is_active = false;
                entry.revoked_at = Some(crate::unix_now());
            }
        }
        Ok(())
    }

    async fn list_entries(&self, file: &ContentId) -> AccessResult<Vec<AccessEntry>> {
        Ok(self
            .entries
            .read()
            .values()
            .filter(|e| e.file == *file)
            .cloned()
            .collect())
    }

    async fn list_files_granted_to(&self, identity: &Address) -> AccessResult<Vec<FileRecord>> {
        let entries = self.entries.read();
        let mut allowed: BTreeSet<&ContentId> = BTreeSet::new();
        let mut blocked: BTreeSet<&ContentId> = BTreeSet::new();

        for entry in entries.values() {
            if entry.identity != *identity || !entry.is_active {
                continue;
            }
            match entry.access_type {
                AccessType::Grant | AccessType::Whitelist => allowed.insert(&entry.file),
                AccessType::Blacklist => blocked.insert(&entry.file),
            };
        }

        let files = self.files.read();
        Ok(allowed
            .difference(&blocked)
            .filter_map(|cid| files.get(*cid).cloned())
            .collect())
    }

    async fn record_access_event(
        &self,
        file: &ContentId,
        identity: &Address,
        operation: Operation,
    ) -> AccessResult<()> {
        self.history.write().push(AccessEvent {
            file: file.clone(),
            identity: *identity,
            operation,
            accessed_at: crate::unix_now(),
        });
        Ok(())
    }

    async fn access_history(&self, file: &ContentId) -> AccessResult<Vec<AccessEvent>> {
        Ok(self
            .history
            .read()
            .iter()
            .filter(|e| e.file == *file)
            .cloned()
            .collect())
    }
}
