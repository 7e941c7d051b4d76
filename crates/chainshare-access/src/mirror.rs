//! Database mirror: relational copy of file metadata and access facts
//!
//! The registry has no reverse index from identity to files, so "shared with
//! me" is answered here. The mirror is an accelerant: it is written after the
//! registry, never blocks or reverses a registry write, and never gates
//! positive access to a registered file.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::content::{ContentId, FileRecord};
use crate::decision::Operation;
use crate::error::AccessResult;

/// Kind of access fact stored per (file, identity)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessType {
    Grant,
    Blacklist,
    Whitelist,
}

impl AccessType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessType::Grant => "grant",
            AccessType::Blacklist => "blacklist",
            AccessType::Whitelist => "whitelist",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "grant" => Some(AccessType::Grant),
            "blacklist" => Some(AccessType::Blacklist),
            "whitelist" => Some(AccessType::Whitelist),
            _ => None,
        }
    }
}

/// One mirrored access fact. Revocation is a soft delete.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessEntry {
    pub file: ContentId,
    pub identity: Address,
    pub access_type: AccessType,
    pub is_active: bool,
    pub granted_by: Option<Address>,
    /// Unix timestamp of the latest activation
    pub granted_at: u64,
    /// Unix timestamp of the revocation while the record is revoked
    pub revoked_at: Option<u64>,
}

/// One logged access to a file
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessEvent {
    pub file: ContentId,
    pub identity: Address,
    pub operation: Operation,
    /// Unix timestamp
    pub accessed_at: u64,
}

#[async_trait]
pub trait MirrorStore: Send + Sync {
    /// Insert or update file metadata, keyed by content id
    async fn upsert_file(&self, record: &FileRecord) -> AccessResult<()>;

    async fn find_file_by_content_id(&self, file: &ContentId) -> AccessResult<Option<FileRecord>>;

    /// Activate the (file, identity, access type) record, creating it if needed
    ///
    /// Fails with `MirrorWriteFailed` if the file is not in the mirror.
    async fn upsert_entry(
        &self,
        file: &ContentId,
        identity: &Address,
        access_type: AccessType,
        granted_by: Option<&Address>,
    ) -> AccessResult<()>;

    /// Soft-delete the record. Absent or already revoked records are a no-op.
    async fn deactivate_entry(
        &self,
        file: &ContentId,
        identity: &Address,
        access_type: AccessType,
    ) -> AccessResult<()>;

    /// All records for a file, active or not
    async fn list_entries(&self, file: &ContentId) -> AccessResult<Vec<AccessEntry>>;

    /// Files the identity holds an active grant or whitelist entry for,
    /// minus files it is actively blacklisted on
    async fn list_files_granted_to(&self, identity: &Address) -> AccessResult<Vec<FileRecord>>;

    async fn record_access_event(
        &self,
        file: &ContentId,
        identity: &Address,
        operation: Operation,
    ) -> AccessResult<()>;

    /// Logged accesses for a file, oldest first
    async fn access_history(&self, file: &ContentId) -> AccessResult<Vec<AccessEvent>>;

    async fn record_grant(
        &self,
        file: &ContentId,
        grantee: &Address,
        granted_by: &Address,
    ) -> AccessResult<()> {
        self.upsert_entry(file, grantee, AccessType::Grant, Some(granted_by))
            .await
    }

    async fn record_revoke(&self, file: &ContentId, grantee: &Address) -> AccessResult<()> {
        self.deactivate_entry(file, grantee, AccessType::Grant).await
    }
}
