//! Per-session access context
//!
//! Built once per connection and handed to whoever needs to check or change
//! access. Owns the registry client, the resolution cache and the mirror; no
//! state lives in globals.
//!
//! Writes go to the registry first. Mirror writes follow on a best-effort
//! basis: a mirror failure is logged and swallowed, and never rolls back a
//! mined registry transaction. Writes are not serialised here; two sessions
//! writing the same file race at the contract and the last one wins.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::Serialize;

use crate::address::Address;
use crate::cache::ResolutionCache;
use crate::content::{ContentId, FileRecord};
use crate::decision::{AccessDecision, DecisionReason, Operation};
use crate::error::AccessResult;
use crate::mirror::{AccessType, MirrorStore};
use crate::registry::{ContractTransport, RegistrationReceipt, RegistryClient, TxReceipt};
use crate::resolver::AccessResolver;
use crate::source::{CacheSource, RegistrySource};

/// Registry view of one file, as shown in a share panel
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FilePermissions {
    pub file: ContentId,
    pub owner: Option<Address>,
    pub viewer_is_owner: bool,
    pub granted: BTreeSet<Address>,
    pub blacklisted: BTreeSet<Address>,
    pub whitelisted: BTreeSet<Address>,
    pub whitelist_mode: bool,
}

/// How a live registry check relates to a mirrored share
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Corroboration {
    /// The registry currently allows the identity
    Confirmed,
    /// The registry currently denies the identity
    Contradicted,
    /// The registry could not be asked
    Unverified,
}

#[derive(Clone, Debug, Serialize)]
pub struct SharedFile {
    pub record: FileRecord,
    pub corroboration: Corroboration,
}

pub struct AccessContext {
    registry: RegistryClient,
    cache: Arc<ResolutionCache>,
    mirror: Arc<dyn MirrorStore>,
    resolver: AccessResolver,
}

impl AccessContext {
    pub fn new(
        transport: Arc<dyn ContractTransport>,
        mirror: Arc<dyn MirrorStore>,
        cache: Arc<ResolutionCache>,
    ) -> Self {
        let registry = RegistryClient::new(transport);
        let resolver = AccessResolver::new(
            Arc::new(RegistrySource::new(registry.clone())),
            Arc::new(CacheSource::new(cache.clone())),
            cache.clone(),
        );
        Self {
            registry,
            cache,
            mirror,
            resolver,
        }
    }

    pub fn registry(&self) -> &RegistryClient {
        &self.registry
    }

    pub fn cache(&self) -> &ResolutionCache {
        &self.cache
    }

    pub fn mirror(&self) -> &dyn MirrorStore {
        self.mirror.as_ref()
    }

    pub fn resolver(&self) -> &AccessResolver {
        &self.resolver
    }

    // Resolution

    pub async fn resolve(
        &self,
        file: &ContentId,
        requester: &Address,
        operation: Operation,
    ) -> AccessResult<AccessDecision> {
        self.resolver.resolve(file, requester, operation).await
    }

    pub async fn resolve_or_deny(
        &self,
        file: &ContentId,
        requester: &Address,
        operation: Operation,
    ) -> AccessDecision {
        self.resolver.resolve_or_deny(file, requester, operation).await
    }

    pub async fn resolve_many(
        &self,
        files: &[ContentId],
        requester: &Address,
        operation: Operation,
    ) -> Vec<(ContentId, AccessResult<AccessDecision>)> {
        self.resolver.resolve_many(files, requester, operation).await
    }

    // Writes

    /// Record upload metadata in the mirror
    pub async fn record_file(&self, record: &FileRecord) -> AccessResult<()> {
        self.mirror.upsert_file(record).await?;
        tracing::info!(
            file = %record.content_id,
            uploader = %record.uploader.short(),
            "recorded upload"
        );
        Ok(())
    }

    /// Register `file` with `as_identity` as its owner.
    ///
    /// On success the cache records the owner as pending until a registry
    /// read confirms it.
    pub async fn register_file(
        &self,
        file: &ContentId,
        as_identity: &Address,
    ) -> AccessResult<RegistrationReceipt> {
        let receipt = self.registry.register_file(file, as_identity).await?;
        self.cache.record_pending(file, as_identity);
        Ok(receipt)
    }

    /// Always `NotSupported`: the contract cannot unregister files
    pub async fn unregister_file(
        &self,
        file: &ContentId,
        as_identity: &Address,
    ) -> AccessResult<TxReceipt> {
        self.registry.unregister_file(file, as_identity).await
    }

    pub async fn grant_access(
        &self,
        file: &ContentId,
        grantee: &Address,
        as_identity: &Address,
    ) -> AccessResult<TxReceipt> {
        let receipt = self.registry.grant_access(file, grantee, as_identity).await?;
        let mirrored = self.mirror.record_grant(file, grantee, as_identity).await;
        self.swallow_mirror_failure(file, grantee, AccessType::Grant, mirrored);
        Ok(receipt)
    }

    pub async fn revoke_access(
        &self,
        file: &ContentId,
        grantee: &Address,
        as_identity: &Address,
    ) -> AccessResult<TxReceipt> {
        let receipt = self.registry.revoke_access(file, grantee, as_identity).await?;
        let mirrored = self.mirror.record_revoke(file, grantee).await;
        self.swallow_mirror_failure(file, grantee, AccessType::Grant, mirrored);
        Ok(receipt)
    }

    pub async fn add_to_blacklist(
        &self,
        file: &ContentId,
        identity: &Address,
        as_identity: &Address,
    ) -> AccessResult<TxReceipt> {
        let receipt = self
            .registry
            .add_to_blacklist(file, identity, as_identity)
            .await?;
        self.mirror_entry(file, identity, AccessType::Blacklist, Some(as_identity))
            .await;
        Ok(receipt)
    }

    pub async fn remove_from_blacklist(
        &self,
        file: &ContentId,
        identity: &Address,
        as_identity: &Address,
    ) -> AccessResult<TxReceipt> {
        let receipt = self
            .registry
            .remove_from_blacklist(file, identity, as_identity)
            .await?;
        self.mirror_entry(file, identity, AccessType::Blacklist, None)
            .await;
        Ok(receipt)
    }

    pub async fn add_to_whitelist(
        &self,
        file: &ContentId,
        identity: &Address,
        as_identity: &Address,
    ) -> AccessResult<TxReceipt> {
        let receipt = self
            .registry
            .add_to_whitelist(file, identity, as_identity)
            .await?;
        self.mirror_entry(file, identity, AccessType::Whitelist, Some(as_identity))
            .await;
        Ok(receipt)
    }

    pub async fn remove_from_whitelist(
        &self,
        file: &ContentId,
        identity: &Address,
        as_identity: &Address,
    ) -> AccessResult<TxReceipt> {
        let receipt = self
            .registry
            .remove_from_whitelist(file, identity, as_identity)
            .await?;
        self.mirror_entry(file, identity, AccessType::Whitelist, None)
            .await;
        Ok(receipt)
    }

    pub async fn toggle_whitelist_mode(
        &self,
        file: &ContentId,
        as_identity: &Address,
    ) -> AccessResult<TxReceipt> {
        self.registry.toggle_whitelist_mode(file, as_identity).await
    }

    // Queries

    /// Everything a share panel shows for `file`, read concurrently
    pub async fn file_permissions(
        &self,
        file: &ContentId,
        viewer: Option<&Address>,
    ) -> AccessResult<FilePermissions> {
        let (owner, granted, blacklisted, whitelisted, whitelist_mode) = futures::try_join!(
            self.registry.get_owner(file),
            self.registry.get_granted_identities(file),
            self.registry.get_blacklisted(file),
            self.registry.get_whitelisted(file),
            self.registry.is_whitelist_mode_on(file),
        )?;

        if let Some(owner) = owner {
            self.cache.confirm(file, &owner);
        }

        Ok(FilePermissions {
            file: file.clone(),
            owner,
            viewer_is_owner: matches!((owner, viewer), (Some(o), Some(v)) if o == *v),
            granted,
            blacklisted,
            whitelisted,
            whitelist_mode,
        })
    }

    /// Files shared with `identity`, from the mirror.
    ///
    /// Each candidate is checked against the registry to label it, but the
    /// check never removes a file from the list.
    pub async fn shared_with(&self, identity: &Address) -> AccessResult<Vec<SharedFile>> {
        let candidates = self.mirror.list_files_granted_to(identity).await?;
        let ids: Vec<ContentId> = candidates.iter().map(|r| r.content_id.clone()).collect();
        let checks = self.resolver.resolve_many(&ids, identity, Operation::View).await;

        Ok(candidates
            .into_iter()
            .zip(checks)
            .map(|(record, (_, check))| {
                let corroboration = match check {
                    Ok(decision) if decision.allowed => Corroboration::Confirmed,
                    Ok(decision) if decision.reason == DecisionReason::RegistryError => {
                        Corroboration::Unverified
                    }
                    Ok(_) => Corroboration::Contradicted,
                    Err(_) => Corroboration::Unverified,
                };
                SharedFile {
                    record,
                    corroboration,
                }
            })
            .collect())
    }

    /// Log an access to `file`. Best-effort.
    pub async fn record_access(&self, file: &ContentId, identity: &Address, operation: Operation) {
        if let Err(e) = self
            .mirror
            .record_access_event(file, identity, operation)
            .await
        {
            tracing::warn!(file = %file, error = %e, "failed to log file access");
        }
    }

    async fn mirror_entry(
        &self,
        file: &ContentId,
        identity: &Address,
        access_type: AccessType,
        activate_by: Option<&Address>,
    ) {
        let mirrored = match activate_by {
            Some(by) => {
                self.mirror
                    .upsert_entry(file, identity, access_type, Some(by))
                    .await
            }
            None => self.mirror.deactivate_entry(file, identity, access_type).await,
        };
        self.swallow_mirror_failure(file, identity, access_type, mirrored);
    }

    fn swallow_mirror_failure(
        &self,
        file: &ContentId,
        identity: &Address,
        access_type: AccessType,
        result: AccessResult<()>,
    ) {
        if let Err(e) = result {
            tracing::warn!(
                file = %file,
                identity = %identity.short(),
                access_type = access_type.as_str(),
                error = %e,
                "registry write succeeded but mirror write failed"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AccessError;
    use crate::memory::InMemoryMirror;
    use crate::registry::SimulatedContract;

    fn addr(n: u8) -> Address {
        Address::from_bytes([n; 20])
    }

    fn setup() -> (Arc<SimulatedContract>, Arc<InMemoryMirror>, AccessContext) {
        let contract = Arc::new(SimulatedContract::new());
        let mirror = Arc::new(InMemoryMirror::new());
        let ctx = AccessContext::new(
            contract.clone(),
            mirror.clone(),
            Arc::new(ResolutionCache::new()),
        );
        (contract, mirror, ctx)
    }

    #[tokio::test]
    async fn test_register_records_pending_owner() {
        let (_, _, ctx) = setup();
        let file = ContentId::new("QmA").unwrap();

        ctx.register_file(&file, &addr(1)).await.unwrap();

        let entry = ctx.cache().owner_hint(&file).unwrap();
        assert_eq!(entry.owner, addr(1));
        assert!(!entry.confirmed);
    }

    #[tokio::test]
    async fn test_failed_register_leaves_cache_alone() {
        let (_, _, ctx) = setup();
        let file = ContentId::new("QmA").unwrap();

        ctx.register_file(&file, &addr(1)).await.unwrap();
        ctx.cache().clear();

        let err = ctx.register_file(&file, &addr(2)).await.unwrap_err();
        assert!(matches!(err, AccessError::AlreadyRegistered(_)));
        assert!(ctx.cache().is_empty());
    }

    #[tokio::test]
    async fn test_mirror_failure_does_not_fail_grant() {
        let (_, mirror, ctx) = setup();
        let file = ContentId::new("QmA").unwrap();

        // Not mirrored, so the mirror write fails
        ctx.register_file(&file, &addr(1)).await.unwrap();
        ctx.grant_access(&file, &addr(2), &addr(1)).await.unwrap();

        assert_eq!(mirror.active_entry_count(), 0);
        let decision = ctx.resolve(&file, &addr(2), Operation::View).await.unwrap();
        assert!(decision.allowed);
        assert_eq!(decision.reason, DecisionReason::Granted);
    }

    #[tokio::test]
    async fn test_registry_failure_skips_mirror() {
        let (_, mirror, ctx) = setup();
        let file = ContentId::new("QmA").unwrap();
        ctx.record_file(&FileRecord::new(file.clone(), "a.txt", 1, "text/plain", addr(1)))
            .await
            .unwrap();
        ctx.register_file(&file, &addr(1)).await.unwrap();

        let err = ctx.grant_access(&file, &addr(2), &addr(3)).await.unwrap_err();
        assert!(matches!(err, AccessError::Reverted(_)));
        assert_eq!(mirror.active_entry_count(), 0);
    }

    #[tokio::test]
    async fn test_record_file_mirrors_upload() {
        let (_, mirror, ctx) = setup();
        let file = ContentId::new("QmA").unwrap();
        ctx.record_file(&FileRecord::new(file.clone(), "a.txt", 1, "text/plain", addr(1)))
            .await
            .unwrap();

        let record = mirror.find_file_by_content_id(&file).await.unwrap().unwrap();
        assert_eq!(record.uploader, addr(1));
    }

    #[cfg(feature = "sqlite")]
    #[tokio::test]
    async fn test_record_file_returns_mirror_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mirror.db");
        let path = path.to_str().unwrap();
        let mirror = Arc::new(crate::sqlite::SqliteMirror::open(path).unwrap());
        rusqlite::Connection::open(path)
            .unwrap()
            .execute_batch("DROP TABLE files")
            .unwrap();

        let ctx = AccessContext::new(
            Arc::new(SimulatedContract::new()),
            mirror,
            Arc::new(ResolutionCache::new()),
        );
        let file = ContentId::new("QmA").unwrap();
        let err = ctx
            .record_file(&FileRecord::new(file, "a.txt", 1, "text/plain", addr(1)))
            .await
            .unwrap_err();
        assert!(matches!(err, AccessError::Database(_)));
    }

    #[tokio::test]
    async fn test_file_permissions_snapshot() {
        let (_, _, ctx) = setup();
        let file = ContentId::new("QmA").unwrap();
        ctx.register_file(&file, &addr(1)).await.unwrap();
        ctx.grant_access(&file, &addr(2), &addr(1)).await.unwrap();
        ctx.add_to_blacklist(&file, &addr(3), &addr(1)).await.unwrap();
        ctx.add_to_whitelist(&file, &addr(4), &addr(1)).await.unwrap();
        ctx.toggle_whitelist_mode(&file, &addr(1)).await.unwrap();

        let perms = ctx.file_permissions(&file, Some(&addr(1))).await.unwrap();
        assert_eq!(perms.owner, Some(addr(1)));
        assert!(perms.viewer_is_owner);
        assert!(perms.granted.contains(&addr(2)));
        assert!(perms.blacklisted.contains(&addr(3)));
        assert!(perms.whitelisted.contains(&addr(4)));
        assert!(perms.whitelist_mode);

        let other = ctx.file_permissions(&file, Some(&addr(2))).await.unwrap();
        assert!(!other.viewer_is_owner);
    }

    #[tokio::test]
    async fn test_unregister_not_supported() {
        let (_, _, ctx) = setup();
        let err = ctx
            .unregister_file(&ContentId::new("QmA").unwrap(), &addr(1))
            .await
            .unwrap_err();
        assert!(matches!(err, AccessError::NotSupported(_)));
    }
}
