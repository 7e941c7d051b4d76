//! Sources of truth consulted by the resolver, in priority order

use std::sync::Arc;

use async_trait::async_trait;

use crate::address::Address;
use crate::cache::ResolutionCache;
use crate::content::ContentId;
use crate::decision::GrantFacts;
use crate::error::AccessResult;
use crate::registry::RegistryClient;

/// What a source knows about a file's owner
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OwnerLookup {
    /// The source has no opinion
    Unknown,
    Unregistered,
    Owned(Address),
}

#[async_trait]
pub trait SourceOfTruth: Send + Sync {
    fn name(&self) -> &'static str;

    async fn try_resolve_owner(&self, file: &ContentId) -> AccessResult<OwnerLookup>;

    /// Grant facts for `requester`, or `None` if this source cannot vouch for grants
    async fn try_resolve_grants(
        &self,
        file: &ContentId,
        requester: &Address,
    ) -> AccessResult<Option<GrantFacts>>;
}

/// The registry contract: authoritative when reachable
pub struct RegistrySource {
    client: RegistryClient,
}

impl RegistrySource {
    pub fn new(client: RegistryClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SourceOfTruth for RegistrySource {
    fn name(&self) -> &'static str {
        "registry"
    }

    async fn try_resolve_owner(&self, file: &ContentId) -> AccessResult<OwnerLookup> {
        Ok(match self.client.get_owner(file).await? {
            Some(owner) => OwnerLookup::Owned(owner),
            None => OwnerLookup::Unregistered,
        })
    }

    async fn try_resolve_grants(
        &self,
        file: &ContentId,
        requester: &Address,
    ) -> AccessResult<Option<GrantFacts>> {
        let whitelist_mode = self.client.is_whitelist_mode_on(file).await?;
        let listed = if whitelist_mode {
            self.client.get_whitelisted(file).await?.contains(requester)
        } else {
            self.client.get_granted_identities(file).await?.contains(requester)
        };
        let blacklisted = self.client.get_blacklisted(file).await?.contains(requester);

        Ok(Some(GrantFacts {
            whitelist_mode,
            listed,
            blacklisted,
        }))
    }
}

/// The local cache: owner-only fallback
pub struct CacheSource {
    cache: Arc<ResolutionCache>,
}

impl CacheSource {
    pub fn new(cache: Arc<ResolutionCache>) -> Self {
        Self { cache }
    }
}

#[async_trait]
impl SourceOfTruth for CacheSource {
    fn name(&self) -> &'static str {
        "cache"
    }

    async fn try_resolve_owner(&self, file: &ContentId) -> AccessResult<OwnerLookup> {
        Ok(match self.cache.owner_hint(file) {
            Some(entry) => OwnerLookup::Owned(entry.owner),
            None => OwnerLookup::Unknown,
        })
    }

    async fn try_resolve_grants(
        &self,
        _file: &ContentId,
        _requester: &Address,
    ) -> AccessResult<Option<GrantFacts>> {
        Ok(None)
    }
}
