//! Access resolution engine
//!
//! Combines the registry (authoritative), the local cache (owner-only
//! fallback) and the pure policy in [`crate::decision::decide`] into one
//! decision per (file, identity, operation).
//!
//! Order of reads for a single file is fixed: owner first, then the grant
//! facts if the requester is not the owner. Denial is a normal return value;
//! only "no source could tell us the owner" is an error.

use std::sync::Arc;

use futures::future::join_all;

use crate::address::Address;
use crate::cache::ResolutionCache;
use crate::content::ContentId;
use crate::decision::{
    AccessDecision, DecisionReason, Operation, OwnerSource, RegistrationState, decide,
};
use crate::error::{AccessError, AccessResult};
use crate::source::{OwnerLookup, SourceOfTruth};

pub struct AccessResolver {
    primary: Arc<dyn SourceOfTruth>,
    fallback: Arc<dyn SourceOfTruth>,
    cache: Arc<ResolutionCache>,
}

impl AccessResolver {
    pub fn new(
        primary: Arc<dyn SourceOfTruth>,
        fallback: Arc<dyn SourceOfTruth>,
        cache: Arc<ResolutionCache>,
    ) -> Self {
        Self {
            primary,
            fallback,
            cache,
        }
    }

    /// Decide whether `requester` may perform `operation` on `file`.
    ///
    /// Returns `Err(RegistryUnavailable)` only when the primary source failed
    /// and the fallback had no owner for the file.
    pub async fn resolve(
        &self,
        file: &ContentId,
        requester: &Address,
        operation: Operation,
    ) -> AccessResult<AccessDecision> {
        let (state, source) = self.resolve_state(file).await?;

        let Some(owner) = state.owner() else {
            tracing::debug!(file = %file, "file is unregistered; no access control");
            return Ok(match operation {
                Operation::ManageSharing => {
                    AccessDecision::deny(DecisionReason::Unregistered, state, source)
                }
                _ => AccessDecision::allow(DecisionReason::Unregistered, state, source),
            });
        };

        let facts = if *requester == owner || operation == Operation::ManageSharing {
            None
        } else {
            match self.primary.try_resolve_grants(file, requester).await {
                Ok(facts) => facts,
                Err(e) => {
                    tracing::warn!(
                        file = %file,
                        source = self.primary.name(),
                        error = %e,
                        "grant read failed; denying"
                    );
                    None
                }
            }
        };

        let (allowed, reason) = decide(owner, *requester, operation, facts);
        tracing::debug!(
            file = %file,
            requester = %requester.short(),
            operation = operation.as_str(),
            allowed,
            ?reason,
            "access resolved"
        );

        Ok(if allowed {
            AccessDecision::allow(reason, state, source)
        } else {
            AccessDecision::deny(reason, state, source)
        })
    }

    /// Like [`resolve`](Self::resolve), but infrastructure failures become a
    /// denial. Use this for gating.
    pub async fn resolve_or_deny(
        &self,
        file: &ContentId,
        requester: &Address,
        operation: Operation,
    ) -> AccessDecision {
        match self.resolve(file, requester, operation).await {
            Ok(decision) => decision,
            Err(e) => {
                tracing::warn!(file = %file, error = %e, "access state unknown; denying");
                AccessDecision::deny(
                    DecisionReason::RegistryError,
                    RegistrationState::Unknown,
                    OwnerSource::Registry,
                )
            }
        }
    }

    /// Resolve a list of files concurrently. Output order matches input order.
    pub async fn resolve_many(
        &self,
        files: &[ContentId],
        requester: &Address,
        operation: Operation,
    ) -> Vec<(ContentId, AccessResult<AccessDecision>)> {
        let checks = files
            .iter()
            .map(|file| async move { (file.clone(), self.resolve(file, requester, operation).await) });
        join_all(checks).await
    }

    /// Registration state of `file`, and where the owner came from
    pub async fn resolve_state(
        &self,
        file: &ContentId,
    ) -> AccessResult<(RegistrationState, OwnerSource)> {
        match self.primary.try_resolve_owner(file).await {
            Ok(OwnerLookup::Owned(owner)) => {
                self.cache.confirm(file, &owner);
                Ok((RegistrationState::Registered { owner }, OwnerSource::Registry))
            }
            Ok(OwnerLookup::Unregistered | OwnerLookup::Unknown) => {
                // A recent registration may not be visible to reads yet
                Ok(match self.cache.owner_hint(file) {
                    Some(entry) if entry.confirmed => (
                        RegistrationState::Registered { owner: entry.owner },
                        OwnerSource::Cache,
                    ),
                    Some(entry) => (
                        RegistrationState::Pending { owner: entry.owner },
                        OwnerSource::Cache,
                    ),
                    None => (RegistrationState::Unregistered, OwnerSource::Registry),
                })
            }
            Err(primary_err) => {
                tracing::warn!(
                    file = %file,
                    source = self.primary.name(),
                    error = %primary_err,
                    "owner read failed; trying {}",
                    self.fallback.name()
                );
                match self.fallback.try_resolve_owner(file).await {
                    Ok(OwnerLookup::Owned(owner)) => {
                        let state = match self.cache.owner_hint(file) {
                            Some(entry) if entry.owner == owner && !entry.confirmed => {
                                RegistrationState::Pending { owner }
                            }
                            _ => RegistrationState::Registered { owner },
                        };
                        Ok((state, OwnerSource::Cache))
                    }
                    Ok(_) => Err(primary_err),
                    Err(fallback_err) => Err(AccessError::RegistryUnavailable(format!(
                        "{primary_err}; fallback: {fallback_err}"
                    ))),
                }
            }
        }
    }
}
