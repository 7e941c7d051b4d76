//! Local resolution cache: recorded owners of files this process has seen
//!
//! Best-effort hint only. It answers "is this identity the recorded owner",
//! never "is this identity granted".

use std::collections::HashMap;

use parking_lot::RwLock;
use serde::Serialize;

use crate::address::Address;
use crate::content::ContentId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct CacheEntry {
    pub owner: Address,
    /// Unix timestamp
    pub recorded_at: u64,
    /// A registry read has agreed with this entry
    pub confirmed: bool,
}

/// Process-lifetime map of file -> recorded owner
#[derive(Default)]
pub struct ResolutionCache {
    entries: RwLock<HashMap<ContentId, CacheEntry>>,
}

impl ResolutionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an owner right after a registration was submitted successfully
    pub fn record_pending(&self, file: &ContentId, owner: &Address) {
        self.entries.write().insert(
            file.clone(),
            CacheEntry {
                owner: *owner,
                recorded_at: crate::unix_now(),
                confirmed: false,
            },
        );
    }

    /// Record an owner the registry reported. Replaces any disagreeing entry.
    pub fn confirm(&self, file: &ContentId, owner: &Address) {
        let mut entries = self.entries.write();
        match entries.get_mut(file) {
            Some(entry) if entry.owner == *owner => entry.confirmed = true,
            Some(entry) => {
                tracing::warn!(
                    file = %file,
                    cached = %entry.owner.short(),
                    registry = %owner.short(),
                    "cached owner disagrees with registry; replacing"
                );
                *entry = CacheEntry {
                    owner: *owner,
                    recorded_at: crate::unix_now(),
                    confirmed: true,
                };
            }
            None => {
                entries.insert(
                    file.clone(),
                    CacheEntry {
                        owner: *owner,
                        recorded_at: crate::unix_now(),
                        confirmed: true,
                    },
                );
            }
        }
    }

    pub fn owner_hint(&self, file: &ContentId) -> Option<CacheEntry> {
        self.entries.read().get(file).copied()
    }

    pub fn is_recorded_owner(&self, file: &ContentId, identity: &Address) -> bool {
        self.entries
            .read()
            .get(file)
            .is_some_and(|entry| entry.owner == *identity)
    }

    pub fn remove(&self, file: &ContentId) -> Option<CacheEntry> {
        self.entries.write().remove(file)
    }

    /// Number of cached files
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Clear all entries
    pub fn clear(&self) {
        self.entries.write().clear();
    }
}
