//! chainshare-access: Access-control resolution for registry-governed file sharing
//!
//! Answers "may this identity perform this operation on this file right
//! now?" by combining an on-chain access registry, a local resolution cache
//! that masks registry read lag, and an off-chain mirror of grants used for
//! discovery.
//!
//! The registry is authoritative. The mirror never grants or denies anything.
//!
//! ## Features
//!
//! | Feature  | Description                    |
//! |----------|--------------------------------|
//! | (none)   | In-memory mirror only          |
//! | `sqlite` | SQLite mirror (default)        |
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use chainshare_access::{
//!     AccessContext, ContentId, InMemoryMirror, Operation, ResolutionCache,
//!     SimulatedContract,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let ctx = AccessContext::new(
//!         Arc::new(SimulatedContract::new()),
//!         Arc::new(InMemoryMirror::new()),
//!         Arc::new(ResolutionCache::new()),
//!     );
//!
//!     let file = ContentId::new("QmExample")?;
//!     ctx.register_file(&file, &owner).await?;
//!     ctx.grant_access(&file, &friend, &owner).await?;
//!
//!     let decision = ctx.resolve(&file, &friend, Operation::Download).await?;
//!     assert!(decision.allowed);
//!
//!     Ok(())
//! }
//! ```

mod address;
mod cache;
mod content;
mod context;
mod decision;
mod error;
mod mirror;
mod resolver;
mod source;

pub mod memory;
pub mod registry;

#[cfg(feature = "sqlite")]
pub mod sqlite;

// Re-exports
pub use address::Address;
pub use cache::{CacheEntry, ResolutionCache};
pub use content::{ContentId, FileRecord};
pub use context::{AccessContext, Corroboration, FilePermissions, SharedFile};
pub use decision::{
    AccessDecision, DecisionReason, GrantFacts, Operation, OwnerSource, RegistrationState, decide,
};
pub use error::{AccessError, AccessResult};
pub use mirror::{AccessEntry, AccessEvent, AccessType, MirrorStore};
pub use registry::{
    ContractTransport, RegistrationReceipt, RegistryClient, SimulatedContract, TxReceipt,
};
pub use resolver::AccessResolver;
pub use source::{CacheSource, OwnerLookup, RegistrySource, SourceOfTruth};

pub use memory::InMemoryMirror;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteMirror;

/// Seconds since the Unix epoch
pub(crate) fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}
