//! Integration tests: registry, cache and mirror working together

use std::sync::Arc;

use chainshare_access::registry::QueryKind;
use chainshare_access::{
    AccessContext, AccessError, AccessType, Address, ContentId, Corroboration, DecisionReason,
    FileRecord, InMemoryMirror, MirrorStore, Operation, OwnerSource, RegistrationState,
    ResolutionCache, SimulatedContract, SqliteMirror,
};

struct Session {
    contract: Arc<SimulatedContract>,
    mirror: Arc<dyn MirrorStore>,
    ctx: AccessContext,
}

fn session_with(mirror: Arc<dyn MirrorStore>) -> Session {
    let contract = Arc::new(SimulatedContract::new());
    let ctx = AccessContext::new(
        contract.clone(),
        mirror.clone(),
        Arc::new(ResolutionCache::new()),
    );
    Session {
        contract,
        mirror,
        ctx,
    }
}

fn session() -> Session {
    session_with(Arc::new(InMemoryMirror::new()))
}

fn owner() -> Address {
    "0x1111111111111111111111111111111111111111".parse().unwrap()
}

fn alice() -> Address {
    "0x2222222222222222222222222222222222222222".parse().unwrap()
}

fn bob() -> Address {
    "0x3333333333333333333333333333333333333333".parse().unwrap()
}

fn cid(s: &str) -> ContentId {
    ContentId::new(s).unwrap()
}

async fn upload(s: &Session, file: &ContentId) {
    s.ctx
        .record_file(&FileRecord::new(file.clone(), "report.pdf", 2048, "application/pdf", owner()))
        .await
        .unwrap();
    s.ctx.register_file(file, &owner()).await.unwrap();
}

#[tokio::test]
async fn test_unregistered_file_is_open() {
    let s = session();
    let file = cid("QmF1");

    for op in [Operation::View, Operation::Download] {
        let decision = s.ctx.resolve(&file, &alice(), op).await.unwrap();
        assert!(decision.allowed);
        assert_eq!(decision.reason, DecisionReason::Unregistered);
        assert_eq!(decision.state, RegistrationState::Unregistered);
    }
}

#[tokio::test]
async fn test_owner_allowed_stranger_denied() {
    let s = session();
    let file = cid("QmF1");
    upload(&s, &file).await;

    let decision = s.ctx.resolve(&file, &owner(), Operation::Download).await.unwrap();
    assert!(decision.allowed);
    assert_eq!(decision.reason, DecisionReason::Owner);

    let decision = s.ctx.resolve(&file, &alice(), Operation::Download).await.unwrap();
    assert!(!decision.allowed);
    assert_eq!(decision.reason, DecisionReason::NotGranted);
}

#[tokio::test]
async fn test_blacklist_overrides_grant() {
    let s = session();
    let file = cid("QmF1");
    upload(&s, &file).await;

    s.ctx.grant_access(&file, &alice(), &owner()).await.unwrap();
    let decision = s.ctx.resolve(&file, &alice(), Operation::View).await.unwrap();
    assert!(decision.allowed);
    assert_eq!(decision.reason, DecisionReason::Granted);

    s.ctx.add_to_blacklist(&file, &alice(), &owner()).await.unwrap();
    let decision = s.ctx.resolve(&file, &alice(), Operation::View).await.unwrap();
    assert!(!decision.allowed);
    assert_eq!(decision.reason, DecisionReason::Blacklisted);

    // The grant itself is still active
    let granted = s.ctx.registry().get_granted_identities(&file).await.unwrap();
    assert!(granted.contains(&alice()));
}

#[tokio::test]
async fn test_whitelist_mode_excludes_grant_only_identity() {
    let s = session();
    let file = cid("QmF1");
    upload(&s, &file).await;

    s.ctx.grant_access(&file, &bob(), &owner()).await.unwrap();
    s.ctx.add_to_whitelist(&file, &alice(), &owner()).await.unwrap();
    s.ctx.toggle_whitelist_mode(&file, &owner()).await.unwrap();

    let decision = s.ctx.resolve(&file, &bob(), Operation::View).await.unwrap();
    assert!(!decision.allowed);
    assert_eq!(decision.reason, DecisionReason::WhitelistModeExclusion);

    let decision = s.ctx.resolve(&file, &alice(), Operation::View).await.unwrap();
    assert!(decision.allowed);
    assert_eq!(decision.reason, DecisionReason::Whitelisted);

    // Turning the mode off restores the grant
    s.ctx.toggle_whitelist_mode(&file, &owner()).await.unwrap();
    let decision = s.ctx.resolve(&file, &bob(), Operation::View).await.unwrap();
    assert!(decision.allowed);
}

#[tokio::test]
async fn test_grant_read_failure_never_allows() {
    let s = session();
    let file = cid("QmF1");
    upload(&s, &file).await;
    s.ctx.grant_access(&file, &alice(), &owner()).await.unwrap();

    s.contract.fail_query(QueryKind::AuthorizedUsers);

    let decision = s.ctx.resolve_or_deny(&file, &alice(), Operation::View).await;
    assert!(!decision.allowed);
    assert_eq!(decision.reason, DecisionReason::RegistryError);
}

#[tokio::test]
async fn test_registry_down_with_empty_cache_denies() {
    let s = session();
    let file = cid("QmF1");
    s.contract.set_offline(true);

    let err = s.ctx.resolve(&file, &alice(), Operation::View).await.unwrap_err();
    assert!(matches!(err, AccessError::RegistryUnavailable(_)));

    let decision = s.ctx.resolve_or_deny(&file, &alice(), Operation::View).await;
    assert!(!decision.allowed);
    assert_eq!(decision.state, RegistrationState::Unknown);
}

#[tokio::test]
async fn test_owner_survives_registry_outage() {
    let s = session();
    let file = cid("QmF1");
    upload(&s, &file).await;
    s.ctx.resolve(&file, &owner(), Operation::View).await.unwrap();

    s.contract.set_offline(true);

    let decision = s.ctx.resolve(&file, &owner(), Operation::Download).await.unwrap();
    assert!(decision.allowed);
    assert_eq!(decision.owner_source, OwnerSource::Cache);

    // Non-owners cannot be checked without the registry
    let decision = s.ctx.resolve(&file, &alice(), Operation::Download).await.unwrap();
    assert!(!decision.allowed);
    assert_eq!(decision.reason, DecisionReason::RegistryError);
}

#[tokio::test]
async fn test_fresh_registration_is_pending_under_read_lag() {
    let s = session();
    let file = cid("QmF1");
    s.contract.set_read_lag(1);

    s.ctx.register_file(&file, &owner()).await.unwrap();

    let decision = s.ctx.resolve(&file, &owner(), Operation::View).await.unwrap();
    assert!(decision.allowed);
    assert_eq!(decision.state, RegistrationState::Pending { owner: owner() });

    s.contract.sync();
    let decision = s.ctx.resolve(&file, &owner(), Operation::View).await.unwrap();
    assert_eq!(decision.state, RegistrationState::Registered { owner: owner() });
    assert!(s.ctx.cache().owner_hint(&file).unwrap().confirmed);
}

#[tokio::test]
async fn test_writes_are_idempotent() {
    let s = session();
    let file = cid("QmF1");
    upload(&s, &file).await;

    s.ctx.grant_access(&file, &alice(), &owner()).await.unwrap();
    s.ctx.grant_access(&file, &alice(), &owner()).await.unwrap();
    s.ctx.revoke_access(&file, &bob(), &owner()).await.unwrap();

    let granted = s.ctx.registry().get_granted_identities(&file).await.unwrap();
    assert_eq!(granted.len(), 1);

    let entries = s.mirror.list_entries(&file).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert!(entries[0].is_active);
}

#[tokio::test]
async fn test_non_owner_cannot_manage_sharing() {
    let s = session();
    let file = cid("QmF1");
    upload(&s, &file).await;

    let decision = s
        .ctx
        .resolve(&file, &alice(), Operation::ManageSharing)
        .await
        .unwrap();
    assert!(!decision.allowed);
    assert_eq!(decision.reason, DecisionReason::NotOwner);

    let err = s.ctx.grant_access(&file, &bob(), &alice()).await.unwrap_err();
    assert!(matches!(err, AccessError::Reverted(_)));
}

#[tokio::test]
async fn test_shared_with_labels_registry_view() {
    let s = session();
    let confirmed = cid("QmConfirmed");
    let revoked = cid("QmRevoked");
    upload(&s, &confirmed).await;
    upload(&s, &revoked).await;

    s.ctx.grant_access(&confirmed, &alice(), &owner()).await.unwrap();
    s.ctx.grant_access(&revoked, &alice(), &owner()).await.unwrap();

    // Revoke on-chain only; the mirror still lists the grant
    s.ctx
        .registry()
        .revoke_access(&revoked, &alice(), &owner())
        .await
        .unwrap();

    let shared = s.ctx.shared_with(&alice()).await.unwrap();
    assert_eq!(shared.len(), 2);

    let label = |file: &ContentId| {
        shared
            .iter()
            .find(|f| &f.record.content_id == file)
            .map(|f| f.corroboration)
    };
    assert_eq!(label(&confirmed), Some(Corroboration::Confirmed));
    assert_eq!(label(&revoked), Some(Corroboration::Contradicted));
}

#[tokio::test]
async fn test_shared_with_survives_registry_outage() {
    let s = session();
    let file = cid("QmF1");
    upload(&s, &file).await;
    s.ctx.grant_access(&file, &alice(), &owner()).await.unwrap();

    s.contract.set_offline(true);

    let shared = s.ctx.shared_with(&alice()).await.unwrap();
    assert_eq!(shared.len(), 1);
    assert_eq!(shared[0].corroboration, Corroboration::Unverified);
}

#[tokio::test]
async fn test_sqlite_mirror_tracks_sharing() {
    let s = session_with(Arc::new(SqliteMirror::in_memory().unwrap()));
    let file = cid("QmF1");
    upload(&s, &file).await;

    s.ctx.grant_access(&file, &alice(), &owner()).await.unwrap();
    s.ctx.add_to_blacklist(&file, &bob(), &owner()).await.unwrap();

    let entries = s.mirror.list_entries(&file).await.unwrap();
    assert_eq!(entries.len(), 2);
    assert!(entries.iter().all(|e| e.is_active));

    s.ctx.revoke_access(&file, &alice(), &owner()).await.unwrap();

    let entries = s.mirror.list_entries(&file).await.unwrap();
    let grant = entries
        .iter()
        .find(|e| e.access_type == AccessType::Grant)
        .unwrap();
    assert!(!grant.is_active);
    assert!(grant.revoked_at.is_some());

    assert!(s.mirror.list_files_granted_to(&alice()).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_access_history() {
    let s = session();
    let file = cid("QmF1");
    upload(&s, &file).await;

    s.ctx.record_access(&file, &owner(), Operation::Download).await;
    s.ctx.record_access(&file, &alice(), Operation::View).await;

    let history = s.mirror.access_history(&file).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].identity, owner());
    assert_eq!(history[1].operation, Operation::View);
}
