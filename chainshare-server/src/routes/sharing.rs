use super::{parse_address, parse_cid};
use crate::error::ServerResult;
use crate::middleware::CallerIdentity;
use crate::state::AppState;
use axum::{
    Extension, Json,
    extract::{Path, State},
};
use chainshare_access::{SharedFile, TxReceipt};

/// POST /files/{cid}/grants/{address}
pub async fn grant_access(
    State(state): State<AppState>,
    Extension(CallerIdentity(caller)): Extension<CallerIdentity>,
    Path((cid, address)): Path<(String, String)>,
) -> ServerResult<Json<TxReceipt>> {
    let (file, grantee) = (parse_cid(&cid)?, parse_address(&address)?);
    let receipt = state.access.grant_access(&file, &grantee, &caller).await?;
    Ok(Json(receipt))
}

/// DELETE /files/{cid}/grants/{address}
pub async fn revoke_access(
    State(state): State<AppState>,
    Extension(CallerIdentity(caller)): Extension<CallerIdentity>,
    Path((cid, address)): Path<(String, String)>,
) -> ServerResult<Json<TxReceipt>> {
    let (file, grantee) = (parse_cid(&cid)?, parse_address(&address)?);
    let receipt = state.access.revoke_access(&file, &grantee, &caller).await?;
    Ok(Json(receipt))
}

/// POST /files/{cid}/blacklist/{address}
pub async fn add_to_blacklist(
    State(state): State<AppState>,
    Extension(CallerIdentity(caller)): Extension<CallerIdentity>,
    Path((cid, address)): Path<(String, String)>,
) -> ServerResult<Json<TxReceipt>> {
    let (file, identity) = (parse_cid(&cid)?, parse_address(&address)?);
    let receipt = state
        .access
        .add_to_blacklist(&file, &identity, &caller)
        .await?;
    Ok(Json(receipt))
}

/// DELETE /files/{cid}/blacklist/{address}
pub async fn remove_from_blacklist(
    State(state): State<AppState>,
    Extension(CallerIdentity(caller)): Extension<CallerIdentity>,
    Path((cid, address)): Path<(String, String)>,
) -> ServerResult<Json<TxReceipt>> {
    let (file, identity) = (parse_cid(&cid)?, parse_address(&address)?);
    let receipt = state
        .access
        .remove_from_blacklist(&file, &identity, &caller)
        .await?;
    Ok(Json(receipt))
}

/// POST /files/{cid}/whitelist/{address}
pub async fn add_to_whitelist(
    State(state): State<AppState>,
    Extension(CallerIdentity(caller)): Extension<CallerIdentity>,
    Path((cid, address)): Path<(String, String)>,
) -> ServerResult<Json<TxReceipt>> {
    let (file, identity) = (parse_cid(&cid)?, parse_address(&address)?);
    let receipt = state
        .access
        .add_to_whitelist(&file, &identity, &caller)
        .await?;
    Ok(Json(receipt))
}

/// DELETE /files/{cid}/whitelist/{address}
pub async fn remove_from_whitelist(
    State(state): State<AppState>,
    Extension(CallerIdentity(caller)): Extension<CallerIdentity>,
    Path((cid, address)): Path<(String, String)>,
) -> ServerResult<Json<TxReceipt>> {
    let (file, identity) = (parse_cid(&cid)?, parse_address(&address)?);
    let receipt = state
        .access
        .remove_from_whitelist(&file, &identity, &caller)
        .await?;
    Ok(Json(receipt))
}

/// POST /files/{cid}/whitelist-mode
pub async fn toggle_whitelist_mode(
    State(state): State<AppState>,
    Extension(CallerIdentity(caller)): Extension<CallerIdentity>,
    Path(cid): Path<String>,
) -> ServerResult<Json<TxReceipt>> {
    let file = parse_cid(&cid)?;
    let receipt = state.access.toggle_whitelist_mode(&file, &caller).await?;
    Ok(Json(receipt))
}

/// GET /shared/{address}
/// Files shared with an identity, each labelled with the registry's view
pub async fn shared_with(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> ServerResult<Json<Vec<SharedFile>>> {
    let identity = parse_address(&address)?;
    let files = state.access.shared_with(&identity).await?;
    Ok(Json(files))
}
