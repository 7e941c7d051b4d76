use super::parse_cid;
use crate::error::ServerResult;
use crate::middleware::CallerIdentity;
use crate::state::AppState;
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use chainshare_access::{AccessError, AccessEvent, FileRecord, RegistrationReceipt, TxReceipt};
use serde::Deserialize;

#[derive(Deserialize)]
pub struct RecordFileRequest {
    pub content_id: String,
    pub name: String,
    pub size: u64,
    pub mime_type: String,
}

/// POST /files
/// Record upload metadata in the mirror; the caller is the uploader
pub async fn record_file(
    State(state): State<AppState>,
    Extension(CallerIdentity(caller)): Extension<CallerIdentity>,
    Json(req): Json<RecordFileRequest>,
) -> ServerResult<(StatusCode, Json<FileRecord>)> {
    let content_id = parse_cid(&req.content_id)?;
    let record = FileRecord::new(content_id, req.name, req.size, req.mime_type, caller);

    state.access.record_file(&record).await?;

    Ok((StatusCode::CREATED, Json(record)))
}

/// GET /files/{cid}
pub async fn get_file(
    State(state): State<AppState>,
    Path(cid): Path<String>,
) -> ServerResult<Json<FileRecord>> {
    let file = parse_cid(&cid)?;
    let record = state
        .access
        .mirror()
        .find_file_by_content_id(&file)
        .await?
        .ok_or_else(|| AccessError::FileNotFound(file.to_string()))?;
    Ok(Json(record))
}

/// POST /files/{cid}/register
pub async fn register_file(
    State(state): State<AppState>,
    Extension(CallerIdentity(caller)): Extension<CallerIdentity>,
    Path(cid): Path<String>,
) -> ServerResult<(StatusCode, Json<RegistrationReceipt>)> {
    let file = parse_cid(&cid)?;
    let receipt = state.access.register_file(&file, &caller).await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

/// DELETE /files/{cid}/register
pub async fn unregister_file(
    State(state): State<AppState>,
    Extension(CallerIdentity(caller)): Extension<CallerIdentity>,
    Path(cid): Path<String>,
) -> ServerResult<Json<TxReceipt>> {
    let file = parse_cid(&cid)?;
    let receipt = state.access.unregister_file(&file, &caller).await?;
    Ok(Json(receipt))
}

/// GET /files/{cid}/history
pub async fn access_history(
    State(state): State<AppState>,
    Path(cid): Path<String>,
) -> ServerResult<Json<Vec<AccessEvent>>> {
    let file = parse_cid(&cid)?;
    let events = state.access.mirror().access_history(&file).await?;
    Ok(Json(events))
}
