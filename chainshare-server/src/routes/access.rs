use super::{parse_address, parse_cid};
use crate::error::{ServerError, ServerResult};
use crate::state::AppState;
use axum::{
    Json,
    extract::{Path, Query, State},
};
use chainshare_access::{AccessDecision, FilePermissions, Operation};
use serde::{Deserialize, Serialize};

#[derive(Deserialize)]
pub struct AccessQuery {
    pub identity: String,
    pub operation: Option<String>,
}

#[derive(Deserialize)]
pub struct PermissionsQuery {
    pub viewer: Option<String>,
}

#[derive(Deserialize)]
pub struct BatchRequest {
    pub identity: String,
    pub operation: Option<String>,
    pub files: Vec<String>,
}

#[derive(Serialize)]
pub struct BatchEntry {
    pub file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decision: Option<AccessDecision>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

fn parse_operation(raw: Option<&str>) -> ServerResult<Operation> {
    match raw {
        None => Ok(Operation::View),
        Some(s) => Operation::parse(s)
            .ok_or_else(|| ServerError::BadRequest(format!("Unknown operation: {s}"))),
    }
}

/// GET /files/{cid}/access?identity=&operation=
/// Gate check; allowed downloads are logged to the access history
pub async fn check_access(
    State(state): State<AppState>,
    Path(cid): Path<String>,
    Query(query): Query<AccessQuery>,
) -> ServerResult<Json<AccessDecision>> {
    let file = parse_cid(&cid)?;
    let identity = parse_address(&query.identity)?;
    let operation = parse_operation(query.operation.as_deref())?;

    let decision = state
        .access
        .resolve_or_deny(&file, &identity, operation)
        .await;

    if decision.allowed && operation == Operation::Download {
        state.access.record_access(&file, &identity, operation).await;
    }

    Ok(Json(decision))
}

/// POST /files/access/batch
pub async fn check_access_batch(
    State(state): State<AppState>,
    Json(req): Json<BatchRequest>,
) -> ServerResult<Json<Vec<BatchEntry>>> {
    let identity = parse_address(&req.identity)?;
    let operation = parse_operation(req.operation.as_deref())?;
    let files = req
        .files
        .iter()
        .map(|raw| parse_cid(raw))
        .collect::<ServerResult<Vec<_>>>()?;

    let results = state
        .access
        .resolve_many(&files, &identity, operation)
        .await
        .into_iter()
        .map(|(file, result)| match result {
            Ok(decision) => BatchEntry {
                file: file.to_string(),
                decision: Some(decision),
                error: None,
            },
            Err(e) => BatchEntry {
                file: file.to_string(),
                decision: None,
                error: Some(e.to_string()),
            },
        })
        .collect();

    Ok(Json(results))
}

/// GET /files/{cid}/permissions?viewer=
pub async fn file_permissions(
    State(state): State<AppState>,
    Path(cid): Path<String>,
    Query(query): Query<PermissionsQuery>,
) -> ServerResult<Json<FilePermissions>> {
    let file = parse_cid(&cid)?;
    let viewer = query.viewer.as_deref().map(parse_address).transpose()?;
    let permissions = state
        .access
        .file_permissions(&file, viewer.as_ref())
        .await?;
    Ok(Json(permissions))
}
