use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chainshare_access::AccessError;
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not implemented: {0}")]
    NotImplemented(String),

    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<AccessError> for ServerError {
    fn from(e: AccessError) -> Self {
        let msg = e.to_string();
        match e {
            AccessError::Reverted(_) | AccessError::AlreadyRegistered(_) => {
                ServerError::Conflict(msg)
            }
            AccessError::RegistryUnavailable(_)
            | AccessError::EstimationFailed(_)
            | AccessError::Connection(_) => ServerError::Unavailable(msg),
            AccessError::SubmissionTimedOut => ServerError::Timeout(msg),
            AccessError::NotSupported(_) => ServerError::NotImplemented(msg),
            AccessError::FileNotFound(_) => ServerError::NotFound(msg),
            AccessError::InvalidIdentity(_) | AccessError::InvalidContentId(_) => {
                ServerError::BadRequest(msg)
            }
            _ => ServerError::Internal(msg),
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ServerError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            ServerError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            ServerError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            ServerError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ServerError::NotImplemented(msg) => (StatusCode::NOT_IMPLEMENTED, msg.clone()),
            ServerError::Unavailable(msg) => {
                tracing::warn!("Registry unavailable: {}", msg);
                (StatusCode::SERVICE_UNAVAILABLE, msg.clone())
            }
            ServerError::Timeout(msg) => (StatusCode::GATEWAY_TIMEOUT, msg.clone()),
            ServerError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".into(),
                )
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

pub type ServerResult<T> = Result<T, ServerError>;
