use crate::error::ServerResult;
use crate::middleware::require_wallet;
use crate::state::AppState;
use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post},
};
use chainshare_access::{Address, ContentId};
use tower_http::trace::TraceLayer;

mod access;
mod files;
mod health;
mod sharing;

pub fn router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/files", post(files::record_file))
        .route(
            "/files/{cid}/register",
            post(files::register_file).delete(files::unregister_file),
        )
        .route(
            "/files/{cid}/grants/{address}",
            post(sharing::grant_access).delete(sharing::revoke_access),
        )
        .route(
            "/files/{cid}/blacklist/{address}",
            post(sharing::add_to_blacklist).delete(sharing::remove_from_blacklist),
        )
        .route(
            "/files/{cid}/whitelist/{address}",
            post(sharing::add_to_whitelist).delete(sharing::remove_from_whitelist),
        )
        .route(
            "/files/{cid}/whitelist-mode",
            post(sharing::toggle_whitelist_mode),
        )
        .route_layer(axum_middleware::from_fn(require_wallet));

    let public = Router::new()
        .route("/health", get(health::health_check))
        .route("/files/{cid}", get(files::get_file))
        .route("/files/{cid}/history", get(files::access_history))
        .route("/files/{cid}/access", get(access::check_access))
        .route("/files/{cid}/permissions", get(access::file_permissions))
        .route("/files/access/batch", post(access::check_access_batch))
        .route("/shared/{address}", get(sharing::shared_with));

    Router::new()
        .merge(protected)
        .merge(public)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn parse_cid(raw: &str) -> ServerResult<ContentId> {
    Ok(ContentId::new(raw)?)
}

fn parse_address(raw: &str) -> ServerResult<Address> {
    Ok(raw.parse::<Address>()?)
}
