use axum::{Json, extract::State};
use serde_json::{Value, json};

use crate::state::AppState;

pub async fn health_check(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "registry": {
            "backend": state.config.registry.backend,
            "block": state.contract.block_number(),
        },
        "mirror": state.config.mirror.backend,
    }))
}
