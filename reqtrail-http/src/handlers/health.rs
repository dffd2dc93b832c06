use crate::server::AdminState;
use axum::extract::State;
use axum::response::Json;
use serde_json::{Value, json};
use std::sync::Arc;

pub async fn health_check(State(state): State<Arc<AdminState>>) -> Json<Value> {
    let buffer = match &state.logger {
        None => json!(null),
        Some(logger) => json!({
            "len": logger.store().len(),
            "capacity": logger.store().capacity(),
        }),
    };

    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "logger_registered": state.logger.is_some(),
        "buffer": buffer,
    }))
}
