use crate::error::ApiError;
use crate::server::AdminState;
use axum::extract::State;
use axum::response::Json;
use reqtrail_core::policy::{PolicyUpdate, PolicyView};
use std::sync::Arc;
use tracing::info;

pub async fn get_policy(
    State(state): State<Arc<AdminState>>,
) -> Result<Json<PolicyView>, ApiError> {
    Ok(Json(state.logger()?.policy().view()))
}

/// Fields left out of the body keep their current value.
pub async fn update_policy(
    State(state): State<Arc<AdminState>>,
    Json(update): Json<PolicyUpdate>,
) -> Result<Json<PolicyView>, ApiError> {
    let logger = state.logger()?;
    logger.apply(update);
    let view = logger.policy().view();
    info!(policy = ?view, "Request log policy updated");
    Ok(Json(view))
}
