use crate::error::ApiError;
use crate::server::AdminState;
use axum::extract::{Query, State};
use axum::response::Json;
use reqtrail_core::LogEntry;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Default, Deserialize)]
pub struct LogsQuery {
    #[serde(default)]
    pub skip: Option<usize>,
    #[serde(default)]
    pub take: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct LogsResponse {
    /// Entries currently buffered, before `skip`/`take`.
    pub total: usize,
    pub results: Vec<Arc<LogEntry>>,
}

pub async fn list_logs(
    State(state): State<Arc<AdminState>>,
    Query(query): Query<LogsQuery>,
) -> Result<Json<LogsResponse>, ApiError> {
    let logger = state.logger()?;
    let results = logger.get_recent(query.skip.unwrap_or(0), query.take);
    debug!(skip = ?query.skip, take = ?query.take, returned = results.len(), "Recent request logs");
    Ok(Json(LogsResponse {
        total: logger.store().len(),
        results,
    }))
}
