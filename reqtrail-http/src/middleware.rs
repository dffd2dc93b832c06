use crate::error::ApiError;
use crate::server::AdminState;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use reqtrail_core::TrailError;
use std::sync::Arc;
use tracing::warn;

pub const API_KEY_HEADER: &str = "x-api-key";

/// Admin API key authentication middleware.
///
/// With no key configured every caller is let through.
pub async fn api_key_auth(
    State(state): State<Arc<AdminState>>,
    request: Request,
    next: Next,
) -> Response {
    if let Some(expected) = state.api_key.as_deref() {
        let presented = request
            .headers()
            .get(API_KEY_HEADER)
            .and_then(|v| v.to_str().ok());
        if presented != Some(expected) {
            warn!(path = %request.uri().path(), "Rejected admin request without valid api key");
            return ApiError(TrailError::AccessDenied("invalid or missing api key".into()))
                .into_response();
        }
    }
    next.run(request).await
}
