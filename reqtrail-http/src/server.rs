use crate::error::ApiError;
use crate::handlers;
use crate::middleware::api_key_auth;
use axum::{Router, middleware, routing::get};
use reqtrail_core::TrailError;
use reqtrail_logging::RequestLogger;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

/// Shared state for the admin query API.
pub struct AdminState {
    /// `None` when the host mounted the admin routes without registering a
    /// logger. Every call then fails with `LoggerNotRegistered`.
    pub logger: Option<Arc<RequestLogger>>,
    pub api_key: Option<String>,
    pub at_rest_path: String,
}

impl AdminState {
    pub fn logger(&self) -> Result<&Arc<RequestLogger>, ApiError> {
        self.logger
            .as_ref()
            .ok_or(ApiError(TrailError::LoggerNotRegistered))
    }
}

/// Build the admin router. Routes hang off `at_rest_path`:
///
/// - `GET  {path}`         recent entries, `?skip=&take=`
/// - `GET  {path}/policy`  current policy
/// - `PUT  {path}/policy`  partial policy update
/// - `GET  {path}/health`  buffer occupancy
pub fn build_admin_router(state: Arc<AdminState>) -> Router {
    let base = state.at_rest_path.trim_end_matches('/');
    let base = if base.is_empty() { "/" } else { base };
    let sub = |suffix: &str| format!("{}/{suffix}", base.trim_end_matches('/'));

    Router::new()
        .route(base, get(handlers::logs::list_logs))
        .route(
            &sub("policy"),
            get(handlers::policy::get_policy).put(handlers::policy::update_policy),
        )
        .route(&sub("health"), get(handlers::health::health_check))
        .layer(middleware::from_fn_with_state(state.clone(), api_key_auth))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
