use crate::capture::{CaptureState, capture_requests};
use crate::server::{AdminState, build_admin_router};
use axum::{Router, middleware};
use reqtrail_core::TrailConfig;
use reqtrail_core::config::{AdminConfig, ServerConfig};
use reqtrail_logging::{EventSink, RequestLogger};
use std::sync::Arc;
use tracing::{info, warn};

/// Wires request logging into a host router: capture on every host route,
/// plus the admin query routes.
pub struct RequestLogsFeature {
    logger: Option<Arc<RequestLogger>>,
    sink: Option<Arc<dyn EventSink>>,
    admin: AdminConfig,
    max_body_bytes: usize,
}

impl RequestLogsFeature {
    pub fn new(logger: Arc<RequestLogger>) -> Self {
        Self {
            logger: Some(logger),
            sink: None,
            admin: AdminConfig::default(),
            max_body_bytes: ServerConfig::default().max_captured_body_bytes,
        }
    }

    pub fn from_config(cfg: &TrailConfig, sink: Option<Arc<dyn EventSink>>) -> Self {
        Self {
            logger: Some(Arc::new(RequestLogger::from_config(&cfg.request_logs))),
            sink,
            admin: cfg.admin.clone(),
            max_body_bytes: cfg.server.max_captured_body_bytes,
        }
    }

    /// Admin routes only, with no logger behind them. Every admin call
    /// answers `LoggerNotRegistered`.
    pub fn unregistered(admin: AdminConfig) -> Self {
        Self {
            logger: None,
            sink: None,
            admin,
            max_body_bytes: 0,
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn with_admin(mut self, admin: AdminConfig) -> Self {
        self.admin = admin;
        self
    }

    pub fn with_max_body_bytes(mut self, max: usize) -> Self {
        self.max_body_bytes = max;
        self
    }

    pub fn logger(&self) -> Option<&Arc<RequestLogger>> {
        self.logger.as_ref()
    }

    /// Admin routes are merged after the capture layer, so admin calls are
    /// not themselves logged.
    pub fn register(self, app: Router) -> Router {
        let app = match &self.logger {
            Some(logger) => {
                let state = Arc::new(CaptureState::new(
                    logger.clone(),
                    self.sink.clone(),
                    self.max_body_bytes,
                ));
                app.layer(middleware::from_fn_with_state(state, capture_requests))
            }
            None => {
                warn!("No request logger registered, requests are not captured");
                app
            }
        };

        if !self.admin.enabled {
            return app;
        }

        info!(path = %self.admin.at_rest_path, "Request log admin API mounted");
        let admin = build_admin_router(Arc::new(AdminState {
            logger: self.logger,
            api_key: self.admin.api_key,
            at_rest_path: self.admin.at_rest_path,
        }));
        app.merge(admin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_uses_configured_default_body_limit() {
        let feature = RequestLogsFeature::new(Arc::new(RequestLogger::default()));
        assert_eq!(
            feature.max_body_bytes,
            ServerConfig::default().max_captured_body_bytes
        );
        assert!(feature.admin.enabled);
    }
}
