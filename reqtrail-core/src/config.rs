use figment::{Figment, providers::{Env, Format, Yaml}};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrailConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub admin: AdminConfig,
    #[serde(default)]
    pub request_logs: RequestLogsConfig,
    #[serde(default)]
    pub sink: SinkConfig,
}

/// Host HTTP listener.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_http_addr")]
    pub addr: String,
    /// Request bodies larger than this are not captured.
    #[serde(default = "default_max_body")]
    pub max_captured_body_bytes: usize,
}

/// Admin query endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Route the admin endpoint is mounted at.
    #[serde(default = "default_rest_path")]
    pub at_rest_path: String,
    /// Admin API key (optional). When set, every admin call must present it.
    pub api_key: Option<String>,
}

/// Initial request-logging policy plus buffer sizing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestLogsConfig {
    #[serde(default)]
    pub enable_session_tracking: bool,
    #[serde(default)]
    pub enable_request_body_tracking: bool,
    #[serde(default)]
    pub enable_response_tracking: bool,
    #[serde(default)]
    pub enable_error_tracking: bool,
    #[serde(default)]
    pub limit_to_service_requests: bool,
    #[serde(default)]
    pub required_roles: Vec<String>,
    #[serde(default)]
    pub exclude_request_kinds: Vec<String>,
    #[serde(default)]
    pub hide_request_body_for_kinds: Vec<String>,
    /// Rolling buffer capacity.
    #[serde(default = "default_capacity")]
    pub capacity: usize,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SinkKind {
    Tracing,
    None,
}

/// External sink settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinkConfig {
    #[serde(default = "default_sink_kind")]
    pub kind: SinkKind,
    /// Hand events to a dedicated thread instead of writing inline.
    #[serde(default = "default_true")]
    pub detached: bool,
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

// ── Defaults ──────────────────────────────────────────────────

fn default_http_addr() -> String { "0.0.0.0:8080".into() }
fn default_max_body() -> usize { 1024 * 1024 }
fn default_true() -> bool { true }
fn default_rest_path() -> String { "/requestlogs".into() }
fn default_capacity() -> usize { 1000 }
fn default_sink_kind() -> SinkKind { SinkKind::Tracing }
fn default_channel_capacity() -> usize { 10_000 }

// ── Impls ─────────────────────────────────────────────────────

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: default_http_addr(),
            max_captured_body_bytes: default_max_body(),
        }
    }
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            at_rest_path: default_rest_path(),
            api_key: None,
        }
    }
}

impl Default for RequestLogsConfig {
    fn default() -> Self {
        Self {
            enable_session_tracking: false,
            enable_request_body_tracking: false,
            enable_response_tracking: false,
            enable_error_tracking: false,
            limit_to_service_requests: false,
            required_roles: Vec::new(),
            exclude_request_kinds: Vec::new(),
            hide_request_body_for_kinds: Vec::new(),
            capacity: default_capacity(),
        }
    }
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            kind: default_sink_kind(),
            detached: true,
            channel_capacity: default_channel_capacity(),
        }
    }
}

impl TrailConfig {
    /// Load configuration from YAML file + env overrides.
    ///
    /// Env keys nest with a double underscore:
    /// `REQTRAIL_REQUEST_LOGS__ENABLE_SESSION_TRACKING=true`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let config: TrailConfig = Figment::new()
            .merge(Yaml::file(path))
            .merge(Env::prefixed("REQTRAIL_").split("__"))
            .extract()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), crate::TrailError> {
        if self.request_logs.capacity == 0 {
            return Err(crate::TrailError::ConfigError(
                "request_logs.capacity must be at least 1".into(),
            ));
        }
        if !self.admin.at_rest_path.starts_with('/') {
            return Err(crate::TrailError::ConfigError(format!(
                "admin.at_rest_path must start with '/': {}",
                self.admin.at_rest_path
            )));
        }
        Ok(())
    }
}
