use thiserror::Error;

/// Unified error type for reqtrail.
///
/// Only the administrative surface and configuration loading produce these.
/// The per-request logging path never fails.
#[derive(Error, Debug)]
pub enum TrailError {
    #[error("Request logger not registered")]
    LoggerNotRegistered,

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("Sink error: {0}")]
    SinkError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("Internal: {0}")]
    Internal(String),
}

impl TrailError {
    /// Map to HTTP status code.
    pub fn status_code(&self) -> u16 {
        match self {
            TrailError::AccessDenied(_) => 403,
            TrailError::Serde(_) => 400,
            TrailError::LoggerNotRegistered => 500,
            _ => 500,
        }
    }

    /// JSON error body.
    pub fn to_json_body(&self) -> Vec<u8> {
        serde_json::json!({
            "error": self.to_string(),
            "status": self.status_code(),
        })
        .to_string()
        .into_bytes()
    }
}
