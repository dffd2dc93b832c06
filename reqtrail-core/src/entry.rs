//! The structured record kept for each logged request.

use crate::context::{Failure, Session};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;

/// One completed, logged request.
///
/// Built once at the end of the request and never mutated afterwards.
/// Optional members are `None` when the policy did not ask for them, and are
/// left out of the serialized form entirely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    // ── Identity ─────────────────────────────────────────────────
    /// Derived from the request correlation id.
    pub id: u64,
    pub timestamp: DateTime<Utc>,

    // ── Request ───────────────────────────────────────────────────
    pub http_method: String,
    pub absolute_uri: String,
    pub path: String,
    pub headers: BTreeMap<String, String>,
    pub client_ip: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forwarded_for: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referer: Option<String>,
    /// Request-scoped items, stringified.
    #[serde(default)]
    pub items: BTreeMap<String, String>,

    // ── Response ──────────────────────────────────────────────────
    pub status_code: u16,
    pub status_text: String,
    #[serde(with = "duration_ms")]
    pub elapsed: Duration,

    // ── Policy-gated ──────────────────────────────────────────────
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form_data: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_payload: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_payload: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session: Option<Session>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_auth_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorSummary>,
}

impl LogEntry {
    /// Create a minimal entry; fill remaining fields before storing.
    pub fn new(id: u64, http_method: impl Into<String>, absolute_uri: impl Into<String>) -> Self {
        Self {
            id,
            timestamp: Utc::now(),
            http_method: http_method.into(),
            absolute_uri: absolute_uri.into(),
            path: String::new(),
            headers: BTreeMap::new(),
            client_ip: String::new(),
            forwarded_for: None,
            referer: None,
            items: BTreeMap::new(),
            status_code: 0,
            status_text: String::new(),
            elapsed: Duration::ZERO,
            request_body: None,
            form_data: None,
            request_payload: None,
            response_payload: None,
            session: None,
            session_id: None,
            user_auth_id: None,
            error: None,
        }
    }
}

/// Source and description of a failed response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorSummary {
    pub error_code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub data: BTreeMap<String, String>,
}

impl ErrorSummary {
    /// Summarize a failure. Faults are unwrapped one level, never more.
    pub fn from_failure(failure: &Failure) -> Self {
        match failure {
            Failure::Result(status) => Self {
                error_code: status.error_code.clone(),
                message: status.message.clone(),
                source: None,
                data: BTreeMap::new(),
            },
            Failure::Exception(fault) => {
                let cause = fault.unwrap_once();
                Self {
                    error_code: cause.kind.clone(),
                    message: cause.message.clone(),
                    source: cause.source.clone(),
                    data: cause.data.clone(),
                }
            }
        }
    }
}

/// Durations travel as fractional milliseconds.
mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_nanos() as f64 / 1_000_000.0)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let ms = f64::deserialize(d)?;
        Duration::try_from_secs_f64(ms.max(0.0) / 1000.0).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{ErrorStatus, Fault};

    fn bare(id: u64) -> LogEntry {
        let mut e = LogEntry::new(id, "GET", "http://localhost/hello");
        e.path = "/hello".into();
        e.client_ip = "127.0.0.1".into();
        e.status_code = 200;
        e.status_text = "OK".into();
        e.elapsed = Duration::from_micros(1500);
        e
    }

    #[test]
    fn absent_optional_fields_are_not_serialized() {
        let json = serde_json::to_value(bare(7)).unwrap();
        for key in [
            "request_body",
            "form_data",
            "request_payload",
            "response_payload",
            "session",
            "session_id",
            "user_auth_id",
            "error",
            "forwarded_for",
            "referer",
        ] {
            assert!(json.get(key).is_none(), "{key} should be absent");
        }
        assert_eq!(json["id"], 7);
        assert_eq!(json["elapsed"], 1.5);
    }

    #[test]
    fn summary_of_result_keeps_code_and_message() {
        let s = ErrorSummary::from_failure(&Failure::Result(ErrorStatus::new("Conflict", "taken")));
        assert_eq!(s.error_code, "Conflict");
        assert_eq!(s.message, "taken");
        assert!(s.source.is_none());
    }

    #[test]
    fn summary_of_exception_uses_inner_cause() {
        let fault = Fault::new("ServiceError", "wrapper")
            .caused_by(Fault::new("TimeoutError", "DB timeout").with_source("orders-db").with_data("retry", "0"));
        let s = ErrorSummary::from_failure(&Failure::Exception(fault));
        assert_eq!(s.message, "DB timeout");
        assert_eq!(s.source.as_deref(), Some("orders-db"));
        assert_eq!(s.data.get("retry").map(String::as_str), Some("0"));
    }

    #[test]
    fn out_of_range_elapsed_is_a_deserialize_error() {
        let mut json = serde_json::to_value(bare(3)).unwrap();
        json["elapsed"] = serde_json::json!(1e300);
        assert!(serde_json::from_value::<LogEntry>(json).is_err());
    }
}
