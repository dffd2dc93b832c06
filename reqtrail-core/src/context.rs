use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

/// Read-only view of one completed request, as handed over by the host.
///
/// The host fills this in once the response status is known. Nothing in the
/// logging path mutates it.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    /// Host-assigned correlation id, unique per request.
    pub correlation_id: u64,

    // --- Request data ---
    pub method: String,
    pub absolute_uri: String,
    pub path: String,
    pub headers: BTreeMap<String, String>,
    pub form_data: BTreeMap<String, String>,
    pub body: Option<Bytes>,

    /// Client IP address
    pub client_ip: String,

    /// Request-scoped items set by earlier stages of the host pipeline.
    pub items: BTreeMap<String, Value>,

    /// Current session, if the host resolved one.
    pub session: Option<Session>,

    /// Payload the host bound to this request, used when the caller does not
    /// pass one explicitly.
    pub payload: Option<RequestPayload>,

    // --- Response data ---
    pub status_code: u16,
    pub status_description: Option<String>,
}

impl RequestContext {
    pub fn new(correlation_id: u64, method: &str, absolute_uri: impl Into<String>) -> Self {
        let absolute_uri = absolute_uri.into();
        let path = path_of(&absolute_uri).to_string();

        Self {
            correlation_id,
            method: method.to_uppercase(),
            absolute_uri,
            path,
            status_code: 200,
            ..Default::default()
        }
    }

    /// Get a request header (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn forwarded_for(&self) -> Option<&str> {
        self.header("x-forwarded-for")
    }

    pub fn referer(&self) -> Option<&str> {
        self.header("referer")
    }

    /// Roles of the caller. Empty without a session.
    pub fn roles(&self) -> BTreeSet<String> {
        self.session
            .as_ref()
            .map(|s| s.roles.clone())
            .unwrap_or_default()
    }

    /// Raw request body as text (lossy UTF-8).
    pub fn raw_body(&self) -> Option<String> {
        self.body
            .as_ref()
            .map(|b| String::from_utf8_lossy(b).into_owned())
    }

    /// Status description from the host, else the canonical reason phrase.
    pub fn status_text(&self) -> String {
        if let Some(desc) = &self.status_description {
            return desc.clone();
        }
        http::StatusCode::from_u16(self.status_code)
            .ok()
            .and_then(|s| s.canonical_reason())
            .unwrap_or_default()
            .to_string()
    }
}

/// Extract the path component of an absolute or origin-form URI.
fn path_of(uri: &str) -> &str {
    let rest = match uri.find("://") {
        Some(pos) => {
            let after = &uri[pos + 3..];
            match after.find('/') {
                Some(slash) => &after[slash..],
                None => "/",
            }
        }
        None => uri,
    };
    match rest.find(['?', '#']) {
        Some(0) => "/",
        Some(end) => &rest[..end],
        None if rest.is_empty() => "/",
        None => rest,
    }
}

/// The caller's session as seen by the logger.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_auth_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    #[serde(default)]
    pub roles: BTreeSet<String>,
    #[serde(default)]
    pub is_authenticated: bool,
}

/// A recognized service request: its kind plus the decoded body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestPayload {
    pub kind: String,
    pub body: Value,
}

impl RequestPayload {
    pub fn new(kind: impl Into<String>, body: Value) -> Self {
        Self {
            kind: kind.into(),
            body,
        }
    }
}

/// Normalized error status, the shape every failure is reduced to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorStatus {
    pub error_code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack_trace: Option<String>,
}

impl ErrorStatus {
    pub fn new(error_code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error_code: error_code.into(),
            message: message.into(),
            stack_trace: None,
        }
    }
}

/// A raised fault, optionally wrapping the fault that caused it.
#[derive(Debug, Clone, PartialEq)]
pub struct Fault {
    pub kind: String,
    pub message: String,
    pub source: Option<String>,
    pub data: BTreeMap<String, String>,
    pub inner: Option<Box<Fault>>,
}

impl Fault {
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
            source: None,
            data: BTreeMap::new(),
            inner: None,
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    pub fn caused_by(mut self, inner: Fault) -> Self {
        self.inner = Some(Box::new(inner));
        self
    }

    /// The inner cause if present, else this fault. Unwraps exactly one level.
    pub fn unwrap_once(&self) -> &Fault {
        self.inner.as_deref().unwrap_or(self)
    }

    pub fn to_status(&self) -> ErrorStatus {
        ErrorStatus::new(self.kind.clone(), self.message.clone())
    }
}

/// The two ways a response can represent a failure.
#[derive(Debug, Clone, PartialEq)]
pub enum Failure {
    /// The service returned an explicit error result.
    Result(ErrorStatus),
    /// The service raised a fault.
    Exception(Fault),
}

impl Failure {
    /// Normalized status. Faults are unwrapped one level first.
    pub fn status(&self) -> ErrorStatus {
        match self {
            Failure::Result(status) => status.clone(),
            Failure::Exception(fault) => fault.unwrap_once().to_status(),
        }
    }
}

/// What the service produced for a request.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponsePayload {
    Value(Value),
    Failure(Failure),
}

impl ResponsePayload {
    pub fn failure(&self) -> Option<&Failure> {
        match self {
            ResponsePayload::Failure(f) => Some(f),
            ResponsePayload::Value(_) => None,
        }
    }

    pub fn is_failure(&self) -> bool {
        self.failure().is_some()
    }

    /// JSON form used when echoing the response into a log record.
    pub fn to_value(&self) -> Value {
        match self {
            ResponsePayload::Value(v) => v.clone(),
            ResponsePayload::Failure(f) => {
                serde_json::json!({ "response_status": f.status() })
            }
        }
    }
}
