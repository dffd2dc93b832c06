use crate::config::RequestLogsConfig;
use crate::context::{RequestContext, RequestPayload, ResponsePayload};
use crate::event::EventProperty;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

/// "Skip this request" predicate.
pub type SkipPredicate = Arc<dyn Fn(&RequestContext) -> bool + Send + Sync>;

/// Extension hook producing extra event properties.
///
/// Runs inline on the request path: it must be fast and side-effect free.
/// Its output is appended to the event as-is.
pub type PropertiesHook = Arc<
    dyn Fn(&RequestContext, Option<&RequestPayload>, Option<&ResponsePayload>) -> Vec<EventProperty>
        + Send
        + Sync,
>;

/// The set of toggles and filters controlling what gets logged.
///
/// A plain value: callers clone it (or hold an `Arc` snapshot) for the
/// duration of one decision. Hooks are shared through `Arc`, so cloning is
/// cheap.
#[derive(Clone, Default)]
pub struct Policy {
    pub enable_session_tracking: bool,
    pub enable_request_body_tracking: bool,
    pub enable_response_tracking: bool,
    pub enable_error_tracking: bool,
    pub limit_to_service_requests: bool,
    /// Caller must hold every one of these roles to be logged.
    pub required_roles: BTreeSet<String>,
    /// Request kinds that are never logged.
    pub excluded_kinds: BTreeSet<String>,
    /// Request kinds whose body, form data and payload are never recorded.
    pub hide_body_kinds: BTreeSet<String>,
    pub skip: Option<SkipPredicate>,
    pub properties_hook: Option<PropertiesHook>,
}

impl Policy {
    pub fn from_config(cfg: &RequestLogsConfig) -> Self {
        Self {
            enable_session_tracking: cfg.enable_session_tracking,
            enable_request_body_tracking: cfg.enable_request_body_tracking,
            enable_response_tracking: cfg.enable_response_tracking,
            enable_error_tracking: cfg.enable_error_tracking,
            limit_to_service_requests: cfg.limit_to_service_requests,
            required_roles: cfg.required_roles.iter().cloned().collect(),
            excluded_kinds: cfg.exclude_request_kinds.iter().cloned().collect(),
            hide_body_kinds: cfg.hide_request_body_for_kinds.iter().cloned().collect(),
            skip: None,
            properties_hook: None,
        }
    }

    pub fn excludes(&self, kind: &str) -> bool {
        self.excluded_kinds.contains(kind)
    }

    pub fn hides_body_for(&self, kind: &str) -> bool {
        self.hide_body_kinds.contains(kind)
    }

    /// True when `roles` is a superset of the required roles.
    pub fn roles_satisfied(&self, roles: &BTreeSet<String>) -> bool {
        self.required_roles.is_subset(roles)
    }

    /// Serializable view, without the function-valued members.
    pub fn view(&self) -> PolicyView {
        PolicyView {
            enable_session_tracking: self.enable_session_tracking,
            enable_request_body_tracking: self.enable_request_body_tracking,
            enable_response_tracking: self.enable_response_tracking,
            enable_error_tracking: self.enable_error_tracking,
            limit_to_service_requests: self.limit_to_service_requests,
            required_roles: self.required_roles.clone(),
            excluded_kinds: self.excluded_kinds.clone(),
            hide_body_kinds: self.hide_body_kinds.clone(),
            has_skip_predicate: self.skip.is_some(),
            has_properties_hook: self.properties_hook.is_some(),
        }
    }

    /// Apply a partial update. Unset members are left alone.
    pub fn apply(&mut self, update: PolicyUpdate) {
        if let Some(v) = update.enable_session_tracking {
            self.enable_session_tracking = v;
        }
        if let Some(v) = update.enable_request_body_tracking {
            self.enable_request_body_tracking = v;
        }
        if let Some(v) = update.enable_response_tracking {
            self.enable_response_tracking = v;
        }
        if let Some(v) = update.enable_error_tracking {
            self.enable_error_tracking = v;
        }
        if let Some(v) = update.limit_to_service_requests {
            self.limit_to_service_requests = v;
        }
        if let Some(v) = update.required_roles {
            self.required_roles = v;
        }
        if let Some(v) = update.excluded_kinds {
            self.excluded_kinds = v;
        }
        if let Some(v) = update.hide_body_kinds {
            self.hide_body_kinds = v;
        }
    }
}

impl fmt::Debug for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Policy")
            .field("enable_session_tracking", &self.enable_session_tracking)
            .field("enable_request_body_tracking", &self.enable_request_body_tracking)
            .field("enable_response_tracking", &self.enable_response_tracking)
            .field("enable_error_tracking", &self.enable_error_tracking)
            .field("limit_to_service_requests", &self.limit_to_service_requests)
            .field("required_roles", &self.required_roles)
            .field("excluded_kinds", &self.excluded_kinds)
            .field("hide_body_kinds", &self.hide_body_kinds)
            .field("skip", &self.skip.is_some())
            .field("properties_hook", &self.properties_hook.is_some())
            .finish()
    }
}

/// Serializable snapshot of a [`Policy`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyView {
    pub enable_session_tracking: bool,
    pub enable_request_body_tracking: bool,
    pub enable_response_tracking: bool,
    pub enable_error_tracking: bool,
    pub limit_to_service_requests: bool,
    pub required_roles: BTreeSet<String>,
    pub excluded_kinds: BTreeSet<String>,
    pub hide_body_kinds: BTreeSet<String>,
    pub has_skip_predicate: bool,
    pub has_properties_hook: bool,
}

/// Partial policy update accepted by the admin API.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PolicyUpdate {
    #[serde(default)]
    pub enable_session_tracking: Option<bool>,
    #[serde(default)]
    pub enable_request_body_tracking: Option<bool>,
    #[serde(default)]
    pub enable_response_tracking: Option<bool>,
    #[serde(default)]
    pub enable_error_tracking: Option<bool>,
    #[serde(default)]
    pub limit_to_service_requests: Option<bool>,
    #[serde(default)]
    pub required_roles: Option<BTreeSet<String>>,
    #[serde(default)]
    pub excluded_kinds: Option<BTreeSet<String>>,
    #[serde(default)]
    pub hide_body_kinds: Option<BTreeSet<String>>,
}

/// Which optional parts a record carries for one request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Inclusion {
    pub body: bool,
    pub form: bool,
    pub session: bool,
    pub response: bool,
    pub error: bool,
    pub custom: bool,
}
