//! Builds the [`LogEntry`] kept in the rolling buffer.

use crate::evaluator::{effective_payload, fields_to_include};
use chrono::Utc;
use reqtrail_core::context::{RequestContext, RequestPayload, ResponsePayload};
use reqtrail_core::entry::{ErrorSummary, LogEntry};
use reqtrail_core::policy::Policy;
use serde_json::Value;
use std::time::Duration;

/// Build the record for one request. Optional members are set strictly per
/// [`fields_to_include`]; everything else is always filled in.
pub fn build(
    ctx: &RequestContext,
    payload: Option<&RequestPayload>,
    response: Option<&ResponsePayload>,
    elapsed: Duration,
    policy: &Policy,
) -> LogEntry {
    let payload = effective_payload(ctx, payload);
    let inc = fields_to_include(payload, response, policy);

    let mut entry = LogEntry::new(ctx.correlation_id, ctx.method.to_uppercase(), ctx.absolute_uri.clone());
    entry.timestamp = Utc::now();
    entry.path = ctx.path.clone();
    entry.headers = ctx.headers.clone();
    entry.client_ip = ctx.client_ip.clone();
    entry.forwarded_for = ctx.forwarded_for().map(str::to_string);
    entry.referer = ctx.referer().map(str::to_string);
    entry.items = ctx
        .items
        .iter()
        .map(|(k, v)| (k.clone(), stringify(v)))
        .collect();
    entry.status_code = ctx.status_code;
    entry.status_text = ctx.status_text();
    entry.elapsed = elapsed;

    if inc.body {
        entry.request_body = ctx.raw_body();
        entry.request_payload = payload.map(|p| p.body.clone());
    }
    if inc.form {
        entry.form_data = Some(ctx.form_data.clone());
    }
    if inc.session {
        if let Some(session) = &ctx.session {
            entry.session_id = Some(session.id.clone());
            entry.user_auth_id = session.user_auth_id.clone();
            entry.session = Some(session.clone());
        }
    }
    if inc.response {
        entry.response_payload = response.map(ResponsePayload::to_value);
    }
    if inc.error {
        entry.error = response
            .and_then(ResponsePayload::failure)
            .map(ErrorSummary::from_failure);
    }

    entry
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
