//! Builds the [`StructuredEvent`] handed to the external sink.
//!
//! Severity is always informational, whatever the status code. Error
//! responses are not escalated.

use crate::evaluator::{effective_payload, fields_to_include};
use chrono::Utc;
use reqtrail_core::context::{RequestContext, RequestPayload, ResponsePayload};
use reqtrail_core::event::{EventProperty, MessageTemplate, PropertyValue, StructuredEvent};
use reqtrail_core::policy::Policy;
use serde_json::Value;
use std::time::Duration;
use tracing::Level;

pub const PROPERTY_METHOD: &str = "Method";
pub const PROPERTY_URL: &str = "Url";
pub const PROPERTY_HEADERS: &str = "Headers";
pub const PROPERTY_STATUS: &str = "Status";
pub const PROPERTY_STATUS_TEXT: &str = "StatusText";
pub const PROPERTY_ELAPSED: &str = "Elapsed";
pub const PROPERTY_BODY: &str = "Body";
pub const PROPERTY_FORM: &str = "Form";
pub const PROPERTY_SESSION: &str = "Session";
pub const PROPERTY_RESPONSE: &str = "Response";
pub const PROPERTY_ERROR: &str = "Error";

pub const TEMPLATE: &str = "HTTP {Method} {Url} responded {Status} in {Elapsed} ms";

pub fn emit(
    ctx: &RequestContext,
    payload: Option<&RequestPayload>,
    response: Option<&ResponsePayload>,
    elapsed: Duration,
    policy: &Policy,
) -> StructuredEvent {
    let payload = effective_payload(ctx, payload);
    let inc = fields_to_include(payload, response, policy);

    let mut properties = vec![
        EventProperty::new(PROPERTY_METHOD, PropertyValue::scalar(ctx.method.to_uppercase())),
        EventProperty::new(PROPERTY_URL, PropertyValue::scalar(ctx.path.clone())),
        EventProperty::new(PROPERTY_HEADERS, PropertyValue::structure(&ctx.headers)),
        EventProperty::new(PROPERTY_STATUS, PropertyValue::scalar(ctx.status_code)),
        EventProperty::new(PROPERTY_STATUS_TEXT, PropertyValue::scalar(ctx.status_text())),
        EventProperty::new(PROPERTY_ELAPSED, PropertyValue::scalar(elapsed_ms_ceil(elapsed))),
    ];

    if inc.body {
        let body = ctx
            .raw_body()
            .map(PropertyValue::scalar)
            .or_else(|| payload.map(|p| from_json(p.body.clone())));
        if let Some(body) = body {
            properties.push(EventProperty::new(PROPERTY_BODY, body));
        }
    }
    if inc.form {
        properties.push(EventProperty::new(PROPERTY_FORM, PropertyValue::structure(&ctx.form_data)));
    }
    if inc.session {
        if let Some(session) = &ctx.session {
            if let Ok(v) = serde_json::to_value(session) {
                properties.push(EventProperty::new(PROPERTY_SESSION, from_json(v)));
            }
        }
    }
    if inc.response {
        if let Some(resp) = response {
            properties.push(EventProperty::new(PROPERTY_RESPONSE, from_json(resp.to_value())));
        }
    }
    if inc.error {
        // Explicit result: used as-is. Raised fault: its inner cause, normalized.
        if let Some(failure) = response.and_then(ResponsePayload::failure) {
            if let Ok(v) = serde_json::to_value(failure.status()) {
                properties.push(EventProperty::new(PROPERTY_ERROR, from_json(v)));
            }
        }
    }
    if inc.custom {
        if let Some(hook) = &policy.properties_hook {
            properties.extend(hook(ctx, payload, response));
        }
    }

    StructuredEvent {
        timestamp: Utc::now(),
        level: Level::INFO,
        template: MessageTemplate::new(TEMPLATE),
        properties,
    }
}

/// Whole milliseconds, rounded up.
pub fn elapsed_ms_ceil(elapsed: Duration) -> u64 {
    let ms = elapsed.as_nanos().div_ceil(1_000_000);
    u64::try_from(ms).unwrap_or(u64::MAX)
}

/// Objects become nested structures; everything else stays scalar.
fn from_json(value: Value) -> PropertyValue {
    match value {
        Value::Object(map) => PropertyValue::Structure(
            map.into_iter()
                .map(|(k, v)| EventProperty::new(k, from_json(v)))
                .collect(),
        ),
        other => PropertyValue::Scalar(other),
    }
}
