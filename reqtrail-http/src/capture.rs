//! Host-side capture middleware.
//!
//! Wraps the host's router, turns each request into a [`RequestContext`] and
//! hands it to the [`RequestLogger`] once the response is ready.
//!
//! Handlers describe what they did through extensions on their response:
//! a [`RequestPayload`] for the typed request they decoded and a
//! [`ResponsePayload`] for the value or failure they produced. Earlier layers
//! attach a [`Session`] and [`RequestItems`] to the request.

use axum::{
    body::{Body, HttpBody, to_bytes},
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use http::{HeaderMap, HeaderValue, StatusCode, header, request::Parts};
use reqtrail_core::context::{RequestContext, RequestPayload, ResponsePayload, Session};
use reqtrail_logging::{EventSink, RequestLogger};
use serde_json::Value;
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::debug;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Request-scoped values set by earlier layers, copied into the log entry.
#[derive(Debug, Clone, Default)]
pub struct RequestItems(pub BTreeMap<String, Value>);

pub struct CaptureState {
    pub logger: Arc<RequestLogger>,
    pub sink: Option<Arc<dyn EventSink>>,
    /// Bodies whose size is unknown or above this are passed through
    /// untouched and not captured.
    pub max_body_bytes: usize,
    next_id: AtomicU64,
}

impl CaptureState {
    pub fn new(
        logger: Arc<RequestLogger>,
        sink: Option<Arc<dyn EventSink>>,
        max_body_bytes: usize,
    ) -> Self {
        Self {
            logger,
            sink,
            max_body_bytes,
            next_id: AtomicU64::new(1),
        }
    }

    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }
}

pub async fn capture_requests(
    State(state): State<Arc<CaptureState>>,
    request: Request,
    next: Next,
) -> Response {
    let started = Instant::now();
    let id = state.next_id();
    let (parts, body) = request.into_parts();

    // Buffered only under body tracking; otherwise streamed through as-is.
    let limit = state.max_body_bytes;
    let fits = body
        .size_hint()
        .upper()
        .is_some_and(|n| n <= limit as u64);
    let (body, captured) = if fits && state.logger.policy().enable_request_body_tracking {
        match to_bytes(body, limit).await {
            Ok(bytes) => (Body::from(bytes.clone()), Some(bytes)),
            Err(e) => {
                debug!(id, error = %e, "Request body could not be read");
                let response = StatusCode::BAD_REQUEST.into_response();
                let mut ctx = context_from_parts(id, &parts, None);
                ctx.status_code = response.status().as_u16();
                state.logger.on_request_completed(
                    &ctx,
                    None,
                    None,
                    started.elapsed(),
                    state.sink.as_deref(),
                );
                return with_request_id(response, id);
            }
        }
    } else {
        (body, None)
    };

    let mut ctx = context_from_parts(id, &parts, captured);
    let mut response = next.run(Request::from_parts(parts, body)).await;

    let payload = response.extensions_mut().remove::<RequestPayload>();
    let result = response.extensions_mut().remove::<ResponsePayload>();
    ctx.status_code = response.status().as_u16();

    state.logger.on_request_completed(
        &ctx,
        payload.as_ref(),
        result.as_ref(),
        started.elapsed(),
        state.sink.as_deref(),
    );

    with_request_id(response, id)
}

fn with_request_id(mut response: Response, id: u64) -> Response {
    response
        .headers_mut()
        .insert(REQUEST_ID_HEADER, HeaderValue::from(id));
    response
}

fn context_from_parts(id: u64, parts: &Parts, body: Option<Bytes>) -> RequestContext {
    let mut ctx = RequestContext::new(id, parts.method.as_str(), absolute_uri(parts));
    ctx.headers = collect_headers(&parts.headers);

    if is_form(&parts.headers) {
        if let Some(bytes) = &body {
            ctx.form_data = url::form_urlencoded::parse(bytes).into_owned().collect();
        }
    }
    ctx.body = body.filter(|b| !b.is_empty());

    ctx.client_ip = parts
        .extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_default();
    ctx.session = parts.extensions.get::<Session>().cloned();
    if let Some(RequestItems(items)) = parts.extensions.get::<RequestItems>() {
        ctx.items = items.clone();
    }
    ctx
}

fn absolute_uri(parts: &Parts) -> String {
    if parts.uri.scheme().is_some() {
        return parts.uri.to_string();
    }
    let host = parts
        .headers
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("localhost");
    let path = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    format!("http://{host}{path}")
}

/// Repeated headers are joined with `", "`.
fn collect_headers(headers: &HeaderMap) -> BTreeMap<String, String> {
    let mut out = BTreeMap::new();
    for (name, value) in headers {
        let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
        match out.entry(name.as_str().to_string()) {
            Entry::Vacant(slot) => {
                slot.insert(value);
            }
            Entry::Occupied(mut slot) => {
                let joined: &mut String = slot.get_mut();
                joined.push_str(", ");
                joined.push_str(&value);
            }
        }
    }
    out
}

fn is_form(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with(FORM_CONTENT_TYPE))
}
