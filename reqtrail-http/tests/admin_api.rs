//! Integration tests for the admin query API.
//!
//! Uses `tower::ServiceExt::oneshot` to call handlers without binding a real
//! TCP port. Every test gets a fresh logger.

use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, StatusCode};
use reqtrail_core::RequestContext;
use reqtrail_core::policy::PolicyView;
use reqtrail_http::server::{AdminState, build_admin_router};
use reqtrail_logging::RequestLogger;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt; // .oneshot()

// ── Helper ────────────────────────────────────────────────────

fn make_state(logger: Option<Arc<RequestLogger>>, api_key: Option<&str>) -> Arc<AdminState> {
    Arc::new(AdminState {
        logger,
        api_key: api_key.map(str::to_string),
        at_rest_path: "/requestlogs".into(),
    })
}

fn logger_with(ids: &[u64]) -> Arc<RequestLogger> {
    let logger = Arc::new(RequestLogger::default());
    for &id in ids {
        let ctx = RequestContext::new(id, "GET", format!("http://localhost/items/{id}"));
        logger.on_request_completed(&ctx, None, None, Duration::from_millis(2), None);
    }
    logger
}

fn get_req(uri: &str) -> Request<Body> {
    Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn json_put(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(Method::PUT)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(resp: axum::response::Response) -> serde_json::Value {
    let bytes = to_bytes(resp.into_body(), 1024 * 1024).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn result_ids(body: &serde_json::Value) -> Vec<u64> {
    body["results"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["id"].as_u64().unwrap())
        .collect()
}

// ── Recent entries ────────────────────────────────────────────

#[tokio::test]
async fn list_returns_most_recent_first() {
    let app = build_admin_router(make_state(Some(logger_with(&[1, 2, 3])), None));
    let resp = app.oneshot(get_req("/requestlogs")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let body = body_json(resp).await;
    assert_eq!(result_ids(&body), vec![3, 2, 1]);
    assert_eq!(body["total"], 3);
    assert_eq!(body["results"][0]["path"], "/items/3");
}

#[tokio::test]
async fn list_honours_skip_and_take() {
    let app = build_admin_router(make_state(Some(logger_with(&[1, 2, 3, 4, 5])), None));
    let resp = app
        .oneshot(get_req("/requestlogs?skip=1&take=2"))
        .await
        .unwrap();
    let body = body_json(resp).await;
    assert_eq!(result_ids(&body), vec![4, 3]);
    assert_eq!(body["total"], 5);
}

#[tokio::test]
async fn list_on_empty_buffer_is_empty() {
    let app = build_admin_router(make_state(Some(logger_with(&[])), None));
    let resp = app.oneshot(get_req("/requestlogs")).await.unwrap();
    let body = body_json(resp).await;
    assert!(body["results"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn missing_logger_is_a_server_error() {
    let app = build_admin_router(make_state(None, None));
    let resp = app.oneshot(get_req("/requestlogs")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body = body_json(resp).await;
    assert!(body["error"].as_str().unwrap().contains("not registered"));
}

// ── Access ────────────────────────────────────────────────────

#[tokio::test]
async fn wrong_or_missing_api_key_is_forbidden() {
    let state = make_state(Some(logger_with(&[1])), Some("s3cret"));

    let resp = build_admin_router(state.clone())
        .oneshot(get_req("/requestlogs"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let req = Request::builder()
        .uri("/requestlogs")
        .header("x-api-key", "guess")
        .body(Body::empty())
        .unwrap();
    let resp = build_admin_router(state).oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn correct_api_key_is_accepted() {
    let state = make_state(Some(logger_with(&[1])), Some("s3cret"));
    let req = Request::builder()
        .uri("/requestlogs")
        .header("x-api-key", "s3cret")
        .body(Body::empty())
        .unwrap();
    let resp = build_admin_router(state).oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn forbidden_request_does_not_touch_buffer() {
    let logger = logger_with(&[1]);
    let state = make_state(Some(logger.clone()), Some("s3cret"));
    let _ = build_admin_router(state)
        .oneshot(json_put(
            "/requestlogs/policy",
            serde_json::json!({ "enable_error_tracking": true }),
        ))
        .await
        .unwrap();
    assert_eq!(logger.store().len(), 1);
    assert!(!logger.policy().enable_error_tracking);
}

// ── Policy ────────────────────────────────────────────────────

#[tokio::test]
async fn get_policy_reports_defaults() {
    let app = build_admin_router(make_state(Some(logger_with(&[])), None));
    let resp = app.oneshot(get_req("/requestlogs/policy")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let view: PolicyView = serde_json::from_value(body_json(resp).await).unwrap();
    assert!(!view.enable_session_tracking);
    assert!(!view.limit_to_service_requests);
    assert!(view.required_roles.is_empty());
    assert!(!view.has_skip_predicate);
}

#[tokio::test]
async fn put_policy_applies_partial_update() {
    let logger = logger_with(&[]);
    logger.set_session_tracking(true);
    let app = build_admin_router(make_state(Some(logger.clone()), None));

    let resp = app
        .oneshot(json_put(
            "/requestlogs/policy",
            serde_json::json!({
                "enable_request_body_tracking": true,
                "excluded_kinds": ["Ping"]
            }),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let view: PolicyView = serde_json::from_value(body_json(resp).await).unwrap();
    assert!(view.enable_request_body_tracking);
    assert!(view.enable_session_tracking);
    assert!(view.excluded_kinds.contains("Ping"));
    assert!(logger.policy().excludes("Ping"));
}

#[tokio::test]
async fn put_policy_rejects_unknown_fields() {
    let logger = logger_with(&[]);
    let app = build_admin_router(make_state(Some(logger.clone()), None));
    let resp = app
        .oneshot(json_put(
            "/requestlogs/policy",
            serde_json::json!({ "enable_everything": true }),
        ))
        .await
        .unwrap();
    assert!(resp.status().is_client_error());
}

// ── Health ────────────────────────────────────────────────────

#[tokio::test]
async fn health_reports_buffer_occupancy() {
    let app = build_admin_router(make_state(Some(logger_with(&[1, 2])), None));
    let resp = app.oneshot(get_req("/requestlogs/health")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let body = body_json(resp).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["logger_registered"], true);
    assert_eq!(body["buffer"]["len"], 2);
    assert_eq!(body["buffer"]["capacity"], 1000);
}

#[tokio::test]
async fn custom_rest_path_is_honoured() {
    let state = Arc::new(AdminState {
        logger: Some(logger_with(&[7])),
        api_key: None,
        at_rest_path: "/ops/logs/".into(),
    });
    let resp = build_admin_router(state.clone())
        .oneshot(get_req("/ops/logs"))
        .await
        .unwrap();
    assert_eq!(result_ids(&body_json(resp).await), vec![7]);

    let resp = build_admin_router(state)
        .oneshot(get_req("/requestlogs"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
