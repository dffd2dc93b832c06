//! Small demo service the binary mounts behind the capture layer.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use reqtrail_core::context::{Failure, Fault, RequestPayload, ResponsePayload};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EchoRequest {
    pub text: String,
}

pub fn routes() -> Router {
    Router::new()
        .route("/ping", get(ping))
        .route("/echo", post(echo))
        .route("/fail", get(fail))
}

async fn ping() -> impl IntoResponse {
    let body = json!({ "pong": true });
    (
        Extension(RequestPayload::new("Ping", Value::Null)),
        Extension(ResponsePayload::Value(body.clone())),
        Json(body),
    )
}

async fn echo(Json(req): Json<EchoRequest>) -> impl IntoResponse {
    let body = json!({ "echo": req.text });
    let payload = serde_json::to_value(&req).unwrap_or(Value::Null);
    (
        Extension(RequestPayload::new("Echo", payload)),
        Extension(ResponsePayload::Value(body.clone())),
        Json(body),
    )
}

async fn fail() -> impl IntoResponse {
    let fault = Fault::new("ServiceError", "request failed")
        .caused_by(Fault::new("TimeoutError", "upstream timed out").with_source("demo"));
    let status = fault.unwrap_once().to_status();
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Extension(RequestPayload::new("Fail", Value::Null)),
        Extension(ResponsePayload::Failure(Failure::Exception(fault))),
        Json(json!({ "response_status": status })),
    )
}
