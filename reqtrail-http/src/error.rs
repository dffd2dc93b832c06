use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use reqtrail_core::TrailError;

/// Admin handler error, rendered as the JSON body of [`TrailError`].
#[derive(Debug)]
pub struct ApiError(pub TrailError);

impl From<TrailError> for ApiError {
    fn from(err: TrailError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (
            status,
            [(header::CONTENT_TYPE, "application/json")],
            self.0.to_json_body(),
        )
            .into_response()
    }
}
