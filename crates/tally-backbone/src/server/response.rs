use axum::{
    http::{header::ETAG, HeaderName, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use tracing::error;

pub(crate) fn handle_internal_server_error<E: std::error::Error + ?Sized>(e: &E) -> impl IntoResponse {
    error!(error = %e, "unhandled error occurred.");
    (StatusCode::INTERNAL_SERVER_ERROR, error_payload("INTERNAL_SERVER_ERROR", "internal server error occurred."))
}

#[derive(Serialize, Debug)]
pub(crate) struct ErrorPayload<'a, D: Serialize> {
    code: &'a str,
    message: &'a str,
    data: D,
}

#[derive(Serialize, Debug)]
pub(crate) struct EmptyData {}

pub fn error_payload<'a>(code: &'a str, message: &'a str) -> Json<ErrorPayload<'a, EmptyData>> {
    Json(ErrorPayload { code, message, data: EmptyData {} })
}

/// `ETag` header carrying the version a client must echo back in `If-Match`.
///
/// The header value is a quoted entity tag; the body's `etag` field stays bare.
pub fn etag_header(etag: String) -> [(HeaderName, String); 1] {
    [(ETAG, format!("\"{etag}\""))]
}

#[derive(Serialize, Debug, PartialEq, Eq)]
pub(crate) struct Meta {
    pub count: u64,
}

pub(crate) fn error_response(status: StatusCode, code: &str, message: &str) -> axum::response::Response {
    (status, error_payload(code, message)).into_response()
}
