pub mod auth;
pub mod proposals;
pub mod sync;

use axum::{http::StatusCode, Json};
use serde_json::{json, Value};

pub type ApiError = (StatusCode, Json<Value>);

pub(crate) fn error_response(status: StatusCode, message: impl Into<String>) -> ApiError {
    (status, Json(json!({ "message": message.into() })))
}
