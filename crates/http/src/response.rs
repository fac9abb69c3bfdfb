//! Success envelope shared by every module handler.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// `{ "data", "message", "status" }` response body.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ApiResponse<T> {
    pub data: T,
    pub message: String,
    pub status: u16,
}

impl<T> ApiResponse<T> {
    pub fn new(status: StatusCode, data: T, message: impl Into<String>) -> Self {
        Self {
            data,
            message: message.into(),
            status: status.as_u16(),
        }
    }

    /// 200 OK
    pub fn ok(data: T, message: impl Into<String>) -> Self {
        Self::new(StatusCode::OK, data, message)
    }

    /// 201 Created
    pub fn created(data: T, message: impl Into<String>) -> Self {
        Self::new(StatusCode::CREATED, data, message)
    }

    /// 202 Accepted
    pub fn accepted(data: T, message: impl Into<String>) -> Self {
        Self::new(StatusCode::ACCEPTED, data, message)
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ApiResponse<U> {
        ApiResponse {
            data: f(self.data),
            message: self.message,
            status: self.status,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::OK);
        (status, Json(self)).into_response()
    }
}
