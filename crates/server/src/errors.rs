use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use common::types::ErrorBody;
use service::errors::{ServiceError, StoreError};
use thiserror::Error;

/// Errors surfaced to HTTP clients. Backend diagnostics only travel in
/// `details`; the `error` text is fixed per variant.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Name is required")]
    Validation,
    #[error("Database not connected")]
    StoreUnavailable,
    #[error("Failed to add name")]
    Write(String),
    #[error("Failed to retrieve names")]
    Read(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation => StatusCode::BAD_REQUEST,
            ApiError::StoreUnavailable | ApiError::Write(_) | ApiError::Read(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn details(&self) -> Option<String> {
        match self {
            ApiError::Write(d) | ApiError::Read(d) => Some(d.clone()),
            _ => None,
        }
    }
}

impl From<ServiceError> for ApiError {
    fn from(e: ServiceError) -> Self {
        match e {
            ServiceError::Validation(_) => ApiError::Validation,
            ServiceError::Store(StoreError::Unavailable | StoreError::Connect(_)) => {
                ApiError::StoreUnavailable
            }
            ServiceError::Store(StoreError::Write(d)) => ApiError::Write(d),
            ServiceError::Store(StoreError::Read(d)) => ApiError::Read(d),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorBody { error: self.to_string(), details: self.details() };
        (status, Json(body)).into_response()
    }
}
