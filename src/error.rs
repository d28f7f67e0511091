use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;
use utoipa::ToSchema;

use crate::repo::RepoError;
use crate::storage::MediaStoreError;

#[derive(Debug, Serialize, ToSchema)]
pub struct ApiErrorBody {
    pub error: String,
}

#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("{0}")] Validation(String),
    #[error("Invalid credentials")] Auth,
    #[error("{0}")] NotFound(String),
    #[error("{0}")] Conflict(String),
    #[error("{0}")] State(String),
    #[error("{0}")] PayloadTooLarge(String),
    #[error("{0}")] UnsupportedMedia(String),
    #[error("Too many requests")] TooManyRequests,
    #[error("Internal server error")] Internal,
}

impl ApiError {
    pub fn validation(msg: impl Into<String>) -> Self { ApiError::Validation(msg.into()) }
    pub fn not_found(msg: impl Into<String>) -> Self { ApiError::NotFound(msg.into()) }
}

impl From<RepoError> for ApiError {
    fn from(e: RepoError) -> Self {
        match e {
            RepoError::NotFound(what) => ApiError::NotFound(format!("{what} not found")),
            RepoError::Conflict(msg) => ApiError::Conflict(msg),
            RepoError::InvalidState(msg) => ApiError::State(msg),
            RepoError::Internal(msg) => {
                tracing::error!("store failure: {msg}");
                ApiError::Internal
            }
        }
    }
}

impl From<MediaStoreError> for ApiError {
    fn from(e: MediaStoreError) -> Self {
        match e {
            MediaStoreError::TooLarge { .. } => ApiError::PayloadTooLarge(e.to_string()),
            MediaStoreError::UnsupportedFormat(_) => ApiError::UnsupportedMedia(e.to_string()),
            MediaStoreError::NotFound => ApiError::not_found("Media not found"),
            MediaStoreError::Other(msg) => {
                tracing::error!("media store failure: {msg}");
                ApiError::Internal
            }
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> actix_web::http::StatusCode {
        use actix_web::http::StatusCode;
        match self {
            ApiError::Validation(_) | ApiError::State(_) => StatusCode::BAD_REQUEST,
            ApiError::Auth => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::UnsupportedMedia(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ApiError::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ApiErrorBody { error: self.to_string() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::StatusCode;

    #[test]
    fn state_errors_are_bad_requests() {
        let e: ApiError = RepoError::InvalidState("Submission has already been reviewed".into()).into();
        assert_eq!(e.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(e.to_string(), "Submission has already been reviewed");
    }

    #[test]
    fn internal_details_are_not_leaked() {
        let e: ApiError = RepoError::Internal("disk full at /var/data".into()).into();
        assert_eq!(e.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(e.to_string(), "Internal server error");
    }
}
