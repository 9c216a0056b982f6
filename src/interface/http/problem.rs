use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::error;

use crate::domain::errors::{PasteError, StoreError};

pub const INVALID_BODY_MESSAGE: &str = "Invalid request body";
pub const NOT_FOUND_MESSAGE: &str = "paste not found";

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn from_paste_error(err: PasteError) -> Self {
        match err {
            PasteError::Validation(message) => Self::new(StatusCode::BAD_REQUEST, message),
            PasteError::NotFound => Self::new(StatusCode::NOT_FOUND, NOT_FOUND_MESSAGE),
            PasteError::StoreUnavailable(detail) => {
                error!(error = %detail, "paste store unavailable");
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Storage unavailable")
            }
            PasteError::Internal(detail) => {
                error!(error = %detail, "internal error");
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        }
    }

    pub fn invalid_body() -> Self {
        Self::new(StatusCode::BAD_REQUEST, INVALID_BODY_MESSAGE)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl From<PasteError> for ApiError {
    fn from(err: PasteError) -> Self {
        Self::from_paste_error(err)
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        Self::from_paste_error(PasteError::from(err))
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorBody {
                error: self.message,
            }),
        )
            .into_response()
    }
}
