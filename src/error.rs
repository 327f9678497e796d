use axum::Json;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::database::StoreError;

/// 用户目录返回的错误，缓存错误不会出现在这里
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DirectoryError {
    #[error("{0}")]
    Validation(&'static str),
    #[error(transparent)]
    StoreUnavailable(#[from] StoreError),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl IntoResponse for DirectoryError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            DirectoryError::Validation(message) => (StatusCode::BAD_REQUEST, message.to_string()),
            DirectoryError::StoreUnavailable(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };

        (status, Json(ErrorResponse { error })).into_response()
    }
}
