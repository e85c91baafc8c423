//! HTTP rendering of boundary errors.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::{debug, error, warn};

use carefund_core::FundingError;
use carefund_shared::AppError;

/// Result type for handlers.
pub type ApiResult<T> = Result<T, ApiError>;

/// An [`AppError`] on its way out as an HTTP response.
#[derive(Debug)]
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

impl From<FundingError> for ApiError {
    fn from(err: FundingError) -> Self {
        Self(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let err = self.0;
        match &err {
            AppError::Internal(detail) => error!(error = %detail, "Request failed"),
            AppError::Gateway { message, retryable } => {
                warn!(error = %message, retryable, "Payment gateway error");
            }
            other => debug!(error = %other, "Request rejected"),
        }

        let status =
            StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (
            status,
            Json(json!({
                "success": false,
                "message": err.public_message(),
                "data": {
                    "error": err.error_code(),
                    "kind": err.kind(),
                }
            })),
        )
            .into_response()
    }
}
