use axum::{
    Json,
    extract::multipart::{MultipartError, MultipartRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use fraud_model::PredictError;
use tracing::{error, warn};

use crate::models::ErrorBody;

/// HTTP-facing error: a status code plus the `detail` string sent to the
/// client.
#[derive(Debug, thiserror::Error)]
#[error("{detail}")]
pub struct ApiError {
    pub status: StatusCode,
    pub detail: String,
}

impl ApiError {
    pub fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorBody { detail: self.detail })).into_response()
    }
}

impl From<PredictError> for ApiError {
    fn from(err: PredictError) -> Self {
        let status = match &err {
            PredictError::ModelUnavailable | PredictError::Processing(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            PredictError::UnsupportedFormat | PredictError::MissingColumns(_) => {
                StatusCode::BAD_REQUEST
            }
        };

        if status.is_server_error() {
            error!(error = %err, "Prediction request failed");
        } else {
            warn!(error = %err, "Prediction request rejected");
        }

        Self::new(status, err.to_string())
    }
}

impl From<MultipartRejection> for ApiError {
    fn from(rejection: MultipartRejection) -> Self {
        warn!(error = %rejection.body_text(), "Rejected upload");
        Self::new(rejection.status(), rejection.body_text())
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        warn!(error = %err.body_text(), "Failed to read multipart upload");
        Self::new(err.status(), err.body_text())
    }
}
