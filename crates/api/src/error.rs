//! Mapping of domain errors onto HTTP responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use qrcloud_core::encoder::EncodeError;
use qrcloud_core::retrieval::RetrievalError;
use qrcloud_core::upload::UploadError;
use qrcloud_shared::AppError;
use serde_json::json;
use tracing::error;

/// Error returned by handlers.
#[derive(Debug)]
pub struct ApiError(pub AppError);

impl ApiError {
    /// Bad request.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self(AppError::Validation(msg.into()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            error!(error = %self.0, "Request failed");
        }
        (
            status,
            Json(json!({
                "error": self.0.error_code().to_ascii_lowercase(),
                "message": self.0.to_string(),
            })),
        )
            .into_response()
    }
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

impl From<EncodeError> for ApiError {
    fn from(err: EncodeError) -> Self {
        match err {
            EncodeError::InvalidOptions(_) | EncodeError::Symbol(_) => {
                Self(AppError::Validation(err.to_string()))
            }
            EncodeError::Image(_) => Self(AppError::Internal(err.to_string())),
        }
    }
}

impl From<UploadError> for ApiError {
    fn from(err: UploadError) -> Self {
        Self(AppError::Validation(err.to_string()))
    }
}

impl From<RetrievalError> for ApiError {
    fn from(err: RetrievalError) -> Self {
        let app = match err {
            RetrievalError::NotFound(_) | RetrievalError::NotStored(_) => {
                AppError::NotFound(err.to_string())
            }
            RetrievalError::Unavailable { .. } => AppError::ServiceUnavailable(err.to_string()),
            RetrievalError::Store(_) => AppError::Internal(err.to_string()),
        };
        Self(app)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qrcloud_shared::types::ArtifactId;
    use rstest::rstest;

    #[rstest]
    #[case(RetrievalError::NotFound(ArtifactId::new()), StatusCode::NOT_FOUND)]
    #[case(RetrievalError::NotStored(ArtifactId::new()), StatusCode::NOT_FOUND)]
    #[case(
        RetrievalError::Unavailable { artifact_id: ArtifactId::new(), attempts: vec![] },
        StatusCode::SERVICE_UNAVAILABLE
    )]
    #[case(RetrievalError::store("down"), StatusCode::INTERNAL_SERVER_ERROR)]
    fn test_retrieval_error_status(#[case] err: RetrievalError, #[case] status: StatusCode) {
        assert_eq!(ApiError::from(err).into_response().status(), status);
    }

    #[test]
    fn test_upload_error_is_bad_request() {
        let response = ApiError::from(UploadError::empty()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
