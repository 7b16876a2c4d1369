use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tts_core::TtsError;

/// API Error types
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Synthesis error: {0}")]
    Tts(#[from] TtsError),
}

/// Error response structure
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    code: u16,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            ApiError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
            // Normalization and phonemization failures are caused by the
            // request text; everything downstream is a server fault.
            ApiError::Tts(e @ (TtsError::Normalization(_) | TtsError::Phonemization(_))) => {
                (StatusCode::BAD_REQUEST, e.to_string())
            }
            ApiError::Tts(e @ TtsError::ModelUnavailable(_)) => {
                tracing::error!("Model unavailable: {e}");
                (StatusCode::SERVICE_UNAVAILABLE, e.to_string())
            }
            ApiError::Tts(e @ TtsError::Timeout(_)) => {
                tracing::error!("Synthesis timeout: {e}");
                (StatusCode::GATEWAY_TIMEOUT, e.to_string())
            }
            ApiError::Tts(e) => {
                tracing::error!("Synthesis error: {e}");
                (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
            }
        };

        let body = Json(ErrorResponse {
            error: error_message,
            code: status.as_u16(),
        });

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: ApiError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            status_of(ApiError::InvalidInput("bad".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(ApiError::Tts(TtsError::Phonemization("x".into()))),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(ApiError::Tts(TtsError::Inference("x".into()))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_of(ApiError::Tts(TtsError::Assembly("x".into()))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_of(ApiError::Tts(TtsError::ModelUnavailable("x".into()))),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status_of(ApiError::Tts(TtsError::Timeout(30000))),
            StatusCode::GATEWAY_TIMEOUT
        );
    }
}
