//! API error handling

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::utilities::errors::{MapsError, TranscriptionError};

/// Error returned by a route: status plus `{"error": message}` body.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            status,
            message: msg.into(),
        }
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, msg)
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, msg)
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, msg)
    }

    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, msg)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

impl From<TranscriptionError> for ApiError {
    fn from(err: TranscriptionError) -> Self {
        match err {
            TranscriptionError::FfmpegUnavailable => ApiError::unavailable(
                "FFmpeg is not available on this server. Audio conversion cannot be performed.",
            ),
            TranscriptionError::Conversion(_) => ApiError::internal("Failed to convert audio format"),
            TranscriptionError::Generation(_) => ApiError::internal("Could not transcribe audio"),
            TranscriptionError::Io(e) => ApiError::internal(format!("Error processing audio: {}", e)),
        }
    }
}

impl From<MapsError> for ApiError {
    fn from(err: MapsError) -> Self {
        match err {
            MapsError::MissingApiKey => ApiError::unavailable(err.to_string()),
            MapsError::InvalidBaseUrl(_) => ApiError::internal(err.to_string()),
            _ => ApiError::new(StatusCode::BAD_GATEWAY, err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utilities::errors::GenerationError;

    #[test]
    fn test_transcription_error_statuses() {
        let e: ApiError = TranscriptionError::FfmpegUnavailable.into();
        assert_eq!(e.status, StatusCode::SERVICE_UNAVAILABLE);

        let e: ApiError = TranscriptionError::Conversion("bad".into()).into();
        assert_eq!(e.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(e.message, "Failed to convert audio format");

        let e: ApiError = TranscriptionError::Generation(GenerationError::Empty).into();
        assert_eq!(e.message, "Could not transcribe audio");
    }

    #[test]
    fn test_maps_error_statuses() {
        let e: ApiError = MapsError::MissingApiKey.into();
        assert_eq!(e.status, StatusCode::SERVICE_UNAVAILABLE);
        let e: ApiError = MapsError::Status {
            status: 403,
            body: "forbidden".into(),
        }
        .into();
        assert_eq!(e.status, StatusCode::BAD_GATEWAY);
    }
}
