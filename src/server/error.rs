//! Error-to-HTTP response conversion.
//!
//! The info route answers with JSON error bodies, the download route with
//! plain text. Both share [`ApiError`] for classification.

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tubeforged_av::PlanError;

pub const NO_STORE: &str = "no-store, max-age=0";

/// Every way a request can fail.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Missing or unusable input.
    #[error("{0}")]
    Validation(String),

    #[error("Access blocked by YouTube. Try a different URL or add cookies.")]
    UpstreamBlocked { details: String },

    #[error("This video is private or age-restricted.")]
    UpstreamRestricted { details: String },

    #[error("Malformed info object from extractor.")]
    UpstreamMalformed { details: String },

    #[error("This endpoint does not support playlists")]
    PlaylistUnsupported,

    /// E.g. video without audio.
    #[error("{0}")]
    UnsupportedMediaCombination(String),

    #[error("No valid input URL found in info response")]
    MissingInput,

    /// The info route answered with a non-200 status.
    #[error("Info fetch failed: {0}")]
    ResolverRejected(String),

    /// The transcoder could not be started or died before producing output.
    #[error("FFmpeg error: {0}")]
    ProcessLaunch(String),

    /// Catch-all for extractor failures on the info route.
    #[error("Failed to fetch video info")]
    ExtractionFailed { details: String },

    /// Catch-all for everything else.
    #[error("Processing failed: {0}")]
    Unknown(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_)
            | ApiError::PlaylistUnsupported
            | ApiError::UnsupportedMediaCombination(_)
            | ApiError::MissingInput
            | ApiError::ResolverRejected(_) => StatusCode::BAD_REQUEST,
            ApiError::UpstreamBlocked { .. } | ApiError::UpstreamRestricted { .. } => {
                StatusCode::FORBIDDEN
            }
            ApiError::UpstreamMalformed { .. }
            | ApiError::ProcessLaunch(_)
            | ApiError::ExtractionFailed { .. }
            | ApiError::Unknown(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "validation_error",
            ApiError::UpstreamBlocked { .. } => "blocked",
            ApiError::UpstreamRestricted { .. } => "restricted",
            ApiError::UpstreamMalformed { .. } => "malformed_upstream",
            ApiError::PlaylistUnsupported => "playlist_unsupported",
            ApiError::UnsupportedMediaCombination(_) => "unsupported_media",
            ApiError::MissingInput => "missing_input",
            ApiError::ResolverRejected(_) => "resolver_rejected",
            ApiError::ProcessLaunch(_) => "process_error",
            ApiError::ExtractionFailed { .. } => "extraction_failed",
            ApiError::Unknown(_) => "internal_error",
        }
    }

    pub fn details(&self) -> Option<&str> {
        match self {
            ApiError::UpstreamBlocked { details }
            | ApiError::UpstreamRestricted { details }
            | ApiError::UpstreamMalformed { details }
            | ApiError::ExtractionFailed { details } => Some(details),
            _ => None,
        }
    }

    fn log(&self) {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(status = %status, error = %self, details = ?self.details(), "request failed");
        } else {
            tracing::debug!(status = %status, error = %self, "request rejected");
        }
    }

    /// Plain-text rendition for the streaming route.
    pub fn into_plain_response(self) -> Response {
        self.log();
        let mut response = (self.status(), self.to_string()).into_response();
        response
            .headers_mut()
            .insert(header::CACHE_CONTROL, HeaderValue::from_static(NO_STORE));
        response
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        self.log();

        let body = json!({
            "error": self.to_string(),
            "details": self.details(),
            "code": self.code(),
        });

        let mut response = (self.status(), axum::Json(body)).into_response();
        response
            .headers_mut()
            .insert(header::CACHE_CONTROL, HeaderValue::from_static(NO_STORE));
        response
    }
}

impl From<tubeforged_av::Error> for ApiError {
    fn from(e: tubeforged_av::Error) -> Self {
        use tubeforged_av::Error;
        match e {
            Error::Blocked { message } => ApiError::UpstreamBlocked { details: message },
            Error::Restricted { message } => ApiError::UpstreamRestricted { details: message },
            Error::Malformed { message } => ApiError::UpstreamMalformed { details: message },
            Error::ParseError { message, .. } => ApiError::UpstreamMalformed { details: message },
            Error::InvalidInput(message) => ApiError::Validation(message),
            other => ApiError::ExtractionFailed {
                details: other.to_string(),
            },
        }
    }
}

impl From<PlanError> for ApiError {
    fn from(e: PlanError) -> Self {
        match e {
            PlanError::Playlist => ApiError::PlaylistUnsupported,
            PlanError::VideoWithoutAudio => ApiError::UnsupportedMediaCombination(e.to_string()),
            PlanError::NoInput => ApiError::MissingInput,
        }
    }
}
