//! Request and response types for the dashboard API.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use jobstats_core::StatsError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Query string of `GET /v1/stats`.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct StatsQuery {
    pub days: Option<i64>,
}

/// JSON error body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthBody {
    pub status: String,
}

/// Errors surfaced by API handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Stats(#[from] StatsError),

    #[error("Metrics rendering failed: {0}")]
    Metrics(#[from] jobstats_telemetry::TelemetryError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Stats(StatsError::InvalidInput(_)) => StatusCode::BAD_REQUEST,
            Self::Stats(StatsError::StoreClosed) | Self::Stats(StatsError::Cancelled) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            Self::Stats(StatsError::StorageFailure(_)) | Self::Metrics(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (StatsError::InvalidInput("x".into()), StatusCode::BAD_REQUEST),
            (
                StatsError::StorageFailure("disk".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (StatsError::StoreClosed, StatusCode::SERVICE_UNAVAILABLE),
            (StatsError::Cancelled, StatusCode::SERVICE_UNAVAILABLE),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status(), status);
        }
    }
}
