//! HTTP error response mapping.

use std::error::Error as _;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use repairdesk_domain::error::RepairDeskError;

/// JSON error body returned by API endpoints.
#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

/// Maps [`RepairDeskError`] to an HTTP response with appropriate status code.
#[derive(Debug)]
pub enum ApiError {
    /// A use-case rejected the request.
    Domain(RepairDeskError),
    /// The `x-user-id` header is missing or not a user id.
    Unauthenticated,
}

impl From<RepairDeskError> for ApiError {
    fn from(err: RepairDeskError) -> Self {
        Self::Domain(err)
    }
}

impl ApiError {
    fn status_and_message(&self) -> (StatusCode, String) {
        let err = match self {
            Self::Unauthenticated => {
                return (
                    StatusCode::UNAUTHORIZED,
                    "missing or invalid x-user-id header".to_string(),
                );
            }
            Self::Domain(err) => err,
        };
        let status = match err {
            RepairDeskError::Validation(_) => StatusCode::BAD_REQUEST,
            RepairDeskError::NotFound(_) => StatusCode::NOT_FOUND,
            RepairDeskError::Forbidden(_) => StatusCode::FORBIDDEN,
            RepairDeskError::InvalidTransition(_)
            | RepairDeskError::InsufficientStock(_)
            | RepairDeskError::AlreadyReturned(_)
            | RepairDeskError::PartInUse(_)
            | RepairDeskError::Conflict(_) => StatusCode::CONFLICT,
            RepairDeskError::Storage(inner) => {
                tracing::error!(error = %inner, "storage error");
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                );
            }
        };
        // Every other variant wraps a typed error with the useful message.
        let message = err
            .source()
            .map_or_else(|| err.to_string(), |source| source.to_string());
        (status, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();
        (status, Json(ErrorBody { error: message })).into_response()
    }
}
