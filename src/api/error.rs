use crate::error::ServiceDeskError;
use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tracing::{error, warn};

/// Body of every error response
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub message: String,
}

/// Engine error on its way out over HTTP
#[derive(Debug)]
pub struct ApiError(pub ServiceDeskError);

impl ApiError {
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match &self.0 {
            ServiceDeskError::NotFound { .. } => StatusCode::NOT_FOUND,
            ServiceDeskError::Forbidden { .. } => StatusCode::FORBIDDEN,
            ServiceDeskError::TechnicianUnavailable { .. }
            | ServiceDeskError::CapacityExceeded { .. }
            | ServiceDeskError::InvalidTransition { .. }
            | ServiceDeskError::AlreadyClosed { .. }
            | ServiceDeskError::Conflict { .. } => StatusCode::CONFLICT,
            ServiceDeskError::ValidationError(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ServiceDeskError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ServiceDeskError> for ApiError {
    fn from(error: ServiceDeskError) -> Self {
        Self(error)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(ServiceDeskError::validation(rejection.body_text()))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self(ServiceDeskError::validation(rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Request failed: {}", self.0);
        } else {
            warn!("Request rejected: {}", self.0);
        }
        let body = ErrorBody {
            error: self.0.code(),
            message: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
