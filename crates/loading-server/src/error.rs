use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::{AllocationError, ErrorKind, PalletConflict};
use serde::Serialize;
use tracing::{error, warn};

/// Everything a handler can fail with.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Allocation(#[from] AllocationError),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Debug, Serialize)]
pub struct ErrorBody<'a> {
    pub error: &'static str,
    pub kind: &'static str,
    pub message: String,
    pub retryable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conflicts: Option<&'a [PalletConflict]>,
}

fn kind_name(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::Validation => "validation",
        ErrorKind::Conflict => "conflict",
        ErrorKind::NotFound => "not_found",
        ErrorKind::Infrastructure => "infrastructure",
    }
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Allocation(err) => match err.kind() {
                ErrorKind::Validation | ErrorKind::Conflict => StatusCode::BAD_REQUEST,
                ErrorKind::NotFound => StatusCode::NOT_FOUND,
                ErrorKind::Infrastructure => StatusCode::SERVICE_UNAVAILABLE,
            },
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error = status.canonical_reason().unwrap_or("Error");

        let body = match &self {
            Self::Allocation(err) => {
                let kind = err.kind();
                // Storage details stay in the log.
                let message = match kind {
                    ErrorKind::Infrastructure => {
                        error!(error = %err, "Allocation failed on the store");
                        "The store could not complete the request, try again".to_string()
                    }
                    ErrorKind::Conflict => {
                        warn!(error = %err, "Allocation rejected");
                        err.to_string()
                    }
                    _ => err.to_string(),
                };
                ErrorBody {
                    error,
                    kind: kind_name(kind),
                    message,
                    retryable: err.is_retryable(),
                    conflicts: err.conflicts(),
                }
            }
            Self::BadRequest(message) => ErrorBody {
                error,
                kind: kind_name(ErrorKind::Validation),
                message: message.clone(),
                retryable: false,
                conflicts: None,
            },
            Self::Internal(detail) => {
                error!(error = %detail, "Request failed");
                ErrorBody {
                    error,
                    kind: "internal",
                    message: "Internal server error".to_string(),
                    retryable: false,
                    conflicts: None,
                }
            }
        };

        (status, Json(body)).into_response()
    }
}
