//! API-facing error type
//!
//! Every handler returns `Result<_, ApiError>`; the error renders as a JSON
//! body of the shape `{"detail": "..."}` with the matching status code.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

use crate::services::ads::AdsError;
use crate::services::arxiv::ArxivError;
use crate::services::pdf::PdfError;
use crate::storage::DatabaseError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Upstream(String),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ApiError::Database(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("{}", self);
        }
        let body = Json(serde_json::json!({ "detail": self.to_string() }));
        (status, body).into_response()
    }
}

impl From<ArxivError> for ApiError {
    fn from(err: ArxivError) -> Self {
        match err {
            ArxivError::InvalidId(_) | ArxivError::NotFound(_) => {
                ApiError::BadRequest(err.to_string())
            }
            ArxivError::Request(_) | ArxivError::Parse(_) => ApiError::Upstream(err.to_string()),
        }
    }
}

impl From<AdsError> for ApiError {
    fn from(err: AdsError) -> Self {
        match err {
            AdsError::MissingKey => ApiError::BadRequest(err.to_string()),
            _ => ApiError::Upstream(err.to_string()),
        }
    }
}

impl From<PdfError> for ApiError {
    fn from(err: PdfError) -> Self {
        match err {
            PdfError::Io(_) => ApiError::Internal(err.to_string()),
            _ => ApiError::Upstream(err.to_string()),
        }
    }
}

impl From<std::io::Error> for ApiError {
    fn from(err: std::io::Error) -> Self {
        ApiError::Internal(format!("I/O error: {}", err))
    }
}

impl From<minijinja::Error> for ApiError {
    fn from(err: minijinja::Error) -> Self {
        ApiError::Internal(format!("Template error: {}", err))
    }
}
