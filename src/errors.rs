use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum AppError {
    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Backend timed out: {0}")]
    BackendTimeout(String),

    #[error("Backend error: {0}")]
    BackendError(String),

    #[error("Schema violation: {0}")]
    SchemaViolation(String),

    // The raw model output is kept for logging, it never reaches the client.
    #[error("Malformed model output: {reason}")]
    MalformedOutput { reason: String, raw: String },

    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),

    #[error("Error processing file: {0}")]
    FileProcessingError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("Internal server error: {0}")]
    InternalError(String),
}

impl AppError {
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::BackendUnavailable(_) => "BACKEND_UNAVAILABLE",
            AppError::BackendTimeout(_) => "BACKEND_TIMEOUT",
            AppError::BackendError(_) => "BACKEND_ERROR",
            AppError::SchemaViolation(_) => "SCHEMA_VIOLATION",
            AppError::MalformedOutput { .. } => "MALFORMED_OUTPUT",
            AppError::UnsupportedFileType(_) => "UNSUPPORTED_FILE_TYPE",
            AppError::FileProcessingError(_) => "FILE_PROCESSING_ERROR",
            AppError::ValidationError(_) => "VALIDATION_ERROR",
            AppError::Forbidden(_) => "FORBIDDEN",
            AppError::InternalError(_) => "INTERNAL_ERROR",
        }
    }

    pub fn malformed(reason: impl Into<String>, raw: impl Into<String>) -> Self {
        AppError::MalformedOutput {
            reason: reason.into(),
            raw: raw.into(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub detail: String,
    pub code: u16,
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::BackendUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::BackendTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            AppError::BackendError(_) => StatusCode::BAD_GATEWAY,
            AppError::SchemaViolation(_) => StatusCode::BAD_GATEWAY,
            AppError::MalformedOutput { .. } => StatusCode::BAD_GATEWAY,
            AppError::UnsupportedFileType(_) => StatusCode::BAD_REQUEST,
            AppError::FileProcessingError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if let AppError::MalformedOutput { raw, .. } = self {
            log::warn!("Rejected model output: {}", raw);
        }

        HttpResponse::build(self.status_code()).json(ErrorResponse {
            error: self.error_code().to_string(),
            detail: self.to_string(),
            code: self.status_code().as_u16(),
        })
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::ValidationError(err.to_string())
    }
}

impl From<actix_multipart::MultipartError> for AppError {
    fn from(err: actix_multipart::MultipartError) -> Self {
        AppError::ValidationError(format!("Invalid multipart upload: {}", err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InternalError(format!("JSON serialization error: {}", err))
    }
}

pub type AppResult<T> = Result<T, AppError>;
