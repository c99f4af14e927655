use crate::database::DatabaseError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use sqlx::Error as SqlxError;
use thiserror::Error;

/// Application-level error types
#[derive(Error, Debug)]
pub enum AppError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// SQLx database errors
    #[error("SQL error: {0}")]
    Sqlx(#[from] SqlxError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Not found errors
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// External service errors
    #[error("External service error: {0}")]
    ExternalService(String),

    /// Generic error with message
    #[error("{0}")]
    Message(String),
}

/// Result type alias for application errors
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// Get HTTP status code for the error
    pub fn status_code(&self) -> u16 {
        match self {
            AppError::NotFound(_) => 404,
            AppError::Validation(_) => 400,
            AppError::Config(_) => 500,
            AppError::Database(_) | AppError::Sqlx(_) => 500,
            AppError::ExternalService(_) => 502,
            _ => 500,
        }
    }

    /// Message safe to hand back to API clients
    fn public_message(&self) -> String {
        match self {
            AppError::NotFound(msg) | AppError::Validation(msg) => msg.clone(),
            AppError::ExternalService(_) => "Upstream service unavailable".to_string(),
            _ => "Internal server error".to_string(),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    detail: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        }
        let body = Json(ErrorBody {
            detail: self.public_message(),
        });
        (status, body).into_response()
    }
}

/// Repository-specific error types
#[derive(Error, Debug)]
pub enum RepositoryError {
    /// Database query error
    #[error("Query error: {0}")]
    Query(SqlxError),

    /// Record not found
    #[error("Record not found")]
    NotFound(String),

    /// Duplicate record
    #[error("Duplicate record: {0}")]
    Duplicate(String),

    /// Constraint violation
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl RepositoryError {
    /// Row-level errors only poison the row that caused them
    pub fn is_row_level(&self) -> bool {
        match self {
            RepositoryError::Duplicate(_)
            | RepositoryError::ConstraintViolation(_)
            | RepositoryError::InvalidInput(_)
            | RepositoryError::NotFound(_) => true,
            RepositoryError::Query(SqlxError::Database(db_err)) => {
                db_err.code().is_some_and(|code| is_row_level_sqlstate(&code))
            }
            RepositoryError::Query(e) => matches!(e, SqlxError::ColumnDecode { .. }),
        }
    }
}

/// Data exceptions (class 22) and integrity violations (class 23) are caused by
/// the row itself; every other class means the connection or server is in trouble
fn is_row_level_sqlstate(code: &str) -> bool {
    code.starts_with("22") || code.starts_with("23")
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound(msg) => AppError::NotFound(msg),
            RepositoryError::Query(e) => AppError::Sqlx(e),
            RepositoryError::Duplicate(msg) => AppError::Message(format!("Duplicate: {}", msg)),
            RepositoryError::ConstraintViolation(msg) => AppError::Validation(msg),
            RepositoryError::InvalidInput(msg) => AppError::Validation(msg),
        }
    }
}

impl From<SqlxError> for RepositoryError {
    fn from(err: SqlxError) -> Self {
        match &err {
            SqlxError::RowNotFound => RepositoryError::NotFound("Record not found".to_string()),
            SqlxError::Database(db_err) => {
                // Check for common PostgreSQL error codes
                let code = db_err.code().map(|c| c.to_string());
                if code.as_deref() == Some("23505") {
                    // Unique violation
                    RepositoryError::Duplicate(db_err.message().to_string())
                } else if code.as_deref() == Some("23503") {
                    // Foreign key violation
                    RepositoryError::ConstraintViolation(db_err.message().to_string())
                } else if code.as_deref() == Some("23514") {
                    // Check constraint violation
                    RepositoryError::ConstraintViolation(db_err.message().to_string())
                } else {
                    RepositoryError::Query(err)
                }
            }
            _ => RepositoryError::Query(err),
        }
    }
}

/// Errors raised by the acquirers
#[derive(Error, Debug)]
pub enum CollectorError {
    /// Missing secret or invalid setting at construction time
    #[error("Configuration error: {0}")]
    Config(String),

    /// Network failure or timeout against an upstream source
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Upstream answered with a non-success status
    #[error("Unexpected status {status} from {source_name}")]
    UnexpectedStatus {
        source_name: &'static str,
        status: u16,
    },

    /// Malformed payload, row or cell
    #[error("Parse error: {0}")]
    Parse(String),

    /// Daily quote budget spent, locally or as reported by the provider
    #[error("Quota exhausted: {0}")]
    QuotaExhausted(String),

    /// Store failure that could not be contained to a single row
    #[error("Store error: {0}")]
    Store(#[from] RepositoryError),
}

/// Result type alias for acquirer operations
pub type CollectorResult<T> = Result<T, CollectorError>;

impl CollectorError {
    pub fn is_quota_exhausted(&self) -> bool {
        matches!(self, CollectorError::QuotaExhausted(_))
    }

    pub fn is_config(&self) -> bool {
        matches!(self, CollectorError::Config(_))
    }
}

impl From<CollectorError> for AppError {
    fn from(err: CollectorError) -> Self {
        match err {
            CollectorError::Config(msg) => AppError::Config(msg),
            CollectorError::Store(e) => e.into(),
            other => AppError::ExternalService(other.to_string()),
        }
    }
}
