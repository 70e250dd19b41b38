//!
//! # HTTP-facing errors
//!
//! `AppError` is what route handlers return. It implements
//! `actix_web::error::ResponseError`, so every variant turns into a status
//! code with a `{"error": "..."}` JSON body. Conversions from the lower layers
//! (`DbError`, `sqlx::Error`, `validator`, `jsonwebtoken`, `bcrypt`) let
//! handlers use `?` throughout.

use actix_web::error::{JsonPayloadError, QueryPayloadError};
use actix_web::http::StatusCode;
use actix_web::{error::ResponseError, HttpRequest, HttpResponse};
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;
use validator::ValidationErrors;

use crate::db::DbError;

/// JSON body of every error response.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Human-readable reason.
    #[schema(example = "Invalid credentials")]
    pub error: String,
}

#[derive(Debug, Error)]
pub enum AppError {
    /// Authentication missing or rejected (401).
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    /// Malformed input or a conflicting account (400).
    #[error("Bad Request: {0}")]
    BadRequest(String),
    #[error("Not Found: {0}")]
    NotFound(String),
    #[error("Internal Server Error: {0}")]
    InternalServerError(String),
    /// A statement or transaction failed (500). The detail is logged, not
    /// sent to the client.
    #[error("Database Error: {0}")]
    DatabaseError(String),
    /// Input failed `validator` rules (422).
    #[error("Validation Error: {0}")]
    ValidationError(String),
    /// The database cannot be reached or the pool is closed (503).
    #[error("Service Unavailable: {0}")]
    ServiceUnavailable(String),
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InternalServerError(_) | AppError::DatabaseError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::ValidationError(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            AppError::DatabaseError(detail) => {
                log::error!("database error: {}", detail);
                "Database error"
            }
            AppError::InternalServerError(detail) => {
                log::error!("internal error: {}", detail);
                detail.as_str()
            }
            AppError::Unauthorized(msg)
            | AppError::BadRequest(msg)
            | AppError::NotFound(msg)
            | AppError::ValidationError(msg)
            | AppError::ServiceUnavailable(msg) => msg.as_str(),
        };

        HttpResponse::build(self.status_code()).json(ErrorBody {
            error: message.to_string(),
        })
    }
}

impl From<DbError> for AppError {
    fn from(error: DbError) -> AppError {
        match error {
            DbError::PoolClosed => AppError::ServiceUnavailable("Database is shutting down".into()),
            DbError::Connection(e) => {
                log::warn!("database unavailable: {}", e);
                AppError::ServiceUnavailable("Database unavailable".into())
            }
            DbError::Query(sqlx::Error::RowNotFound) => AppError::NotFound("Record not found".into()),
            DbError::Query(e) | DbError::Transaction(e) => AppError::DatabaseError(e.to_string()),
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(error: sqlx::Error) -> AppError {
        DbError::from_pool(error).into()
    }
}

impl From<ValidationErrors> for AppError {
    fn from(error: ValidationErrors) -> AppError {
        AppError::ValidationError(error.to_string())
    }
}

impl From<jsonwebtoken::errors::Error> for AppError {
    fn from(error: jsonwebtoken::errors::Error) -> AppError {
        AppError::Unauthorized(error.to_string())
    }
}

impl From<bcrypt::BcryptError> for AppError {
    fn from(error: bcrypt::BcryptError) -> AppError {
        AppError::InternalServerError(error.to_string())
    }
}

/// Malformed JSON bodies become 400 responses in the usual error shape.
pub fn json_error_handler(error: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    AppError::BadRequest(error.to_string()).into()
}

/// Unparseable query strings (e.g. an unknown status filter) become 400s.
pub fn query_error_handler(error: QueryPayloadError, _req: &HttpRequest) -> actix_web::Error {
    AppError::BadRequest(error.to_string()).into()
}
