/// Error handling for the API server
///
/// All handlers return `ApiResult<T>`; `ApiError` turns into a JSON body
///
/// ```json
/// { "error": "conflict", "message": "Invoice number already used", "details": null }
/// ```
///
/// with the matching status code. Errors from the shared crate convert with
/// `?`. Internal failures are logged and replaced by a generic message.
///
/// # Example
///
/// ```
/// use freecrm_api::error::{ApiError, ApiResult};
///
/// fn find(found: bool) -> ApiResult<&'static str> {
///     if !found {
///         return Err(ApiError::NotFound("Client not found".to_string()));
///     }
///     Ok("client")
/// }
///
/// assert!(find(false).is_err());
/// ```

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt;

use freecrm_shared::auth::{jwt::JwtError, password::PasswordError, session::AuthError};
use freecrm_shared::billing::lifecycle::TransitionError;
use freecrm_shared::models::prospect::ConversionError;
use freecrm_shared::storage::StorageError;

/// API result type alias
pub type ApiResult<T> = Result<T, ApiError>;

/// Unified API error type
#[derive(Debug)]
pub enum ApiError {
    /// Bad request (400)
    BadRequest(String),

    /// Unauthorized (401)
    Unauthorized(String),

    /// Not found (404), also returned for records of another owner
    NotFound(String),

    /// Conflict (409): duplicates, refused transitions, referenced records
    Conflict(String),

    /// Unprocessable entity (422) - validation errors
    ValidationError(Vec<ValidationErrorDetail>),

    /// Internal server error (500)
    InternalError(String),
}

impl ApiError {
    /// Single-field validation failure
    pub fn invalid(field: &str, message: impl Into<String>) -> Self {
        ApiError::ValidationError(vec![ValidationErrorDetail {
            field: field.to_string(),
            message: message.into(),
        }])
    }
}

/// Validation error detail
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationErrorDetail {
    /// Field that failed validation
    pub field: String,

    /// Error message
    pub message: String,
}

/// Error response format
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code (e.g., "bad_request", "unauthorized")
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// Optional validation errors
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<ValidationErrorDetail>>,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            ApiError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            ApiError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ApiError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            ApiError::ValidationError(errors) => {
                write!(f, "Validation failed: {} errors", errors.len())
            }
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message, details) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg, None),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "unauthorized", msg, None),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg, None),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg, None),
            ApiError::ValidationError(errors) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "validation_error",
                "Request validation failed".to_string(),
                Some(errors),
            ),
            ApiError::InternalError(msg) => {
                // Log internal errors but don't expose details to clients
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                    None,
                )
            }
        };

        let body = Json(ErrorResponse {
            error: error_code.to_string(),
            message,
            details,
        });

        (status, body).into_response()
    }
}

/// Message for a constraint the schema declares, `None` for unknown ones
fn constraint_message(constraint: &str) -> Option<ApiError> {
    let err = match constraint {
        "users_email_key" => ApiError::Conflict("Email already registered".to_string()),
        "invoices_owner_number_key" => ApiError::Conflict("Invoice number already used".to_string()),
        "invoices_client_id_fkey" => {
            ApiError::Conflict("Client still has invoices and cannot be deleted".to_string())
        }
        "tasks_single_link" => {
            ApiError::invalid("link", "A task links to a client or a prospect, not both")
        }
        _ => return None,
    };

    Some(err)
}

/// Convert sqlx errors to API errors
impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => ApiError::NotFound("Resource not found".to_string()),
            sqlx::Error::Database(db_err) => {
                if let Some(mapped) = db_err.constraint().and_then(constraint_message) {
                    return mapped;
                }
                if let Some(constraint) = db_err.constraint() {
                    return ApiError::Conflict(format!("Constraint violation: {}", constraint));
                }

                ApiError::InternalError(format!("Database error: {}", db_err))
            }
            _ => ApiError::InternalError(format!("Database error: {}", err)),
        }
    }
}

/// Convert request validation errors to API errors
impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut details: Vec<ValidationErrorDetail> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| ValidationErrorDetail {
                    field: field.to_string(),
                    message: e
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("Invalid {}", field)),
                })
            })
            .collect();

        // field_errors() is a HashMap; keep responses stable
        details.sort_by(|a, b| a.field.cmp(&b.field).then_with(|| a.message.cmp(&b.message)));

        ApiError::ValidationError(details)
    }
}

/// Convert session errors to API errors
impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingCredentials => ApiError::Unauthorized("Missing credentials".to_string()),
            AuthError::InvalidFormat(msg) => ApiError::BadRequest(msg),
            AuthError::InvalidToken(msg) => ApiError::Unauthorized(msg),
        }
    }
}

/// Convert password errors to API errors
impl From<PasswordError> for ApiError {
    fn from(err: PasswordError) -> Self {
        ApiError::InternalError(format!("Password operation failed: {}", err))
    }
}

/// Convert JWT errors to API errors
impl From<JwtError> for ApiError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::Expired => ApiError::Unauthorized("Token expired".to_string()),
            JwtError::InvalidIssuer => ApiError::Unauthorized("Invalid token issuer".to_string()),
            JwtError::CreateError(msg) => ApiError::InternalError(msg),
            _ => ApiError::Unauthorized(format!("Invalid token: {}", err)),
        }
    }
}

impl From<ConversionError> for ApiError {
    fn from(err: ConversionError) -> Self {
        match err {
            ConversionError::NotFound => ApiError::NotFound("Prospect not found".to_string()),
            ConversionError::AlreadyConverted => ApiError::Conflict(err.to_string()),
            ConversionError::Database(db) => db.into(),
        }
    }
}

impl From<TransitionError> for ApiError {
    fn from(err: TransitionError) -> Self {
        ApiError::Conflict(err.to_string())
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(_) => ApiError::NotFound("Attachment not found".to_string()),
            StorageError::AlreadyExists(_) => {
                ApiError::Conflict("An attachment with this name already exists".to_string())
            }
            StorageError::InvalidName(msg) => ApiError::invalid("file_name", msg),
            StorageError::Io(e) => ApiError::InternalError(format!("Storage error: {}", e)),
        }
    }
}
