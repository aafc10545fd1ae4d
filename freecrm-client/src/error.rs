/// Client errors
///
/// Non-2xx responses are decoded from the API's JSON error body
/// `{ "error", "message", "details" }` into [`ClientError::Api`].

use serde::Deserialize;

/// One invalid field of a 422 response
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// Error type for API calls
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Transport failure or undecodable body
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with an error status
    #[error("{message} ({status})")]
    Api {
        status: u16,

        /// Machine-readable code, e.g. `conflict`
        code: String,

        message: String,
        details: Vec<FieldError>,
    },

    /// The base URL cannot be joined with a route
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Attachment name refused before any request was sent
    #[error("Invalid file name: {0}")]
    InvalidFileName(String),
}

impl ClientError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            ClientError::Http(e) => e.status().map(|s| s.as_u16()),
            ClientError::InvalidUrl(_) | ClientError::InvalidFileName(_) => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    pub fn is_conflict(&self) -> bool {
        self.status() == Some(409)
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }

    /// Per-field validation failures, empty unless the API answered 422
    pub fn field_errors(&self) -> &[FieldError] {
        match self {
            ClientError::Api { details, .. } => details,
            _ => &[],
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
    message: String,
    #[serde(default)]
    details: Option<Vec<FieldError>>,
}

/// Builds an [`ClientError::Api`] from a status and a raw body
///
/// Bodies that are not the API's JSON error format (proxies, axum
/// extractor rejections) keep their text as the message.
pub(crate) fn api_error(status: u16, body: &[u8]) -> ClientError {
    match serde_json::from_slice::<ErrorBody>(body) {
        Ok(body) => ClientError::Api {
            status,
            code: body.error,
            message: body.message,
            details: body.details.unwrap_or_default(),
        },
        Err(_) => ClientError::Api {
            status,
            code: "http_error".to_string(),
            message: String::from_utf8_lossy(body).trim().to_string(),
            details: Vec::new(),
        },
    }
}

/// Result type for API calls
pub type ClientResult<T> = Result<T, ClientError>;
