/// Authenticated session
///
/// A `Session` is built from the bearer token by the API's auth layer and
/// inserted into request extensions. Handlers receive it explicitly through
/// `Extension<Session>`; nothing reads the current user from global state.
///
/// # Example
///
/// ```
/// use axum::Extension;
/// use freecrm_shared::auth::session::Session;
///
/// async fn handler(Extension(session): Extension<Session>) -> String {
///     format!("Records owned by {}", session.owner_id())
/// }
/// ```

use axum::{
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::jwt::{validate_access_token, JwtError};

/// The signed-in user, as seen by one request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Authenticated user id
    pub user_id: Uuid,
}

impl Session {
    pub fn new(user_id: Uuid) -> Self {
        Self { user_id }
    }

    /// Ownership key applied to every query made on behalf of this session
    pub fn owner_id(&self) -> Uuid {
        self.user_id
    }

    /// Validates `Authorization: Bearer <access token>` and builds the session
    pub fn from_headers(headers: &HeaderMap, secret: &str) -> Result<Self, AuthError> {
        let value = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or(AuthError::MissingCredentials)?;

        let token = value
            .strip_prefix("Bearer ")
            .ok_or_else(|| AuthError::InvalidFormat("Expected Bearer token".to_string()))?;

        let claims = validate_access_token(token, secret).map_err(|e| match e {
            JwtError::Expired => AuthError::InvalidToken("Token expired".to_string()),
            JwtError::InvalidIssuer => AuthError::InvalidToken("Invalid issuer".to_string()),
            other => AuthError::InvalidToken(format!("Invalid token: {}", other)),
        })?;

        Ok(Self::new(claims.sub))
    }
}

/// Error type for session extraction
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// No Authorization header
    #[error("Missing credentials")]
    MissingCredentials,

    /// Authorization header is not a bearer token
    #[error("{0}")]
    InvalidFormat(String),

    /// Token failed validation
    #[error("{0}")]
    InvalidToken(String),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = match self {
            AuthError::InvalidFormat(_) => StatusCode::BAD_REQUEST,
            AuthError::MissingCredentials | AuthError::InvalidToken(_) => StatusCode::UNAUTHORIZED,
        };

        (status, self.to_string()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::{create_token, Claims, TokenType};
    use axum::http::HeaderValue;

    const SECRET: &str = "test-secret-key-at-least-32-bytes-long";

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_session_from_valid_token() {
        let user_id = Uuid::new_v4();
        let token = create_token(&Claims::new(user_id, TokenType::Access), SECRET).unwrap();

        let session = Session::from_headers(&headers_with(&format!("Bearer {}", token)), SECRET).unwrap();
        assert_eq!(session.owner_id(), user_id);
    }

    #[test]
    fn test_missing_header() {
        let result = Session::from_headers(&HeaderMap::new(), SECRET);
        assert!(matches!(result, Err(AuthError::MissingCredentials)));
    }

    #[test]
    fn test_non_bearer_header() {
        let result = Session::from_headers(&headers_with("Basic dXNlcjpwYXNz"), SECRET);
        assert!(matches!(result, Err(AuthError::InvalidFormat(_))));
    }

    #[test]
    fn test_refresh_token_is_not_a_session() {
        let token = create_token(&Claims::new(Uuid::new_v4(), TokenType::Refresh), SECRET).unwrap();

        let result = Session::from_headers(&headers_with(&format!("Bearer {}", token)), SECRET);
        assert!(matches!(result, Err(AuthError::InvalidToken(_))));
    }

    #[test]
    fn test_auth_error_into_response() {
        assert_eq!(
            AuthError::MissingCredentials.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AuthError::InvalidFormat("x".to_string()).into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AuthError::InvalidToken("x".to_string()).into_response().status(),
            StatusCode::UNAUTHORIZED
        );
    }
}
