/// Authentication endpoints
///
/// # Endpoints
///
/// - `POST /v1/auth/signup` - Create an account and get tokens
/// - `POST /v1/auth/login` - Login and get tokens
/// - `POST /v1/auth/refresh` - Exchange a refresh token for an access token
/// - `POST /v1/auth/logout` - End the session (tokens are stateless)
/// - `GET /v1/auth/me` - Current user

use axum::{extract::State, http::StatusCode, Extension, Json};
use freecrm_shared::{
    auth::{jwt, password, session::Session},
    models::user::{CreateUser, User},
};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};

/// Signup request
#[derive(Debug, Deserialize, Validate)]
pub struct SignupRequest {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,

    pub password: String,

    /// Must repeat `password`
    pub password_confirmation: String,

    #[validate(length(max = 100, message = "Name must be at most 100 characters"))]
    pub name: Option<String>,
}

/// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,

    pub password: String,
}

/// Tokens plus the user they belong to
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: User,

    /// Access token (24h)
    pub access_token: String,

    /// Refresh token (30d)
    pub refresh_token: String,
}

/// Refresh token request
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Refresh token response
#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    /// New access token (24h)
    pub access_token: String,
}

fn auth_response(user: User, secret: &str) -> ApiResult<AuthResponse> {
    let tokens = jwt::issue_token_pair(user.id, secret)?;
    Ok(AuthResponse {
        user,
        access_token: tokens.access_token,
        refresh_token: tokens.refresh_token,
    })
}

/// Create an account
///
/// ```text
/// POST /v1/auth/signup
///
/// {
///   "email": "marie@example.com",
///   "password": "secret1",
///   "password_confirmation": "secret1",
///   "name": "Marie"
/// }
/// ```
///
/// # Errors
///
/// - `422 Unprocessable Entity`: invalid email, short password, confirmation mismatch
/// - `409 Conflict`: email already registered
pub async fn signup(
    State(state): State<AppState>,
    Json(req): Json<SignupRequest>,
) -> ApiResult<(StatusCode, Json<AuthResponse>)> {
    req.validate()?;
    password::validate_new_password(&req.password, &req.password_confirmation)
        .map_err(|msg| ApiError::invalid("password", msg))?;

    let password_hash = password::hash_password(&req.password)?;

    let user = User::create(
        &state.db,
        CreateUser {
            email: req.email.trim().to_string(),
            password_hash,
            name: req
                .name
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty()),
        },
    )
    .await?;

    tracing::info!(user_id = %user.id, "User signed up");

    let response = auth_response(user, state.jwt_secret())?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// Login with email and password
///
/// Unknown email and wrong password give the same 401.
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<AuthResponse>> {
    req.validate()?;

    let invalid = || ApiError::Unauthorized("Invalid email or password".to_string());

    let user = User::find_by_email(&state.db, req.email.trim())
        .await?
        .ok_or_else(invalid)?;

    if !password::verify_password(&req.password, &user.password_hash)? {
        tracing::debug!(user_id = %user.id, "Login refused: wrong password");
        return Err(invalid());
    }

    let user = User::update_last_login(&state.db, user.id)
        .await?
        .ok_or_else(invalid)?;
    tracing::info!(user_id = %user.id, "User logged in");

    Ok(Json(auth_response(user, state.jwt_secret())?))
}

/// Exchange a refresh token for a new access token
pub async fn refresh(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> ApiResult<Json<RefreshResponse>> {
    let access_token = jwt::refresh_access_token(&req.refresh_token, state.jwt_secret())?;

    Ok(Json(RefreshResponse { access_token }))
}

/// Logout
///
/// Tokens are not stored server-side, so there is nothing to revoke; the
/// caller drops its tokens. Requires a valid access token like every other
/// protected route.
pub async fn logout(Extension(session): Extension<Session>) -> StatusCode {
    tracing::info!(user_id = %session.user_id, "User logged out");
    StatusCode::NO_CONTENT
}

/// Current user
pub async fn me(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> ApiResult<Json<User>> {
    let user = User::find_by_id(&state.db, session.user_id)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Account no longer exists".to_string()))?;

    Ok(Json(user))
}
