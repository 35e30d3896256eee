/// Authentication endpoints
///
/// # Endpoints
///
/// - `POST /api/auth/register` - Register new user
/// - `POST /api/auth/login` - Login and get a token
/// - `GET /api/auth/validate` - Echo the claims of the presented token

use crate::{app::AppState, error::ApiResult};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use kvtodo_shared::auth::{identity::Session, middleware::AuthContext};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Register and login request
#[derive(Debug, Deserialize, Validate)]
pub struct CredentialsRequest {
    /// Login name
    #[serde(default)]
    #[validate(length(min = 1, message = "Missing required fields"))]
    pub username: String,

    /// Plaintext password
    #[serde(default)]
    #[validate(length(min = 1, message = "Missing required fields"))]
    pub password: String,
}

/// Register and login response
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    /// Outcome message
    pub message: String,

    /// User ID
    pub user_id: String,

    /// Bearer token (24h by default)
    pub token: String,
}

impl AuthResponse {
    fn new(message: &str, session: Session) -> Self {
        Self {
            message: message.to_string(),
            user_id: session.user.id.to_string(),
            token: session.token.token,
        }
    }
}

/// Token validation response
#[derive(Debug, Serialize, Deserialize)]
pub struct ValidateResponse {
    /// Outcome message
    pub message: String,

    /// Username claim
    pub username: String,

    /// User ID claim
    pub user_id: String,

    /// Expiration (Unix timestamp)
    pub valid_until: i64,
}

/// Register a new user
///
/// # Endpoint
///
/// ```text
/// POST /api/auth/register
/// Content-Type: application/json
///
/// { "username": "al", "password": "p1" }
/// ```
///
/// # Response
///
/// `201 Created`
///
/// ```json
/// {
///   "message": "User created successfully",
///   "user_id": "uuid",
///   "token": "eyJ..."
/// }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Empty or malformed body, missing fields, username taken
/// - `500 Internal Server Error`: Store failure
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<AuthResponse>)> {
    let Json(req) = payload?;
    req.validate()?;

    let session = state.identity.register(&req.username, &req.password).await?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse::new("User created successfully", session)),
    ))
}

/// Login with username and password
///
/// # Endpoint
///
/// ```text
/// POST /api/auth/login
/// Content-Type: application/json
///
/// { "username": "al", "password": "p1" }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Empty or malformed body, missing fields
/// - `401 Unauthorized`: Unknown username or wrong password (same message)
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> ApiResult<Json<AuthResponse>> {
    let Json(req) = payload?;
    req.validate()?;

    let session = state
        .identity
        .authenticate(&req.username, &req.password)
        .await?;

    Ok(Json(AuthResponse::new("Login successful", session)))
}

/// Validate the bearer token
///
/// Runs behind the bearer middleware, so reaching the handler means the
/// token verified.
///
/// # Endpoint
///
/// ```text
/// GET /api/auth/validate
/// Authorization: Bearer <token>
/// ```
///
/// # Response
///
/// ```json
/// {
///   "message": "Token is valid",
///   "username": "al",
///   "user_id": "uuid",
///   "valid_until": 1700086400
/// }
/// ```
pub async fn validate(auth: AuthContext) -> Json<ValidateResponse> {
    Json(ValidateResponse {
        message: "Token is valid".to_string(),
        username: auth.username,
        user_id: auth.user_id.to_string(),
        valid_until: auth.expires_at,
    })
}
