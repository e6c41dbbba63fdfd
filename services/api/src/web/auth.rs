//! services/api/src/web/auth.rs
//!
//! Authentication endpoints for user signup, login and the current user,
//! plus the bearer-token helpers shared with the auth middleware.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{extract::State, Extension, Json};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use study_tracker_core::{domain::User, ports::PortError};
use tracing::{error, info};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::{HandlerError, HandlerResult};
use crate::web::{extract::JsonBody, state::AppState, MessageResponse};

const TOKEN_LIFETIME_DAYS: i64 = 7;
const MIN_PASSWORD_LEN: usize = 6;

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct SignupRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// The public view of a user. Never carries the password hash.
#[derive(Debug, Serialize, ToSchema)]
pub struct UserResponse {
    pub id: Uuid,
    pub username: String,
    pub email: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserResponse,
}

//=========================================================================================
// Tokens
//=========================================================================================

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    id: Uuid,
    iat: i64,
    exp: i64,
}

/// Signs an HS256 token for `user_id` that expires in seven days.
pub fn issue_token(user_id: Uuid, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
    let now = Utc::now();
    let claims = Claims {
        id: user_id,
        iat: now.timestamp(),
        exp: (now + Duration::days(TOKEN_LIFETIME_DAYS)).timestamp(),
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

/// Checks the signature and expiry of a token and returns the user id it carries.
pub fn verify_token(token: &str, secret: &str) -> Result<Uuid, jsonwebtoken::errors::Error> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::new(Algorithm::HS256),
    )?;
    Ok(data.claims.id)
}

fn auth_response(user: User, secret: &str) -> HandlerResult<AuthResponse> {
    let token = issue_token(user.id, secret).map_err(|e| {
        error!("Failed to sign token: {:?}", e);
        HandlerError::internal(e.to_string())
    })?;
    Ok(AuthResponse {
        token,
        user: user.into(),
    })
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /api/auth/signup - Create a new user account
#[utoipa::path(
    post,
    path = "/api/auth/signup",
    request_body = SignupRequest,
    responses(
        (status = 200, description = "User created", body = AuthResponse),
        (status = 400, description = "Missing fields, short password or taken username/email", body = MessageResponse),
        (status = 500, description = "Internal server error", body = MessageResponse)
    )
)]
pub async fn signup_handler(
    State(state): State<Arc<AppState>>,
    JsonBody(req): JsonBody<SignupRequest>,
) -> HandlerResult<Json<AuthResponse>> {
    // 1. Validate the request
    if req.username.is_empty() || req.email.is_empty() || req.password.is_empty() {
        return Err(HandlerError::bad_request("Please enter all fields"));
    }
    if req.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(HandlerError::bad_request(
            "Password must be at least 6 characters",
        ));
    }

    // 2. Reject duplicates before paying for a hash
    if state.db.user_exists(&req.username, &req.email).await? {
        return Err(HandlerError::bad_request(
            "User with this email or username already exists",
        ));
    }

    // 3. Hash the password
    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(req.password.as_bytes(), &salt)
        .map_err(|e| {
            error!("Failed to hash password: {:?}", e);
            HandlerError::internal("Failed to hash password")
        })?
        .to_string();

    // 4. Create the user; a concurrent signup may still win the unique constraint
    let user = state
        .db
        .create_user(&req.username, &req.email, &password_hash)
        .await
        .map_err(|e| {
            error!("Failed to create user: {:?}", e);
            HandlerError::from(e)
        })?;
    info!("Created user {}", user.id);

    Ok(Json(auth_response(user, &state.config.jwt_secret)?))
}

/// POST /api/auth/login - Login with an existing account
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 400, description = "Missing fields, unknown user or wrong password", body = MessageResponse),
        (status = 500, description = "Internal server error", body = MessageResponse)
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    JsonBody(req): JsonBody<LoginRequest>,
) -> HandlerResult<Json<AuthResponse>> {
    if req.email.is_empty() || req.password.is_empty() {
        return Err(HandlerError::bad_request("Please enter all fields"));
    }

    // 1. Get user by email
    let creds = state
        .db
        .get_user_by_email(&req.email)
        .await
        .map_err(|e| match e {
            PortError::NotFound(_) => HandlerError::bad_request("User does not exist"),
            other => {
                error!("Failed to get user: {:?}", other);
                HandlerError::from(other)
            }
        })?;

    // 2. Verify password
    let parsed_hash = PasswordHash::new(&creds.hashed_password).map_err(|e| {
        error!("Failed to parse password hash: {:?}", e);
        HandlerError::internal("Authentication error")
    })?;

    let valid = Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .is_ok();

    if !valid {
        return Err(HandlerError::bad_request("Invalid credentials"));
    }

    Ok(Json(auth_response(creds.user, &state.config.jwt_secret)?))
}

/// GET /api/auth/me - The user the bearer token belongs to
#[utoipa::path(
    get,
    path = "/api/auth/me",
    responses(
        (status = 200, description = "Current user", body = UserResponse),
        (status = 401, description = "Missing or invalid token", body = MessageResponse)
    ),
    security(("bearer_token" = []))
)]
pub async fn me_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> HandlerResult<Json<UserResponse>> {
    let user = state.db.get_user_by_id(user_id).await.map_err(|e| match e {
        PortError::NotFound(_) => HandlerError::unauthorized("Token is not valid"),
        other => HandlerError::from(other),
    })?;
    Ok(Json(user.into()))
}
