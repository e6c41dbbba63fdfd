//! services/api/src/web/middleware.rs
//!
//! Authentication middleware for protecting routes.

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::warn;

use crate::error::HandlerError;
use crate::web::{auth::verify_token, state::AppState};

/// Middleware that validates the bearer token and extracts the user id.
///
/// If valid, inserts the user id (`Uuid`) into request extensions for handlers to use.
/// If invalid or missing, returns 401 Unauthorized.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, HandlerError> {
    // 1. Extract the token from the Authorization header
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim_start_matches("Bearer ").trim())
        .filter(|t| !t.is_empty())
        .ok_or_else(|| HandlerError::unauthorized("No token, authorization denied"))?;

    // 2. Verify it and read the user id
    let user_id = verify_token(token, &state.config.jwt_secret).map_err(|e| {
        warn!("Rejected bearer token: {:?}", e);
        HandlerError::unauthorized("Token is not valid")
    })?;

    // 3. Insert user_id into request extensions
    req.extensions_mut().insert(user_id);

    // 4. Continue to the handler
    Ok(next.run(req).await)
}
