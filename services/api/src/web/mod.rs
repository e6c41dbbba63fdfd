pub mod ai;
pub mod auth;
pub mod extract;
pub mod middleware;
pub mod rest;
pub mod sessions;
pub mod state;
pub mod topics;
pub mod validation;

use serde::Serialize;
use utoipa::ToSchema;

// Re-export the router and the auth middleware to make them easily accessible
// to the binary that serves them.
pub use middleware::require_auth;
pub use rest::{api_router, ApiDoc};

/// The `{ "message": ... }` body used for confirmations and errors alike.
#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
