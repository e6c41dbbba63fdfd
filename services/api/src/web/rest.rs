//! services/api/src/web/rest.rs
//!
//! Builds the REST router and holds the master definition for the OpenAPI
//! specification.

use crate::config::Config;
use crate::web::{ai, auth, middleware::require_auth, sessions, state::AppState, topics, MessageResponse};
use axum::{
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    middleware as axum_middleware,
    response::Json,
    routing::{delete, get, patch, post},
    Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi, ToSchema,
};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        health_handler,
        topics::list_topics_handler,
        topics::create_topic_handler,
        topics::delete_topic_handler,
        topics::update_topic_status_handler,
        sessions::list_sessions_handler,
        sessions::list_topic_sessions_handler,
        sessions::create_session_handler,
        ai::summarize_handler,
        ai::improve_notes_handler,
        ai::chat_handler,
        ai::plan_handler,
        ai::list_resources_handler,
        ai::add_resource_handler,
        auth::signup_handler,
        auth::login_handler,
        auth::me_handler,
    ),
    components(
        schemas(HealthResponse, MessageResponse)
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "Study Tracker API", description = "Topics, study sessions and AI study assistance.")
    )
)]
pub struct ApiDoc;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_token",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

//=========================================================================================
// Health
//=========================================================================================

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    status: &'static str,
    message: &'static str,
}

/// GET /api/health - Liveness check
#[utoipa::path(
    get,
    path = "/api/health",
    responses((status = 200, description = "The server is up", body = HealthResponse))
)]
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        message: "Server is running",
    })
}

//=========================================================================================
// Router
//=========================================================================================

/// CORS for the browser dashboard. Tokens travel in headers, so no credentials mode.
fn cors_layer(config: &Config) -> CorsLayer {
    let origin = match config.frontend_origin.as_deref() {
        Some(origin) => match origin.parse::<HeaderValue>() {
            Ok(value) => AllowOrigin::exact(value),
            Err(_) => {
                warn!("FRONTEND_URL '{}' is not a valid origin; allowing any origin", origin);
                AllowOrigin::any()
            }
        },
        None => AllowOrigin::any(),
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT])
}

/// Builds every `/api` route with its middleware, ready to be served.
pub fn api_router(app_state: Arc<AppState>) -> Router {
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/health", get(health_handler))
        .route(
            "/topics",
            get(topics::list_topics_handler).post(topics::create_topic_handler),
        )
        .route("/topics/{id}", delete(topics::delete_topic_handler))
        .route(
            "/topics/{id}/status",
            patch(topics::update_topic_status_handler),
        )
        .route(
            "/sessions",
            get(sessions::list_sessions_handler).post(sessions::create_session_handler),
        )
        .route(
            "/sessions/{topic_id}",
            get(sessions::list_topic_sessions_handler),
        )
        .route("/ai/summarize", post(ai::summarize_handler))
        .route("/ai/improve-notes", post(ai::improve_notes_handler))
        .route("/ai/chat", post(ai::chat_handler))
        .route("/ai/plan", post(ai::plan_handler))
        .route(
            "/ai/resources",
            get(ai::list_resources_handler).post(ai::add_resource_handler),
        )
        .route("/auth/signup", post(auth::signup_handler))
        .route("/auth/login", post(auth::login_handler));

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route("/auth/me", get(auth::me_handler))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_auth,
        ));

    let cors = cors_layer(&app_state.config);

    Router::new()
        .nest("/api", public_routes.merge(protected_routes))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}
