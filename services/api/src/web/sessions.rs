//! services/api/src/web/sessions.rs
//!
//! Handlers for logging study sessions and reading them back.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use study_tracker_core::domain::{PopulatedSession, Session};
use tracing::{error, info};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::{HandlerError, HandlerResult};
use crate::web::{
    extract::JsonBody, state::AppState, topics::parse_id, topics::TopicResponse,
    validation::validate_session, MessageResponse,
};

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub topic_id: Uuid,
    pub date: DateTime<Utc>,
    /// Minutes.
    pub duration: f64,
    pub notes: String,
    pub created_at: DateTime<Utc>,
}

impl From<Session> for SessionResponse {
    fn from(session: Session) -> Self {
        Self {
            id: session.id,
            topic_id: session.topic_id,
            date: session.date,
            duration: session.duration,
            notes: session.notes,
            created_at: session.created_at,
        }
    }
}

/// A session with `topicId` replaced by the topic itself (`null` once the topic is gone).
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PopulatedSessionResponse {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub topic_id: Option<TopicResponse>,
    pub date: DateTime<Utc>,
    pub duration: f64,
    pub notes: String,
    pub created_at: DateTime<Utc>,
}

impl From<PopulatedSession> for PopulatedSessionResponse {
    fn from(populated: PopulatedSession) -> Self {
        let PopulatedSession { session, topic } = populated;
        Self {
            id: session.id,
            topic_id: topic.map(TopicResponse::from),
            date: session.date,
            duration: session.duration,
            notes: session.notes,
            created_at: session.created_at,
        }
    }
}

/// Documents the body accepted by `POST /api/sessions`; the handler validates the raw JSON.
#[allow(dead_code)]
#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionRequest {
    topic_id: Uuid,
    /// Minutes, at least 1. Numeric strings are accepted.
    duration: f64,
    /// At least 5 characters.
    notes: String,
    /// Defaults to now.
    date: Option<DateTime<Utc>>,
}

//=========================================================================================
// Handlers
//=========================================================================================

/// GET /api/sessions - Every session with its topic populated
#[utoipa::path(
    get,
    path = "/api/sessions",
    responses(
        (status = 200, description = "All sessions", body = [PopulatedSessionResponse]),
        (status = 500, description = "Internal server error", body = MessageResponse)
    )
)]
pub async fn list_sessions_handler(
    State(state): State<Arc<AppState>>,
) -> HandlerResult<Json<Vec<PopulatedSessionResponse>>> {
    let sessions = state.db.list_sessions_with_topics().await.map_err(|e| {
        error!("Failed to list sessions: {:?}", e);
        HandlerError::from(e)
    })?;
    Ok(Json(
        sessions
            .into_iter()
            .map(PopulatedSessionResponse::from)
            .collect(),
    ))
}

/// GET /api/sessions/{topic_id} - Sessions of one topic, most recent first
#[utoipa::path(
    get,
    path = "/api/sessions/{topic_id}",
    params(("topic_id" = Uuid, Path, description = "Topic id")),
    responses(
        (status = 200, description = "The topic's sessions by date, newest first", body = [SessionResponse]),
        (status = 400, description = "Malformed id", body = MessageResponse)
    )
)]
pub async fn list_topic_sessions_handler(
    State(state): State<Arc<AppState>>,
    Path(topic_id): Path<String>,
) -> HandlerResult<Json<Vec<SessionResponse>>> {
    let topic_id = parse_id(&topic_id, "topic")?;

    let sessions = state
        .db
        .list_sessions_for_topic(topic_id)
        .await
        .map_err(|e| {
            error!("Failed to list sessions for topic {}: {:?}", topic_id, e);
            HandlerError::from(e)
        })?;
    Ok(Json(sessions.into_iter().map(SessionResponse::from).collect()))
}

/// POST /api/sessions - Log a study session
#[utoipa::path(
    post,
    path = "/api/sessions",
    request_body = CreateSessionRequest,
    responses(
        (status = 201, description = "Session logged", body = SessionResponse),
        (status = 400, description = "Validation failed", body = MessageResponse)
    )
)]
pub async fn create_session_handler(
    State(state): State<Arc<AppState>>,
    JsonBody(body): JsonBody<Value>,
) -> HandlerResult<impl IntoResponse> {
    let new_session = validate_session(&body)?;

    let session = state.db.create_session(new_session).await.map_err(|e| {
        error!("Failed to create session: {:?}", e);
        HandlerError::bad_request(e.to_string())
    })?;
    info!("Logged session {} for topic {}", session.id, session.topic_id);

    Ok((StatusCode::CREATED, Json(SessionResponse::from(session))))
}
