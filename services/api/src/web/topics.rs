//! services/api/src/web/topics.rs
//!
//! CRUD handlers for study topics.

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
use study_tracker_core::domain::{Topic, TopicStatus};
use tracing::{error, info};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::{HandlerError, HandlerResult};
use crate::web::{extract::JsonBody, state::AppState, validation::validate_topic, MessageResponse};

//=========================================================================================
// Request/Response Types
//=========================================================================================

/// A topic as the dashboard sees it.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TopicResponse {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub title: String,
    pub category: String,
    #[schema(example = "Not Started")]
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub goal: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<Topic> for TopicResponse {
    fn from(topic: Topic) -> Self {
        Self {
            id: topic.id,
            title: topic.title,
            category: topic.category,
            status: topic.status.to_string(),
            goal: topic.goal,
            created_at: topic.created_at,
        }
    }
}

/// Documents the body accepted by `POST /api/topics`; the handler validates the raw JSON.
#[allow(dead_code)]
#[derive(ToSchema)]
pub struct CreateTopicRequest {
    /// At least 3 characters.
    title: String,
    /// At least 2 characters.
    category: String,
    goal: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateStatusRequest {
    /// One of "Not Started", "In Progress", "Revised".
    #[serde(default)]
    pub status: Option<String>,
}

pub(crate) fn parse_id(raw: &str, what: &str) -> HandlerResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| HandlerError::bad_request(format!("Invalid {what} id")))
}

//=========================================================================================
// Handlers
//=========================================================================================

/// GET /api/topics - All topics, newest first
#[utoipa::path(
    get,
    path = "/api/topics",
    responses(
        (status = 200, description = "All topics, newest first", body = [TopicResponse]),
        (status = 500, description = "Internal server error", body = MessageResponse)
    )
)]
pub async fn list_topics_handler(
    State(state): State<Arc<AppState>>,
) -> HandlerResult<Json<Vec<TopicResponse>>> {
    let topics = state.db.list_topics().await.map_err(|e| {
        error!("Failed to list topics: {:?}", e);
        HandlerError::from(e)
    })?;
    Ok(Json(topics.into_iter().map(TopicResponse::from).collect()))
}

/// POST /api/topics - Create a topic
#[utoipa::path(
    post,
    path = "/api/topics",
    request_body = CreateTopicRequest,
    responses(
        (status = 201, description = "Topic created", body = TopicResponse),
        (status = 400, description = "Validation failed; nothing was stored", body = MessageResponse)
    )
)]
pub async fn create_topic_handler(
    State(state): State<Arc<AppState>>,
    JsonBody(body): JsonBody<Value>,
) -> HandlerResult<impl IntoResponse> {
    let new_topic = validate_topic(&body)?;

    let topic = state.db.create_topic(new_topic).await.map_err(|e| {
        error!("Failed to create topic: {:?}", e);
        HandlerError::bad_request(e.to_string())
    })?;
    info!("Created topic {}", topic.id);

    Ok((StatusCode::CREATED, Json(TopicResponse::from(topic))))
}

/// DELETE /api/topics/{id} - Delete a topic (its sessions are kept)
#[utoipa::path(
    delete,
    path = "/api/topics/{id}",
    params(("id" = Uuid, Path, description = "Topic id")),
    responses(
        (status = 200, description = "Topic deleted, or it did not exist", body = MessageResponse),
        (status = 400, description = "Malformed id", body = MessageResponse)
    )
)]
pub async fn delete_topic_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> HandlerResult<Json<MessageResponse>> {
    let topic_id = parse_id(&id, "topic")?;

    state.db.delete_topic(topic_id).await.map_err(|e| {
        error!("Failed to delete topic {}: {:?}", topic_id, e);
        HandlerError::from(e)
    })?;
    info!("Deleted topic {}", topic_id);

    Ok(Json(MessageResponse::new("Topic deleted")))
}

/// PATCH /api/topics/{id}/status - Move a topic to another status
#[utoipa::path(
    patch,
    path = "/api/topics/{id}/status",
    params(("id" = Uuid, Path, description = "Topic id")),
    request_body = UpdateStatusRequest,
    responses(
        (status = 200, description = "The topic after the update", body = TopicResponse),
        (status = 400, description = "Unknown topic or invalid status", body = MessageResponse)
    )
)]
pub async fn update_topic_status_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<UpdateStatusRequest>,
) -> HandlerResult<Json<TopicResponse>> {
    let topic_id = parse_id(&id, "topic")?;

    // An absent or empty status leaves the topic as it is.
    let topic = match req.status.as_deref().filter(|s| !s.is_empty()) {
        Some(raw) => {
            let status = raw
                .parse::<TopicStatus>()
                .map_err(HandlerError::bad_request)?;
            state.db.update_topic_status(topic_id, status).await
        }
        None => state.db.get_topic_by_id(topic_id).await,
    }
    .map_err(|e| {
        error!("Failed to update status of topic {}: {:?}", topic_id, e);
        HandlerError::from(e)
    })?;

    Ok(Json(TopicResponse::from(topic)))
}
