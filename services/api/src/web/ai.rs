//! services/api/src/web/ai.rs
//!
//! Proxy handlers that forward requests to the RAG service, and the mapping
//! from upstream failures to client-facing responses.

use axum::{
    extract::State,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use study_tracker_core::{
    domain::{ChatMessage, ChatRole, ProgressSummary, Resource},
    ports::{PortError, UpstreamError},
};
use tracing::{error, warn};
use utoipa::ToSchema;

use crate::error::HandlerError;
use crate::web::{extract::JsonBody, state::AppState, validation::coerce_hours, MessageResponse};

const DEFAULT_SUMMARY_QUERY: &str = "Summarize my progress";
const DEFAULT_NOTES_TOPIC: &str = "General";

/// Shown when the RAG service does not answer. The hosted service sleeps when idle.
pub const COLD_START_MESSAGE: &str = "The AI service did not respond in time. It may be waking up \
     from a cold start; please try again in about 30 seconds.";

//=========================================================================================
// Responses
//=========================================================================================

/// A successful answer from one of the AI capabilities. Each variant serializes to the
/// exact field set the frontend reads for that capability.
#[derive(Debug, Serialize, ToSchema)]
#[serde(untagged)]
pub enum AiReply {
    Summary {
        summary: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        context_used: Option<Vec<String>>,
    },
    ImprovedNotes {
        #[serde(rename = "improvedNotes")]
        improved_notes: String,
    },
    Chat {
        reply: String,
    },
    Plan {
        plan: String,
    },
    Resources(Vec<ResourceResponse>),
    Resource(ResourceResponse),
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ResourceResponse {
    pub category: String,
    pub content: String,
}

impl From<Resource> for ResourceResponse {
    fn from(resource: Resource) -> Self {
        Self {
            category: resource.category,
            content: resource.content,
        }
    }
}

/// Everything a proxy handler can fail with.
#[derive(Debug)]
pub enum AiError {
    Upstream(UpstreamError),
    Handler(HandlerError),
}

impl From<UpstreamError> for AiError {
    fn from(err: UpstreamError) -> Self {
        Self::Upstream(err)
    }
}

impl From<HandlerError> for AiError {
    fn from(err: HandlerError) -> Self {
        Self::Handler(err)
    }
}

impl From<PortError> for AiError {
    fn from(err: PortError) -> Self {
        Self::Handler(HandlerError::internal(err.to_string()))
    }
}

impl IntoResponse for AiError {
    fn into_response(self) -> Response {
        match self {
            Self::Upstream(err) => upstream_error_response(err),
            Self::Handler(err) => err.into_response(),
        }
    }
}

/// Turns an upstream failure into the response the client sees.
///
/// - The service answered with an error status: that status and body, untouched.
/// - No answer at all: 504 with the cold-start hint.
/// - The call never happened or its answer was unusable: 502 with the local message.
pub fn upstream_error_response(err: UpstreamError) -> Response {
    match err {
        UpstreamError::Status {
            status,
            content_type,
            body,
        } => {
            let status = StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY);
            let content_type = content_type
                .and_then(|ct| HeaderValue::from_str(&ct).ok())
                .unwrap_or_else(|| HeaderValue::from_static("application/json"));
            (status, [(header::CONTENT_TYPE, content_type)], body).into_response()
        }
        UpstreamError::NoResponse(detail) => (
            StatusCode::GATEWAY_TIMEOUT,
            Json(json!({ "message": COLD_START_MESSAGE, "error": detail })),
        )
            .into_response(),
        UpstreamError::Local(message) => {
            (StatusCode::BAD_GATEWAY, Json(json!({ "message": message }))).into_response()
        }
    }
}

type AiResult = Result<Json<AiReply>, AiError>;

fn log_failure(capability: &str, err: &UpstreamError) {
    match err {
        UpstreamError::Status { status, .. } => {
            warn!("AI {} request rejected upstream with status {}", capability, status)
        }
        other => error!("AI {} request failed: {}", capability, other),
    }
}

//=========================================================================================
// Requests
//=========================================================================================

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct SummarizeRequest {
    #[serde(default)]
    pub query: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ImproveNotesRequest {
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub topic: Option<String>,
}

#[derive(Debug, Clone, Copy, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ChatRoleDto {
    User,
    Assistant,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ChatMessageDto {
    pub role: ChatRoleDto,
    pub content: String,
}

impl From<ChatMessageDto> for ChatMessage {
    fn from(dto: ChatMessageDto) -> Self {
        ChatMessage {
            role: match dto.role {
                ChatRoleDto::User => ChatRole::User,
                ChatRoleDto::Assistant => ChatRole::Assistant,
            },
            content: dto.content,
        }
    }
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
    /// The whole conversation so far; the server keeps no chat state.
    #[serde(default)]
    pub history: Vec<ChatMessageDto>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct PlanRequest {
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub goals: String,
    /// Weekly hours as a number or numeric string; defaults to 10.
    #[serde(default)]
    #[schema(value_type = Option<u32>)]
    pub hours: Option<Value>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct AddResourceRequest {
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub content: String,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /api/ai/summarize - Summarize progress over every stored topic and session
#[utoipa::path(
    post,
    path = "/api/ai/summarize",
    request_body = SummarizeRequest,
    responses(
        (status = 200, description = "Progress summary", body = AiReply),
        (status = 502, description = "The request to the AI service could not be made", body = MessageResponse),
        (status = 504, description = "The AI service did not answer in time", body = MessageResponse)
    )
)]
pub async fn summarize_handler(
    State(state): State<Arc<AppState>>,
    JsonBody(req): JsonBody<SummarizeRequest>,
) -> AiResult {
    let query = non_empty(req.query).unwrap_or_else(|| DEFAULT_SUMMARY_QUERY.to_string());

    let topics = state.db.list_topics().await.map_err(|e| {
        error!("Failed to load topics for summary: {:?}", e);
        e
    })?;
    let sessions = state.db.list_sessions().await.map_err(|e| {
        error!("Failed to load sessions for summary: {:?}", e);
        e
    })?;

    let ProgressSummary {
        summary,
        context_used,
    } = state
        .assistant
        .analyze(&topics, &sessions, &query)
        .await
        .inspect_err(|e| log_failure("summarize", e))?;

    Ok(Json(AiReply::Summary {
        summary,
        context_used,
    }))
}

/// POST /api/ai/improve-notes - Rewrite notes to be clearer
#[utoipa::path(
    post,
    path = "/api/ai/improve-notes",
    request_body = ImproveNotesRequest,
    responses(
        (status = 200, description = "Improved notes", body = AiReply),
        (status = 400, description = "Notes are missing", body = MessageResponse),
        (status = 504, description = "The AI service did not answer in time", body = MessageResponse)
    )
)]
pub async fn improve_notes_handler(
    State(state): State<Arc<AppState>>,
    JsonBody(req): JsonBody<ImproveNotesRequest>,
) -> AiResult {
    let notes = req
        .notes
        .filter(|n| !n.is_empty())
        .ok_or_else(|| HandlerError::bad_request("Notes are required"))?;
    let topic = non_empty(req.topic).unwrap_or_else(|| DEFAULT_NOTES_TOPIC.to_string());

    let improved_notes = state
        .assistant
        .improve_notes(&notes, &topic)
        .await
        .inspect_err(|e| log_failure("improve-notes", e))?;

    Ok(Json(AiReply::ImprovedNotes { improved_notes }))
}

/// POST /api/ai/chat - Reply to a chat message given the conversation so far
#[utoipa::path(
    post,
    path = "/api/ai/chat",
    request_body = ChatRequest,
    responses(
        (status = 200, description = "Assistant reply", body = AiReply),
        (status = 504, description = "The AI service did not answer in time", body = MessageResponse)
    )
)]
pub async fn chat_handler(
    State(state): State<Arc<AppState>>,
    JsonBody(req): JsonBody<ChatRequest>,
) -> AiResult {
    let history: Vec<ChatMessage> = req.history.into_iter().map(ChatMessage::from).collect();

    let reply = state
        .assistant
        .chat(&req.message, &history)
        .await
        .inspect_err(|e| log_failure("chat", e))?;

    Ok(Json(AiReply::Chat { reply }))
}

/// POST /api/ai/plan - Generate a weekly study plan
#[utoipa::path(
    post,
    path = "/api/ai/plan",
    request_body = PlanRequest,
    responses(
        (status = 200, description = "Weekly plan", body = AiReply),
        (status = 504, description = "The AI service did not answer in time", body = MessageResponse)
    )
)]
pub async fn plan_handler(
    State(state): State<Arc<AppState>>,
    JsonBody(req): JsonBody<PlanRequest>,
) -> AiResult {
    let hours_per_week = coerce_hours(req.hours.as_ref());

    let plan = state
        .assistant
        .plan(&req.topics, &req.goals, hours_per_week)
        .await
        .inspect_err(|e| log_failure("plan", e))?;

    Ok(Json(AiReply::Plan { plan }))
}

/// GET /api/ai/resources - List the knowledge base
#[utoipa::path(
    get,
    path = "/api/ai/resources",
    responses(
        (status = 200, description = "Knowledge-base entries", body = [ResourceResponse]),
        (status = 504, description = "The AI service did not answer in time", body = MessageResponse)
    )
)]
pub async fn list_resources_handler(State(state): State<Arc<AppState>>) -> AiResult {
    let resources = state
        .assistant
        .list_resources()
        .await
        .inspect_err(|e| log_failure("list-resources", e))?;

    Ok(Json(AiReply::Resources(
        resources.into_iter().map(ResourceResponse::from).collect(),
    )))
}

/// POST /api/ai/resources - Add an entry to the knowledge base
#[utoipa::path(
    post,
    path = "/api/ai/resources",
    request_body = AddResourceRequest,
    responses(
        (status = 200, description = "The stored entry", body = ResourceResponse),
        (status = 504, description = "The AI service did not answer in time", body = MessageResponse)
    )
)]
pub async fn add_resource_handler(
    State(state): State<Arc<AppState>>,
    JsonBody(req): JsonBody<AddResourceRequest>,
) -> AiResult {
    let resource = state
        .assistant
        .add_resource(&req.category, &req.content)
        .await
        .inspect_err(|e| log_failure("add-resource", e))?;

    Ok(Json(AiReply::Resource(resource.into())))
}
