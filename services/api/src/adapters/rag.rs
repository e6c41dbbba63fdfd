//! services/api/src/adapters/rag.rs
//!
//! This module contains the adapter for the external RAG service that generates
//! summaries, improved notes, chat replies and study plans.
//! It implements the `StudyAssistantService` port from the `core` crate.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{header::CONTENT_TYPE, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Deserialize, Serialize, Serializer};
use std::time::Duration;
use study_tracker_core::{
    domain::{ChatMessage, ChatRole, ProgressSummary, Resource, Session, Topic},
    ports::{StudyAssistantService, UpstreamError, UpstreamResult},
};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::AI_SERVICE_TIMEOUT;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `StudyAssistantService` by calling the RAG service over HTTP.
#[derive(Clone, Debug)]
pub struct RagClient {
    http: reqwest::Client,
    base_url: String,
}

impl RagClient {
    /// Creates a client with the standard cold-start tolerant timeout.
    ///
    /// `base_url` is expected to be normalized already (see `config::normalize_base_url`).
    pub fn new(base_url: impl Into<String>) -> Result<Self, reqwest::Error> {
        Self::with_timeout(base_url, AI_SERVICE_TIMEOUT)
    }

    pub fn with_timeout(
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        Ok(Self {
            http: reqwest::Client::builder().timeout(timeout).build()?,
            base_url: base_url.into(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn post_json<B, T>(&self, path: &str, body: &B) -> UpstreamResult<T>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        self.send(self.http.post(self.url(path)).json(body)).await
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> UpstreamResult<T> {
        self.send(self.http.get(self.url(path))).await
    }

    /// Sends a request and sorts any failure into one of the three `UpstreamError` kinds.
    ///
    /// An error status wins over a failed body read: whatever part of the body arrived
    /// is kept.
    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> UpstreamResult<T> {
        let response = request.send().await.map_err(classify_send_error)?;
        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        if !status.is_success() {
            warn!("AI service responded with status {}", status);
            return Err(UpstreamError::Status {
                status: status.as_u16(),
                content_type,
                body: read_partial_body(response).await,
            });
        }

        let body = response.bytes().await.map_err(|e| {
            warn!("Failed to read AI service response body: {}", e);
            UpstreamError::NoResponse(e.to_string())
        })?;

        debug!("AI service responded with {} bytes", body.len());
        serde_json::from_slice(&body).map_err(|e| {
            UpstreamError::Local(format!("AI service returned an unexpected payload: {}", e))
        })
    }
}

async fn read_partial_body(mut response: Response) -> Vec<u8> {
    let mut body = Vec::new();
    loop {
        match response.chunk().await {
            Ok(Some(chunk)) => body.extend_from_slice(&chunk),
            Ok(None) => break,
            Err(e) => {
                warn!("AI service error body cut short after {} bytes: {}", body.len(), e);
                break;
            }
        }
    }
    body
}

fn classify_send_error(e: reqwest::Error) -> UpstreamError {
    if e.is_builder() {
        warn!("Could not build request to AI service: {}", e);
        UpstreamError::Local(e.to_string())
    } else {
        warn!("No response from AI service: {}", e);
        UpstreamError::NoResponse(e.to_string())
    }
}

//=========================================================================================
// Wire Types
//=========================================================================================

#[derive(Serialize)]
struct TopicPayload<'a> {
    #[serde(rename = "_id")]
    id: Uuid,
    title: &'a str,
    category: &'a str,
    status: &'static str,
    goal: Option<&'a str>,
    #[serde(rename = "createdAt")]
    created_at: DateTime<Utc>,
}

impl<'a> From<&'a Topic> for TopicPayload<'a> {
    fn from(topic: &'a Topic) -> Self {
        Self {
            id: topic.id,
            title: &topic.title,
            category: &topic.category,
            status: topic.status.as_str(),
            goal: topic.goal.as_deref(),
            created_at: topic.created_at,
        }
    }
}

#[derive(Serialize)]
struct SessionPayload<'a> {
    #[serde(rename = "_id")]
    id: Uuid,
    #[serde(rename = "topicId")]
    topic_id: Uuid,
    date: DateTime<Utc>,
    #[serde(serialize_with = "serialize_minutes")]
    duration: f64,
    notes: &'a str,
    #[serde(rename = "createdAt")]
    created_at: DateTime<Utc>,
}

impl<'a> From<&'a Session> for SessionPayload<'a> {
    fn from(session: &'a Session) -> Self {
        Self {
            id: session.id,
            topic_id: session.topic_id,
            date: session.date,
            duration: session.duration,
            notes: &session.notes,
            created_at: session.created_at,
        }
    }
}

/// The RAG service types `duration` as an integer, so whole minutes go out as `60`
/// rather than `60.0`. Fractional minutes are sent as they are.
fn serialize_minutes<S: Serializer>(minutes: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    if minutes.fract() == 0.0 && minutes.abs() < i64::MAX as f64 {
        serializer.serialize_i64(*minutes as i64)
    } else {
        serializer.serialize_f64(*minutes)
    }
}

#[derive(Serialize)]
struct AnalyzeRequest<'a> {
    topics: Vec<TopicPayload<'a>>,
    sessions: Vec<SessionPayload<'a>>,
    query: &'a str,
}

#[derive(Serialize)]
struct ImproveNotesRequest<'a> {
    notes: &'a str,
    topic: &'a str,
}

#[derive(Serialize)]
struct HistoryEntry<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    message: &'a str,
    history: Vec<HistoryEntry<'a>>,
}

#[derive(Serialize)]
struct PlanRequest<'a> {
    topics: &'a [String],
    goals: &'a str,
    hours_per_week: u32,
}

#[derive(Serialize, Deserialize)]
struct ResourceRecord {
    category: String,
    content: String,
}

impl From<ResourceRecord> for Resource {
    fn from(record: ResourceRecord) -> Self {
        Resource {
            category: record.category,
            content: record.content,
        }
    }
}

#[derive(Deserialize)]
struct SummaryResponse {
    summary: String,
    #[serde(default)]
    context_used: Option<Vec<String>>,
}

#[derive(Deserialize)]
struct ImprovedNotesResponse {
    #[serde(rename = "improvedNotes")]
    improved_notes: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    reply: String,
}

#[derive(Deserialize)]
struct PlanResponse {
    plan: String,
}

fn role_name(role: ChatRole) -> &'static str {
    match role {
        ChatRole::User => "user",
        ChatRole::Assistant => "assistant",
    }
}

//=========================================================================================
// `StudyAssistantService` Trait Implementation
//=========================================================================================

#[async_trait]
impl StudyAssistantService for RagClient {
    async fn analyze(
        &self,
        topics: &[Topic],
        sessions: &[Session],
        query: &str,
    ) -> UpstreamResult<ProgressSummary> {
        let request = AnalyzeRequest {
            topics: topics.iter().map(TopicPayload::from).collect(),
            sessions: sessions.iter().map(SessionPayload::from).collect(),
            query,
        };
        let response: SummaryResponse = self.post_json("/rag/analyze", &request).await?;
        Ok(ProgressSummary {
            summary: response.summary,
            context_used: response.context_used,
        })
    }

    async fn improve_notes(&self, notes: &str, topic: &str) -> UpstreamResult<String> {
        let response: ImprovedNotesResponse = self
            .post_json("/rag/improve-notes", &ImproveNotesRequest { notes, topic })
            .await?;
        Ok(response.improved_notes)
    }

    async fn chat(&self, message: &str, history: &[ChatMessage]) -> UpstreamResult<String> {
        let request = ChatRequest {
            message,
            history: history
                .iter()
                .map(|m| HistoryEntry {
                    role: role_name(m.role),
                    content: &m.content,
                })
                .collect(),
        };
        let response: ChatResponse = self.post_json("/rag/chat", &request).await?;
        Ok(response.reply)
    }

    async fn plan(
        &self,
        topics: &[String],
        goals: &str,
        hours_per_week: u32,
    ) -> UpstreamResult<String> {
        let request = PlanRequest {
            topics,
            goals,
            hours_per_week,
        };
        let response: PlanResponse = self.post_json("/rag/plan", &request).await?;
        Ok(response.plan)
    }

    async fn list_resources(&self) -> UpstreamResult<Vec<Resource>> {
        let records: Vec<ResourceRecord> = self.get_json("/rag/knowledge").await?;
        Ok(records.into_iter().map(Resource::from).collect())
    }

    async fn add_resource(&self, category: &str, content: &str) -> UpstreamResult<Resource> {
        let request = ResourceRecord {
            category: category.to_string(),
            content: content.to_string(),
        };
        let record: ResourceRecord = self.post_json("/rag/knowledge", &request).await?;
        Ok(record.into())
    }
}
