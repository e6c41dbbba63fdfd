//! crates/study_tracker_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like databases or APIs.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{
    ChatMessage, NewSession, NewTopic, PopulatedSession, ProgressSummary, Resource, Session,
    Topic, TopicStatus, User, UserCredentials,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for the storage port.
/// This abstracts away the specific errors from the underlying database driver.
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

/// How a call to the RAG service failed. Every failure is exactly one of these.
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    /// The service answered, but with a non-success status.
    #[error("AI service responded with status {status}")]
    Status {
        status: u16,
        content_type: Option<String>,
        body: Vec<u8>,
    },
    /// No answer arrived: connection refused, network failure or timeout.
    #[error("No response from AI service: {0}")]
    NoResponse(String),
    /// The request never left this process, or its answer could not be understood.
    #[error("{0}")]
    Local(String),
}

pub type UpstreamResult<T> = Result<T, UpstreamError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait DatabaseService: Send + Sync {
    // --- Users ---
    async fn create_user(
        &self,
        username: &str,
        email: &str,
        hashed_password: &str,
    ) -> PortResult<User>;

    /// True when either the username or the email is already taken.
    async fn user_exists(&self, username: &str, email: &str) -> PortResult<bool>;

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials>;

    async fn get_user_by_id(&self, user_id: Uuid) -> PortResult<User>;

    // --- Topics ---
    /// All topics, newest first.
    async fn list_topics(&self) -> PortResult<Vec<Topic>>;

    async fn get_topic_by_id(&self, topic_id: Uuid) -> PortResult<Topic>;

    async fn create_topic(&self, topic: NewTopic) -> PortResult<Topic>;

    /// Deleting a topic that does not exist is not an error.
    async fn delete_topic(&self, topic_id: Uuid) -> PortResult<()>;

    async fn update_topic_status(&self, topic_id: Uuid, status: TopicStatus) -> PortResult<Topic>;

    // --- Study Sessions ---
    async fn list_sessions(&self) -> PortResult<Vec<Session>>;

    async fn list_sessions_with_topics(&self) -> PortResult<Vec<PopulatedSession>>;

    /// Sessions logged against one topic, most recent `date` first.
    async fn list_sessions_for_topic(&self, topic_id: Uuid) -> PortResult<Vec<Session>>;

    async fn create_session(&self, session: NewSession) -> PortResult<Session>;
}

#[async_trait]
pub trait StudyAssistantService: Send + Sync {
    /// Summarizes the user's progress across the given topics and sessions.
    async fn analyze(
        &self,
        topics: &[Topic],
        sessions: &[Session],
        query: &str,
    ) -> UpstreamResult<ProgressSummary>;

    /// Rewrites a set of notes to be clearer and better structured.
    async fn improve_notes(&self, notes: &str, topic: &str) -> UpstreamResult<String>;

    /// Answers a chat message, given the conversation so far.
    async fn chat(&self, message: &str, history: &[ChatMessage]) -> UpstreamResult<String>;

    /// Produces a weekly study plan.
    async fn plan(
        &self,
        topics: &[String],
        goals: &str,
        hours_per_week: u32,
    ) -> UpstreamResult<String>;

    async fn list_resources(&self) -> UpstreamResult<Vec<Resource>>;

    async fn add_resource(&self, category: &str, content: &str) -> UpstreamResult<Resource>;
}
