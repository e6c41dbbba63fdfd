//! crates/study_tracker_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or serialization format.

use chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

//=========================================================================================
// Topics
//=========================================================================================

/// The progress a user has made on a topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TopicStatus {
    #[default]
    NotStarted,
    InProgress,
    Revised,
}

impl TopicStatus {
    pub const ALL: [TopicStatus; 3] = [Self::NotStarted, Self::InProgress, Self::Revised];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotStarted => "Not Started",
            Self::InProgress => "In Progress",
            Self::Revised => "Revised",
        }
    }
}

impl fmt::Display for TopicStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TopicStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == value)
            .ok_or_else(|| format!("`{value}` is not a valid topic status"))
    }
}

/// A user-defined subject of study.
#[derive(Debug, Clone, PartialEq)]
pub struct Topic {
    pub id: Uuid,
    pub title: String,
    pub category: String,
    pub status: TopicStatus,
    pub goal: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// The fields a user supplies when creating a topic.
#[derive(Debug, Clone)]
pub struct NewTopic {
    pub title: String,
    pub category: String,
    pub goal: Option<String>,
}

//=========================================================================================
// Study Sessions
//=========================================================================================

/// A single logged study interval. Sessions are never edited after creation.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub id: Uuid,
    /// Not checked against existing topics, and left dangling when a topic is deleted.
    pub topic_id: Uuid,
    pub date: DateTime<Utc>,
    /// Length of the session in minutes.
    pub duration: f64,
    pub notes: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewSession {
    pub topic_id: Uuid,
    pub date: DateTime<Utc>,
    pub duration: f64,
    pub notes: String,
}

/// A session joined with the topic it references, if that topic still exists.
#[derive(Debug, Clone)]
pub struct PopulatedSession {
    pub session: Session,
    pub topic: Option<Topic>,
}

//=========================================================================================
// Users
//=========================================================================================

// Represents a user - safe to send back to clients
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
}

// Only used internally for login/signup - contains sensitive data
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user: User,
    pub hashed_password: String,
}

//=========================================================================================
// AI Assistant
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRole {
    User,
    Assistant,
}

/// One turn of a chat conversation. The client keeps the history and resends it.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

/// The RAG service's answer to a progress summary request.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressSummary {
    pub summary: String,
    /// The retrieved snippets the summary was generated from. Absent when there was
    /// nothing to analyze.
    pub context_used: Option<Vec<String>>,
}

/// A knowledge-base entry held by the RAG service.
#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    pub category: String,
    pub content: String,
}
