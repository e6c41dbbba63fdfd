//! Shared fixtures for the API integration tests.
//!
//! Each test builds the real axum router over an in-memory `DatabaseService`
//! and a real `RagClient` pointed at whatever upstream the test provides, then
//! sends requests through `tower::ServiceExt::oneshot`.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use api_lib::{adapters::RagClient, config::Config, web::api_router, web::state::AppState};
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use chrono::Utc;
use serde_json::Value;
use study_tracker_core::domain::{
    NewSession, NewTopic, PopulatedSession, Session, Topic, TopicStatus, User, UserCredentials,
};
use study_tracker_core::ports::{DatabaseService, PortError, PortResult};
use tower::ServiceExt; // for `.oneshot()`
use uuid::Uuid;

pub const TEST_JWT_SECRET: &str = "integration-test-secret";

// ---------------------------------------------------------------------------
// In-memory store
// ---------------------------------------------------------------------------

#[derive(Default)]
struct Tables {
    users: Vec<UserCredentials>,
    topics: Vec<Topic>,
    sessions: Vec<Session>,
}

/// Keeps rows in insertion order, so "newest first" is simply reverse order.
#[derive(Default)]
pub struct InMemoryDb {
    tables: Mutex<Tables>,
}

impl InMemoryDb {
    pub fn topic_count(&self) -> usize {
        self.tables.lock().unwrap().topics.len()
    }

    pub fn session_count(&self) -> usize {
        self.tables.lock().unwrap().sessions.len()
    }

    pub fn stored_password_hash(&self, email: &str) -> Option<String> {
        self.tables
            .lock()
            .unwrap()
            .users
            .iter()
            .find(|u| u.user.email == email)
            .map(|u| u.hashed_password.clone())
    }
}

#[async_trait]
impl DatabaseService for InMemoryDb {
    async fn create_user(
        &self,
        username: &str,
        email: &str,
        hashed_password: &str,
    ) -> PortResult<User> {
        let mut tables = self.tables.lock().unwrap();
        if tables
            .users
            .iter()
            .any(|u| u.user.username == username || u.user.email == email)
        {
            return Err(PortError::Conflict(
                "User with this email or username already exists".to_string(),
            ));
        }
        let user = User {
            id: Uuid::new_v4(),
            username: username.to_string(),
            email: email.to_string(),
        };
        tables.users.push(UserCredentials {
            user: user.clone(),
            hashed_password: hashed_password.to_string(),
        });
        Ok(user)
    }

    async fn user_exists(&self, username: &str, email: &str) -> PortResult<bool> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .users
            .iter()
            .any(|u| u.user.username == username || u.user.email == email))
    }

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        let tables = self.tables.lock().unwrap();
        tables
            .users
            .iter()
            .find(|u| u.user.email == email)
            .cloned()
            .ok_or_else(|| PortError::NotFound("User does not exist".to_string()))
    }

    async fn get_user_by_id(&self, user_id: Uuid) -> PortResult<User> {
        let tables = self.tables.lock().unwrap();
        tables
            .users
            .iter()
            .find(|u| u.user.id == user_id)
            .map(|u| u.user.clone())
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", user_id)))
    }

    async fn list_topics(&self) -> PortResult<Vec<Topic>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables.topics.iter().rev().cloned().collect())
    }

    async fn get_topic_by_id(&self, topic_id: Uuid) -> PortResult<Topic> {
        let tables = self.tables.lock().unwrap();
        tables
            .topics
            .iter()
            .find(|t| t.id == topic_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound("Topic not found".to_string()))
    }

    async fn create_topic(&self, topic: NewTopic) -> PortResult<Topic> {
        let topic = Topic {
            id: Uuid::new_v4(),
            title: topic.title,
            category: topic.category,
            status: TopicStatus::default(),
            goal: topic.goal,
            created_at: Utc::now(),
        };
        self.tables.lock().unwrap().topics.push(topic.clone());
        Ok(topic)
    }

    async fn delete_topic(&self, topic_id: Uuid) -> PortResult<()> {
        self.tables
            .lock()
            .unwrap()
            .topics
            .retain(|t| t.id != topic_id);
        Ok(())
    }

    async fn update_topic_status(&self, topic_id: Uuid, status: TopicStatus) -> PortResult<Topic> {
        let mut tables = self.tables.lock().unwrap();
        let topic = tables
            .topics
            .iter_mut()
            .find(|t| t.id == topic_id)
            .ok_or_else(|| PortError::NotFound("Topic not found".to_string()))?;
        topic.status = status;
        Ok(topic.clone())
    }

    async fn list_sessions(&self) -> PortResult<Vec<Session>> {
        Ok(self.tables.lock().unwrap().sessions.clone())
    }

    async fn list_sessions_with_topics(&self) -> PortResult<Vec<PopulatedSession>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .sessions
            .iter()
            .map(|s| PopulatedSession {
                session: s.clone(),
                topic: tables.topics.iter().find(|t| t.id == s.topic_id).cloned(),
            })
            .collect())
    }

    async fn list_sessions_for_topic(&self, topic_id: Uuid) -> PortResult<Vec<Session>> {
        let tables = self.tables.lock().unwrap();
        let mut sessions: Vec<Session> = tables
            .sessions
            .iter()
            .rev()
            .filter(|s| s.topic_id == topic_id)
            .cloned()
            .collect();
        sessions.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(sessions)
    }

    async fn create_session(&self, session: NewSession) -> PortResult<Session> {
        let session = Session {
            id: Uuid::new_v4(),
            topic_id: session.topic_id,
            date: session.date,
            duration: session.duration,
            notes: session.notes,
            created_at: Utc::now(),
        };
        self.tables.lock().unwrap().sessions.push(session.clone());
        Ok(session)
    }
}

// ---------------------------------------------------------------------------
// App setup
// ---------------------------------------------------------------------------

pub struct TestApp {
    pub router: Router,
    pub db: Arc<InMemoryDb>,
}

pub fn test_config(ai_service_url: &str) -> Config {
    Config {
        bind_address: "127.0.0.1:0".parse().unwrap(),
        database_url: "postgres://unused".to_string(),
        log_level: tracing::Level::INFO,
        ai_service_url: ai_service_url.to_string(),
        jwt_secret: TEST_JWT_SECRET.to_string(),
        frontend_origin: None,
    }
}

/// An app whose AI calls go to `ai_service_url` and give up after `timeout`.
pub fn app_with_upstream(ai_service_url: &str, timeout: Duration) -> TestApp {
    let db = Arc::new(InMemoryDb::default());
    let assistant = RagClient::with_timeout(ai_service_url, timeout).unwrap();
    let state = Arc::new(AppState {
        db: db.clone(),
        assistant: Arc::new(assistant),
        config: Arc::new(test_config(ai_service_url)),
    });
    TestApp {
        router: api_router(state),
        db,
    }
}

/// An app for tests that never reach the AI service.
pub fn app() -> TestApp {
    app_with_upstream("http://127.0.0.1:9", Duration::from_secs(1))
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

pub fn json_request(method: Method, uri: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    match body {
        Some(val) => builder.body(Body::from(val.to_string())).unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

/// A request carrying `body` verbatim and no `Content-Type`.
pub fn raw_request(method: Method, uri: &str, body: &'static str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::from(body))
        .unwrap()
}

pub fn bearer_request(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method(Method::GET)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap()
}

/// Sends one request and returns the status and JSON body (`Null` when empty).
pub async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let resp = router.clone().oneshot(request).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).to_string()))
    };
    (status, body)
}

pub async fn create_topic(router: &Router, title: &str, category: &str) -> Value {
    let (status, body) = send(
        router,
        json_request(
            Method::POST,
            "/api/topics",
            Some(serde_json::json!({"title": title, "category": category})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "unexpected body: {body}");
    body
}
