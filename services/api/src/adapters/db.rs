//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `DatabaseService` port from the `core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use study_tracker_core::domain::{
    NewSession, NewTopic, PopulatedSession, Session, Topic, TopicStatus, User, UserCredentials,
};
use study_tracker_core::ports::{DatabaseService, PortError, PortResult};
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `DatabaseService` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct UserRecord {
    id: Uuid,
    username: String,
    email: String,
    hashed_password: String,
}
impl UserRecord {
    fn to_credentials(self) -> UserCredentials {
        UserCredentials {
            user: User {
                id: self.id,
                username: self.username,
                email: self.email,
            },
            hashed_password: self.hashed_password,
        }
    }
}

#[derive(FromRow)]
struct TopicRecord {
    id: Uuid,
    title: String,
    category: String,
    status: String,
    goal: Option<String>,
    created_at: DateTime<Utc>,
}
impl TopicRecord {
    fn to_domain(self) -> PortResult<Topic> {
        Ok(Topic {
            id: self.id,
            title: self.title,
            category: self.category,
            status: self.status.parse().map_err(PortError::Unexpected)?,
            goal: self.goal,
            created_at: self.created_at,
        })
    }
}

#[derive(FromRow)]
struct SessionRecord {
    id: Uuid,
    topic_id: Uuid,
    date: DateTime<Utc>,
    duration: f64,
    notes: String,
    created_at: DateTime<Utc>,
}
impl SessionRecord {
    fn to_domain(self) -> Session {
        Session {
            id: self.id,
            topic_id: self.topic_id,
            date: self.date,
            duration: self.duration,
            notes: self.notes,
            created_at: self.created_at,
        }
    }
}

/// A session row left-joined with its topic; the `t_` columns are NULL for dangling sessions.
#[derive(FromRow)]
struct PopulatedSessionRecord {
    id: Uuid,
    topic_id: Uuid,
    date: DateTime<Utc>,
    duration: f64,
    notes: String,
    created_at: DateTime<Utc>,
    t_id: Option<Uuid>,
    t_title: Option<String>,
    t_category: Option<String>,
    t_status: Option<String>,
    t_goal: Option<String>,
    t_created_at: Option<DateTime<Utc>>,
}
impl PopulatedSessionRecord {
    fn to_domain(self) -> PortResult<PopulatedSession> {
        let topic = match (
            self.t_id,
            self.t_title,
            self.t_category,
            self.t_status,
            self.t_created_at,
        ) {
            (Some(id), Some(title), Some(category), Some(status), Some(created_at)) => {
                Some(
                    TopicRecord {
                        id,
                        title,
                        category,
                        status,
                        goal: self.t_goal,
                        created_at,
                    }
                    .to_domain()?,
                )
            }
            _ => None,
        };

        Ok(PopulatedSession {
            session: Session {
                id: self.id,
                topic_id: self.topic_id,
                date: self.date,
                duration: self.duration,
                notes: self.notes,
                created_at: self.created_at,
            },
            topic,
        })
    }
}

const TOPIC_COLUMNS: &str = "id, title, category, status, goal, created_at";
const SESSION_COLUMNS: &str = "id, topic_id, date, duration, notes, created_at";

//=========================================================================================
// `DatabaseService` Trait Implementation
//=========================================================================================

#[async_trait]
impl DatabaseService for DbAdapter {
    async fn create_user(
        &self,
        username: &str,
        email: &str,
        hashed_password: &str,
    ) -> PortResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(
            "INSERT INTO users (id, username, email, hashed_password) VALUES ($1, $2, $3, $4) \
             RETURNING id, username, email, hashed_password",
        )
        .bind(Uuid::new_v4())
        .bind(username)
        .bind(email)
        .bind(hashed_password)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => PortError::Conflict(
                "User with this email or username already exists".to_string(),
            ),
            _ => unexpected(e),
        })?;

        Ok(record.to_credentials().user)
    }

    async fn user_exists(&self, username: &str, email: &str) -> PortResult<bool> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM users WHERE email = $1 OR username = $2)",
        )
        .bind(email)
        .bind(username)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)
    }

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        let record = sqlx::query_as::<_, UserRecord>(
            "SELECT id, username, email, hashed_password FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => PortError::NotFound("User does not exist".to_string()),
            _ => unexpected(e),
        })?;

        Ok(record.to_credentials())
    }

    async fn get_user_by_id(&self, user_id: Uuid) -> PortResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(
            "SELECT id, username, email, hashed_password FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => PortError::NotFound(format!("User {} not found", user_id)),
            _ => unexpected(e),
        })?;

        Ok(record.to_credentials().user)
    }

    async fn list_topics(&self) -> PortResult<Vec<Topic>> {
        let records = sqlx::query_as::<_, TopicRecord>(&format!(
            "SELECT {TOPIC_COLUMNS} FROM topics ORDER BY created_at DESC, id DESC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        records.into_iter().map(TopicRecord::to_domain).collect()
    }

    async fn get_topic_by_id(&self, topic_id: Uuid) -> PortResult<Topic> {
        sqlx::query_as::<_, TopicRecord>(&format!(
            "SELECT {TOPIC_COLUMNS} FROM topics WHERE id = $1"
        ))
        .bind(topic_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => PortError::NotFound("Topic not found".to_string()),
            _ => unexpected(e),
        })?
        .to_domain()
    }

    async fn create_topic(&self, topic: NewTopic) -> PortResult<Topic> {
        sqlx::query_as::<_, TopicRecord>(&format!(
            "INSERT INTO topics (id, title, category, status, goal) VALUES ($1, $2, $3, $4, $5) \
             RETURNING {TOPIC_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(&topic.title)
        .bind(&topic.category)
        .bind(TopicStatus::default().as_str())
        .bind(&topic.goal)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?
        .to_domain()
    }

    async fn delete_topic(&self, topic_id: Uuid) -> PortResult<()> {
        sqlx::query("DELETE FROM topics WHERE id = $1")
            .bind(topic_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn update_topic_status(&self, topic_id: Uuid, status: TopicStatus) -> PortResult<Topic> {
        sqlx::query_as::<_, TopicRecord>(&format!(
            "UPDATE topics SET status = $1 WHERE id = $2 RETURNING {TOPIC_COLUMNS}"
        ))
        .bind(status.as_str())
        .bind(topic_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => PortError::NotFound("Topic not found".to_string()),
            _ => unexpected(e),
        })?
        .to_domain()
    }

    async fn list_sessions(&self) -> PortResult<Vec<Session>> {
        let records = sqlx::query_as::<_, SessionRecord>(&format!(
            "SELECT {SESSION_COLUMNS} FROM sessions ORDER BY created_at ASC, id ASC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        Ok(records.into_iter().map(SessionRecord::to_domain).collect())
    }

    async fn list_sessions_with_topics(&self) -> PortResult<Vec<PopulatedSession>> {
        let records = sqlx::query_as::<_, PopulatedSessionRecord>(
            "SELECT s.id, s.topic_id, s.date, s.duration, s.notes, s.created_at, \
                    t.id AS t_id, t.title AS t_title, t.category AS t_category, \
                    t.status AS t_status, t.goal AS t_goal, t.created_at AS t_created_at \
             FROM sessions s LEFT JOIN topics t ON t.id = s.topic_id \
             ORDER BY s.created_at ASC, s.id ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        records
            .into_iter()
            .map(PopulatedSessionRecord::to_domain)
            .collect()
    }

    async fn list_sessions_for_topic(&self, topic_id: Uuid) -> PortResult<Vec<Session>> {
        let records = sqlx::query_as::<_, SessionRecord>(&format!(
            "SELECT {SESSION_COLUMNS} FROM sessions WHERE topic_id = $1 ORDER BY date DESC, id DESC"
        ))
        .bind(topic_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        Ok(records.into_iter().map(SessionRecord::to_domain).collect())
    }

    async fn create_session(&self, session: NewSession) -> PortResult<Session> {
        let record = sqlx::query_as::<_, SessionRecord>(&format!(
            "INSERT INTO sessions (id, topic_id, date, duration, notes) VALUES ($1, $2, $3, $4, $5) \
             RETURNING {SESSION_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(session.topic_id)
        .bind(session.date)
        .bind(session.duration)
        .bind(&session.notes)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;

        Ok(record.to_domain())
    }
}
