//! services/api/src/web/validation.rs
//!
//! Request-body validation for topic and session writes, plus the numeric
//! coercion used by the study planner. Every rule that fails contributes one
//! message; the messages are joined with `,` in the 400 response.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::{Map, Value};
use std::fmt;
use study_tracker_core::domain::{NewSession, NewTopic};
use uuid::Uuid;

use crate::error::HandlerError;

/// Weekly study hours assumed when the client sends none (or nonsense).
pub const DEFAULT_HOURS_PER_WEEK: u32 = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError(pub Vec<String>);

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join(","))
    }
}

impl From<ValidationError> for HandlerError {
    fn from(err: ValidationError) -> Self {
        HandlerError::bad_request(err.to_string())
    }
}

/// Collects failures while reading fields out of a JSON object.
struct Fields<'a> {
    body: &'a Map<String, Value>,
    errors: Vec<String>,
}

impl<'a> Fields<'a> {
    fn new(body: &'a Value, allowed: &[&str]) -> Result<Self, ValidationError> {
        let body = body
            .as_object()
            .ok_or_else(|| ValidationError(vec!["\"value\" must be of type object".to_string()]))?;

        let errors = body
            .keys()
            .filter(|key| !allowed.contains(&key.as_str()))
            .map(|key| format!("\"{key}\" is not allowed"))
            .collect();

        Ok(Self { body, errors })
    }

    fn fail(&mut self, message: String) {
        self.errors.push(message);
    }

    /// A string field. Length is checked on the raw value; the trimmed value is
    /// returned, and must still be non-empty when `min_len` is positive.
    /// `min_len` of zero makes empty strings acceptable.
    fn string(&mut self, key: &str, required: bool, min_len: usize) -> Option<String> {
        match self.body.get(key) {
            None if required => {
                self.fail(format!("\"{key}\" is required"));
                None
            }
            None => None,
            Some(Value::String(raw)) => {
                let len = raw.chars().count();
                let value = raw.trim();
                if len == 0 && min_len > 0 {
                    self.fail(format!("\"{key}\" is not allowed to be empty"));
                    None
                } else if len < min_len {
                    self.fail(format!(
                        "\"{key}\" length must be at least {min_len} characters long"
                    ));
                    None
                } else if value.is_empty() && min_len > 0 {
                    // Whitespace only: nothing would be left to store.
                    self.fail(format!("\"{key}\" is not allowed to be empty"));
                    None
                } else {
                    Some(value.to_string())
                }
            }
            Some(_) => {
                self.fail(format!("\"{key}\" must be a string"));
                None
            }
        }
    }

    /// A required number, also accepted as a numeric string.
    fn number(&mut self, key: &str, min: f64) -> Option<f64> {
        let parsed = match self.body.get(key) {
            None => {
                self.fail(format!("\"{key}\" is required"));
                return None;
            }
            Some(Value::Number(n)) => n.as_f64(),
            Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
            Some(_) => None,
        };

        match parsed.filter(|n| n.is_finite()) {
            None => {
                self.fail(format!("\"{key}\" must be a number"));
                None
            }
            Some(n) if n < min => {
                self.fail(format!("\"{key}\" must be greater than or equal to {min}"));
                None
            }
            Some(n) => Some(n),
        }
    }

    fn optional_date(&mut self, key: &str) -> Option<DateTime<Utc>> {
        let value = self.body.get(key)?;
        let parsed = match value {
            Value::String(s) => parse_date(s.trim()),
            Value::Number(n) => n
                .as_i64()
                .and_then(DateTime::<Utc>::from_timestamp_millis),
            _ => None,
        };
        if parsed.is_none() {
            self.fail(format!("\"{key}\" must be a valid date"));
        }
        parsed
    }

    fn finish<T>(self, value: impl FnOnce() -> Option<T>) -> Result<T, ValidationError> {
        if !self.errors.is_empty() {
            return Err(ValidationError(self.errors));
        }
        value().ok_or_else(|| ValidationError(vec!["invalid request body".to_string()]))
    }
}

/// Accepts RFC 3339 timestamps, zone-less timestamps (read as UTC) and plain dates.
fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Validates a `POST /api/topics` body.
pub fn validate_topic(body: &Value) -> Result<NewTopic, ValidationError> {
    let mut fields = Fields::new(body, &["title", "category", "goal"])?;
    let title = fields.string("title", true, 3);
    let category = fields.string("category", true, 2);
    let goal = fields.string("goal", false, 0).filter(|g| !g.is_empty());

    fields.finish(|| {
        Some(NewTopic {
            title: title?,
            category: category?,
            goal,
        })
    })
}

/// Validates a `POST /api/sessions` body. The topic id is only checked for shape.
pub fn validate_session(body: &Value) -> Result<NewSession, ValidationError> {
    let mut fields = Fields::new(body, &["topicId", "duration", "notes", "date"])?;

    let topic_id = fields.string("topicId", true, 1);
    let topic_id = match topic_id {
        Some(raw) => match Uuid::parse_str(&raw) {
            Ok(id) => Some(id),
            Err(_) => {
                fields.fail("\"topicId\" must be a valid id".to_string());
                None
            }
        },
        None => None,
    };
    let duration = fields.number("duration", 1.0);
    let notes = fields.string("notes", true, 5);
    let date = fields.optional_date("date");

    fields.finish(|| {
        Some(NewSession {
            topic_id: topic_id?,
            date: date.unwrap_or_else(Utc::now),
            duration: duration?,
            notes: notes?,
        })
    })
}

/// Reads the planner's weekly hours the lenient way browsers send them: numbers or
/// strings with a leading integer. Anything else, including zero, means the default.
pub fn coerce_hours(value: Option<&Value>) -> u32 {
    let hours = match value {
        Some(Value::Number(n)) => n.as_f64().map(f64::trunc),
        Some(Value::String(s)) => leading_integer(s),
        _ => None,
    };

    match hours {
        Some(h) if h >= 1.0 => h.min(f64::from(u32::MAX)) as u32,
        _ => DEFAULT_HOURS_PER_WEEK,
    }
}

fn leading_integer(raw: &str) -> Option<f64> {
    let trimmed = raw.trim_start();
    let (sign, digits) = match trimmed.strip_prefix('-') {
        Some(rest) => (-1.0, rest),
        None => (1.0, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    digits[..end].parse::<f64>().ok().map(|n| sign * n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn topic_with_valid_fields_is_trimmed() {
        let topic = validate_topic(&json!({
            "title": "  Graph Theory ",
            "category": "CS",
            "goal": "Master BFS"
        }))
        .unwrap();
        assert_eq!(topic.title, "Graph Theory");
        assert_eq!(topic.category, "CS");
        assert_eq!(topic.goal.as_deref(), Some("Master BFS"));
    }

    #[test]
    fn length_counts_surrounding_whitespace_but_storage_is_trimmed() {
        let topic = validate_topic(&json!({"title": "  ab ", "category": " x"})).unwrap();
        assert_eq!(topic.title, "ab");
        assert_eq!(topic.category, "x");
    }

    #[test]
    fn whitespace_only_title_is_empty() {
        let err = validate_topic(&json!({"title": "     ", "category": "Math"})).unwrap_err();
        assert_eq!(err.0, vec!["\"title\" is not allowed to be empty"]);
    }

    #[test]
    fn topic_empty_goal_is_dropped() {
        let topic = validate_topic(&json!({"title": "Calculus", "category": "Math", "goal": ""}))
            .unwrap();
        assert_eq!(topic.goal, None);
    }

    #[test]
    fn topic_reports_every_failure() {
        let err = validate_topic(&json!({"title": "ab", "category": "x", "extra": 1})).unwrap_err();
        assert_eq!(
            err.to_string(),
            "\"extra\" is not allowed,\
             \"title\" length must be at least 3 characters long,\
             \"category\" length must be at least 2 characters long"
        );
    }

    #[test]
    fn topic_missing_fields_are_required() {
        let err = validate_topic(&json!({})).unwrap_err();
        assert_eq!(err.0, vec!["\"title\" is required", "\"category\" is required"]);
    }

    #[test]
    fn non_object_body_is_rejected() {
        let err = validate_topic(&json!(["title"])).unwrap_err();
        assert_eq!(err.0, vec!["\"value\" must be of type object"]);
    }

    #[test]
    fn session_accepts_numeric_string_duration_and_plain_date() {
        let topic_id = Uuid::new_v4();
        let session = validate_session(&json!({
            "topicId": topic_id.to_string(),
            "duration": "45",
            "notes": "Read chapter 3",
            "date": "2024-03-01"
        }))
        .unwrap();
        assert_eq!(session.topic_id, topic_id);
        assert_eq!(session.duration, 45.0);
        assert_eq!(session.date, Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn session_date_defaults_to_now() {
        let before = Utc::now();
        let session = validate_session(&json!({
            "topicId": Uuid::new_v4().to_string(),
            "duration": 30,
            "notes": "Practice problems"
        }))
        .unwrap();
        assert!(session.date >= before);
    }

    #[test]
    fn session_rejects_short_notes_and_small_duration() {
        let err = validate_session(&json!({
            "topicId": Uuid::new_v4().to_string(),
            "duration": 0,
            "notes": "abc"
        }))
        .unwrap_err();
        assert_eq!(
            err.0,
            vec![
                "\"duration\" must be greater than or equal to 1",
                "\"notes\" length must be at least 5 characters long"
            ]
        );
    }

    #[test]
    fn session_rejects_malformed_topic_id_and_date() {
        let err = validate_session(&json!({
            "topicId": "not-an-id",
            "duration": "soon",
            "notes": "Long enough",
            "date": "yesterday"
        }))
        .unwrap_err();
        assert_eq!(
            err.0,
            vec![
                "\"topicId\" must be a valid id",
                "\"duration\" must be a number",
                "\"date\" must be a valid date"
            ]
        );
    }

    #[test]
    fn session_date_accepts_epoch_millis() {
        let session = validate_session(&json!({
            "topicId": Uuid::new_v4().to_string(),
            "duration": 20,
            "notes": "Flashcards",
            "date": 1_700_000_000_000i64
        }))
        .unwrap();
        assert_eq!(session.date.timestamp(), 1_700_000_000);
    }

    #[test]
    fn hours_coercion() {
        assert_eq!(coerce_hours(None), 10);
        assert_eq!(coerce_hours(Some(&json!(12))), 12);
        assert_eq!(coerce_hours(Some(&json!(7.9))), 7);
        assert_eq!(coerce_hours(Some(&json!("15"))), 15);
        assert_eq!(coerce_hours(Some(&json!(" 8 hours"))), 8);
        assert_eq!(coerce_hours(Some(&json!("lots"))), 10);
        assert_eq!(coerce_hours(Some(&json!("0"))), 10);
        assert_eq!(coerce_hours(Some(&json!(-3))), 10);
        assert_eq!(coerce_hours(Some(&json!(null))), 10);
    }
}
