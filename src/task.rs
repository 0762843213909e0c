//! Task records and their status lifecycle.
//!
//! A [`Task`] is the fixed-shape record kept in the store. All lenient
//! handling of stored data (missing timestamps, unknown statuses, ids written
//! as strings) lives in [`decode_record`]; business code only ever sees fully
//! formed records.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::error::{Error, Result};

/// Default upper bound on description length, in characters
pub const DEFAULT_MAX_DESCRIPTION_LEN: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Todo,
    InProgress,
    Done,
}

/// Allowed status transitions. Anything not listed here is rejected.
const TRANSITIONS: [(Status, &[Status]); 3] = [
    (Status::Todo, &[Status::InProgress, Status::Done]),
    (Status::InProgress, &[Status::Done, Status::Todo]),
    (Status::Done, &[Status::Todo]),
];

impl Status {
    pub const ALL: [Status; 3] = [Status::Todo, Status::InProgress, Status::Done];

    pub fn as_str(self) -> &'static str {
        match self {
            Status::Todo => "todo",
            Status::InProgress => "in_progress",
            Status::Done => "done",
        }
    }

    /// Statuses this one may move to
    pub fn allowed_next(self) -> &'static [Status] {
        TRANSITIONS
            .iter()
            .find(|(from, _)| *from == self)
            .map(|(_, next)| *next)
            .unwrap_or(&[])
    }

    pub fn can_transition_to(self, next: Status) -> bool {
        self.allowed_next().contains(&next)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a status name is not recognized
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown task status: {0}")]
pub struct ParseStatusError(pub String);

impl FromStr for Status {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "todo" => Ok(Status::Todo),
            // Older stores used the hyphenated spelling.
            "in_progress" | "in-progress" => Ok(Status::InProgress),
            "done" => Ok(Status::Done),
            other => Err(ParseStatusError(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Task {
    pub id: u64,
    pub description: String,
    pub status: Status,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Create a new `todo` task. `description` must already be validated.
    pub fn new(id: u64, description: String, now: DateTime<Utc>) -> Self {
        Self {
            id,
            description,
            status: Status::Todo,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn set_description(&mut self, description: String, now: DateTime<Utc>) {
        self.description = description;
        self.touch(now);
    }

    /// Move the task to `next`.
    ///
    /// Returns `Ok(false)` without touching the task when it already has
    /// that status.
    pub fn transition_to(&mut self, next: Status, now: DateTime<Utc>) -> Result<bool> {
        if self.status == next {
            return Ok(false);
        }
        if !self.status.can_transition_to(next) {
            return Err(Error::InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        self.touch(now);
        Ok(true)
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now.max(self.created_at);
    }
}

/// Display order: status name, then id.
pub fn sort_tasks(tasks: &mut [Task]) {
    tasks.sort_by(compare_for_display);
}

fn compare_for_display(left: &Task, right: &Task) -> Ordering {
    left.status
        .as_str()
        .cmp(right.status.as_str())
        .then_with(|| left.id.cmp(&right.id))
}

/// Trim and bound-check a description.
pub fn validate_description(raw: &str, max_len: usize) -> Result<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(Error::Validation("description cannot be empty".to_string()));
    }
    let len = trimmed.chars().count();
    if len > max_len {
        return Err(Error::Validation(format!(
            "description is {len} characters, limit is {max_len}"
        )));
    }
    Ok(trimmed.to_string())
}

// =========================================================================
// Record encoding
// =========================================================================

/// Why a single stored record could not be decoded
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RecordError {
    #[error("record is not an object")]
    NotAnObject,

    #[error("record has no id")]
    MissingId,

    #[error("invalid id: {0}")]
    InvalidId(String),
}

pub fn encode_record(task: &Task) -> Value {
    serde_json::json!({
        "id": task.id,
        "description": task.description,
        "status": task.status.as_str(),
        "created_at": task.created_at.to_rfc3339(),
        "updated_at": task.updated_at.to_rfc3339(),
    })
}

/// Decode one stored record.
///
/// Fails only when the record is not an object or its id is missing or not
/// a positive integer. Any description is kept as text so the task can still
/// be edited. Timestamps and status fall back to defaults; `now` is used
/// when `created_at` is absent.
pub fn decode_record(value: &Value, now: DateTime<Utc>) -> std::result::Result<Task, RecordError> {
    let obj = value.as_object().ok_or(RecordError::NotAnObject)?;

    let id = decode_id(obj)?;
    let description = decode_description(obj);
    let status = obj
        .get("status")
        .and_then(Value::as_str)
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(Status::Todo);

    let created_at = decode_timestamp(obj, &["created_at", "createdAt"]).unwrap_or(now);
    let updated_at = decode_timestamp(obj, &["updated_at", "updatedAt"])
        .unwrap_or(created_at)
        .max(created_at);

    Ok(Task {
        id,
        description,
        status,
        created_at,
        updated_at,
    })
}

fn decode_id(obj: &Map<String, Value>) -> std::result::Result<u64, RecordError> {
    let raw = obj.get("id").ok_or(RecordError::MissingId)?;
    let id = match raw {
        Value::Number(n) => n.as_u64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && *f >= 1.0 && *f <= u64::MAX as f64)
                .map(|f| f as u64)
        }),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        Value::Null => return Err(RecordError::MissingId),
        _ => None,
    };
    match id {
        Some(id) if id >= 1 => Ok(id),
        _ => Err(RecordError::InvalidId(raw.to_string())),
    }
}

/// Missing reads as empty; anything that is not a string keeps its JSON text.
fn decode_description(obj: &Map<String, Value>) -> String {
    match obj.get("description") {
        None => String::new(),
        Some(Value::String(s)) => s.trim().to_string(),
        Some(other) => other.to_string(),
    }
}

/// First parseable timestamp among `fields`. Naive timestamps (no offset,
/// as written by the first version of the tool) are taken as UTC.
fn decode_timestamp(obj: &Map<String, Value>, fields: &[&str]) -> Option<DateTime<Utc>> {
    fields
        .iter()
        .filter_map(|field| obj.get(*field)?.as_str())
        .find_map(|raw| parse_timestamp(raw.trim()))
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn transition_table_matches_lifecycle() {
        assert!(Status::Todo.can_transition_to(Status::InProgress));
        assert!(Status::Todo.can_transition_to(Status::Done));
        assert!(Status::InProgress.can_transition_to(Status::Done));
        assert!(Status::InProgress.can_transition_to(Status::Todo));
        assert!(Status::Done.can_transition_to(Status::Todo));
        assert!(!Status::Done.can_transition_to(Status::InProgress));
        for status in Status::ALL {
            assert!(!status.can_transition_to(status));
        }
    }

    #[test]
    fn status_parses_legacy_spelling() {
        assert_eq!("in-progress".parse::<Status>(), Ok(Status::InProgress));
        assert_eq!(" DONE ".parse::<Status>(), Ok(Status::Done));
        assert!("blocked".parse::<Status>().is_err());
    }

    #[test]
    fn transition_same_status_is_noop() {
        let mut task = Task::new(1, "a".to_string(), ts(0));
        let changed = task.transition_to(Status::Todo, ts(10)).unwrap();
        assert!(!changed);
        assert_eq!(task.updated_at, ts(0));
    }

    #[test]
    fn illegal_transition_leaves_task_unchanged() {
        let mut task = Task::new(1, "a".to_string(), ts(0));
        task.transition_to(Status::Done, ts(5)).unwrap();
        let before = task.clone();

        let err = task.transition_to(Status::InProgress, ts(10)).unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidTransition {
                from: Status::Done,
                to: Status::InProgress
            }
        ));
        assert_eq!(task, before);
    }

    #[test]
    fn updated_at_never_precedes_created_at() {
        let mut task = Task::new(1, "a".to_string(), ts(100));
        task.set_description("b".to_string(), ts(0));
        assert_eq!(task.updated_at, ts(100));
    }

    #[test]
    fn validate_description_trims_and_bounds() {
        assert_eq!(validate_description("  hi  ", 10).unwrap(), "hi");
        assert!(matches!(
            validate_description("   ", 10),
            Err(Error::Validation(_))
        ));
        assert!(validate_description(&"x".repeat(10), 10).is_ok());
        assert!(matches!(
            validate_description(&"x".repeat(11), 10),
            Err(Error::Validation(_))
        ));
        // Limit counts characters, not bytes.
        assert!(validate_description(&"é".repeat(10), 10).is_ok());
    }

    #[test]
    fn decode_defaults_missing_fields() {
        let value = serde_json::json!({ "id": 3, "description": "  walk dog " });
        let task = decode_record(&value, ts(42)).unwrap();
        assert_eq!(task.id, 3);
        assert_eq!(task.description, "walk dog");
        assert_eq!(task.status, Status::Todo);
        assert_eq!(task.created_at, ts(42));
        assert_eq!(task.updated_at, ts(42));
    }

    #[test]
    fn decode_coerces_unknown_status_and_string_id() {
        let value = serde_json::json!({
            "id": "7",
            "description": "x",
            "status": "archived",
            "created_at": ts(0).to_rfc3339(),
        });
        let task = decode_record(&value, ts(99)).unwrap();
        assert_eq!(task.id, 7);
        assert_eq!(task.status, Status::Todo);
        assert_eq!(task.updated_at, task.created_at);
    }

    #[test]
    fn decode_reads_legacy_camel_case_naive_timestamps() {
        let value = serde_json::json!({
            "id": 2,
            "description": "old",
            "status": "in-progress",
            "createdAt": "2024-03-01T10:15:30.123456",
            "updatedAt": "2024-03-02T08:00:00",
        });
        let task = decode_record(&value, ts(0)).unwrap();
        assert_eq!(task.status, Status::InProgress);
        assert_eq!(
            task.created_at,
            Utc.with_ymd_and_hms(2024, 3, 1, 10, 15, 30).unwrap()
                + Duration::microseconds(123_456)
        );
        assert_eq!(
            task.updated_at,
            Utc.with_ymd_and_hms(2024, 3, 2, 8, 0, 0).unwrap()
        );
    }

    #[test]
    fn decode_clamps_updated_before_created() {
        let value = serde_json::json!({
            "id": 1,
            "description": "x",
            "created_at": ts(50).to_rfc3339(),
            "updated_at": (ts(50) - Duration::seconds(30)).to_rfc3339(),
        });
        let task = decode_record(&value, ts(99)).unwrap();
        assert_eq!(task.updated_at, ts(50));
    }

    #[test]
    fn decode_rejects_bad_id() {
        let now = ts(0);
        assert_eq!(
            decode_record(&serde_json::json!({ "description": "x" }), now),
            Err(RecordError::MissingId)
        );
        assert!(matches!(
            decode_record(&serde_json::json!({ "id": "abc", "description": "x" }), now),
            Err(RecordError::InvalidId(_))
        ));
        assert!(matches!(
            decode_record(&serde_json::json!({ "id": 0, "description": "x" }), now),
            Err(RecordError::InvalidId(_))
        ));
        assert_eq!(
            decode_record(&serde_json::json!([1, 2]), now),
            Err(RecordError::NotAnObject)
        );
    }

    #[test]
    fn decode_keeps_any_description_as_text() {
        let now = ts(0);
        let describe = |value: serde_json::Value| decode_record(&value, now).unwrap().description;

        assert_eq!(describe(serde_json::json!({ "id": 1 })), "");
        assert_eq!(describe(serde_json::json!({ "id": 1, "description": null })), "null");
        assert_eq!(describe(serde_json::json!({ "id": 1, "description": [1, 2] })), "[1,2]");
        assert_eq!(
            describe(serde_json::json!({ "id": 1, "description": { "a": true } })),
            r#"{"a":true}"#
        );
        assert_eq!(describe(serde_json::json!({ "id": 1, "description": 42 })), "42");
        assert_eq!(describe(serde_json::json!({ "id": 1, "description": false })), "false");
    }

    #[test]
    fn encode_then_decode_preserves_task() {
        let mut task = Task::new(9, "ship it".to_string(), ts(0));
        task.transition_to(Status::InProgress, ts(30)).unwrap();
        let decoded = decode_record(&encode_record(&task), ts(1000)).unwrap();
        assert_eq!(decoded, task);
    }

    #[test]
    fn sort_orders_by_status_name_then_id() {
        let mut tasks = vec![
            Task::new(3, "c".to_string(), ts(0)),
            Task::new(1, "a".to_string(), ts(0)),
            Task::new(2, "b".to_string(), ts(0)),
        ];
        tasks[2].transition_to(Status::Done, ts(1)).unwrap();
        sort_tasks(&mut tasks);
        let ids: Vec<u64> = tasks.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![2, 1, 3]);
    }
}
