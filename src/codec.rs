//! Store container encoding.
//!
//! The store file is a single pretty-printed JSON document:
//!
//! ```text
//! {
//!   "version": 1,
//!   "tasks": [
//!     { "id": 1, "description": "...", "status": "todo",
//!       "created_at": "...", "updated_at": "..." }
//!   ]
//! }
//! ```
//!
//! Decoding never fails. An unreadable document loads as an empty store and
//! an unreadable record is skipped; both are logged and counted in the
//! [`LoadReport`].

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::task::{decode_record, encode_record, RecordError, Task};

/// Schema version written by this build
pub const STORE_VERSION: u64 = 1;

/// What happened while loading a container
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    /// The document could not be parsed and was treated as empty
    pub reset: bool,
    /// The stored version differed from [`STORE_VERSION`]
    pub version_mismatch: bool,
    /// Records dropped because they failed to decode or repeated an id
    pub skipped: usize,
}

impl LoadReport {
    pub fn is_clean(&self) -> bool {
        !self.reset && !self.version_mismatch && self.skipped == 0
    }
}

/// A fully decoded container
#[derive(Debug, Clone)]
pub struct Decoded {
    pub version: u64,
    pub tasks: Vec<Task>,
    pub report: LoadReport,
}

impl Decoded {
    pub fn empty() -> Self {
        Self {
            version: STORE_VERSION,
            tasks: Vec::new(),
            report: LoadReport::default(),
        }
    }
}

/// Container whose outer structure parsed, with per-record results
#[derive(Debug)]
pub struct RawContainer {
    pub version: u64,
    pub records: Vec<std::result::Result<Task, RecordError>>,
}

/// Parse the outer structure and decode each record independently.
///
/// Fails only when `bytes` is not JSON at all or its top level is neither
/// an object nor an array.
pub fn decode_container(bytes: &[u8], now: DateTime<Utc>) -> serde_json::Result<RawContainer> {
    let payload: Value = serde_json::from_slice(bytes)?;

    let (version, entries) = match payload {
        Value::Object(mut obj) => {
            let version = obj.get("version").and_then(Value::as_u64).unwrap_or(0);
            let entries = match obj.remove("tasks") {
                Some(Value::Array(items)) => items,
                Some(Value::Null) | None => Vec::new(),
                Some(other) => {
                    tracing::warn!(found = %type_name(&other), "store 'tasks' is not a list, ignoring it");
                    Vec::new()
                }
            };
            (version, entries)
        }
        // First-generation stores were a bare list of tasks.
        Value::Array(items) => (0, items),
        other => {
            return Err(serde::de::Error::custom(format!(
                "expected an object at top level, found {}",
                type_name(&other)
            )))
        }
    };

    let records = entries
        .iter()
        .map(|entry| decode_record(entry, now))
        .collect();

    Ok(RawContainer { version, records })
}

/// Load tasks from raw store bytes, recovering from every decode failure.
pub fn load_tasks(bytes: &[u8], now: DateTime<Utc>) -> Decoded {
    let raw = match decode_container(bytes, now) {
        Ok(raw) => raw,
        Err(err) => {
            tracing::warn!(error = %err, "store is unreadable, treating it as empty");
            let mut decoded = Decoded::empty();
            decoded.report.reset = true;
            return decoded;
        }
    };

    let mut report = LoadReport::default();
    if raw.version != STORE_VERSION {
        tracing::info!(
            found = raw.version,
            expected = STORE_VERSION,
            "store version mismatch, parsing tasks best-effort"
        );
        report.version_mismatch = true;
    }

    let mut seen = HashSet::new();
    let mut tasks = Vec::with_capacity(raw.records.len());
    for (index, record) in raw.records.into_iter().enumerate() {
        match record {
            Ok(task) if seen.insert(task.id) => tasks.push(task),
            Ok(task) => {
                tracing::warn!(index, id = task.id, "skipping task with duplicate id");
                report.skipped += 1;
            }
            Err(err) => {
                tracing::warn!(index, error = %err, "skipping invalid task in store");
                report.skipped += 1;
            }
        }
    }

    Decoded {
        version: raw.version,
        tasks,
        report,
    }
}

/// Serialize a container as pretty JSON with a trailing newline.
pub fn encode_container(version: u64, tasks: &[Task]) -> Vec<u8> {
    let payload = serde_json::json!({
        "version": version,
        "tasks": tasks.iter().map(encode_record).collect::<Vec<_>>(),
    });
    let mut out = format!("{payload:#}");
    out.push('\n');
    out.into_bytes()
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
