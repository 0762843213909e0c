//! Error types for the task tracker
//!
//! Exit codes:
//! - 0: Success
//! - 2: Store error (lock timeout, I/O, bad configuration, no ids left)
//! - 3: Task not found
//! - 4: Rejected input (validation, illegal status transition)

use std::path::PathBuf;
use thiserror::Error;

use crate::task::Status;

/// Exit codes for the task-tracker CLI
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const STORE_ERROR: i32 = 2;
    pub const NOT_FOUND: i32 = 3;
    pub const REJECTED: i32 = 4;
}

/// Main error type for store operations
#[derive(Error, Debug)]
pub enum Error {
    // Rejected input (exit code 4)
    #[error("Invalid description: {0}")]
    Validation(String),

    #[error("Invalid state transition: {from} -> {to}")]
    InvalidTransition { from: Status, to: Status },

    // Not found (exit code 3)
    #[error("Task with ID {0} not found")]
    TaskNotFound(u64),

    // Store errors (exit code 2)
    #[error("Timed out after {waited_ms}ms waiting for store lock {path}")]
    LockTimeout { path: PathBuf, waited_ms: u64 },

    #[error("No task id left after {0}")]
    IdSpaceExhausted(u64),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

impl Error {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Validation(_) | Error::InvalidTransition { .. } => exit_codes::REJECTED,

            Error::TaskNotFound(_) => exit_codes::NOT_FOUND,

            Error::LockTimeout { .. }
            | Error::IdSpaceExhausted(_)
            | Error::InvalidConfig(_)
            | Error::Io(_)
            | Error::Json(_)
            | Error::TomlParse(_) => exit_codes::STORE_ERROR,
        }
    }

    /// Short machine-readable name of the error kind
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Validation(_) => "validation",
            Error::InvalidTransition { .. } => "invalid_transition",
            Error::TaskNotFound(_) => "not_found",
            Error::LockTimeout { .. } => "lock_timeout",
            Error::IdSpaceExhausted(_) => "id_exhausted",
            Error::InvalidConfig(_) => "invalid_config",
            Error::Io(_) | Error::Json(_) | Error::TomlParse(_) => "store_error",
        }
    }

    /// Whether the caller may reasonably retry the same operation unchanged.
    ///
    /// The store never retries on its own.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::LockTimeout { .. })
    }

    /// Structured details for JSON output, when the error carries any
    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            Error::InvalidTransition { from, to } => Some(serde_json::json!({
                "from": from.as_str(),
                "to": to.as_str(),
            })),
            Error::TaskNotFound(id) => Some(serde_json::json!({ "id": id })),
            Error::LockTimeout { path, waited_ms } => Some(serde_json::json!({
                "lock_path": path.display().to_string(),
                "waited_ms": waited_ms,
            })),
            _ => None,
        }
    }
}

/// Result type alias for store operations
pub type Result<T> = std::result::Result<T, Error>;

/// Wrapper for displaying errors in JSON format
#[derive(serde::Serialize)]
pub struct JsonError {
    pub error: String,
    pub code: i32,
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl From<&Error> for JsonError {
    fn from(err: &Error) -> Self {
        JsonError {
            error: err.to_string(),
            code: err.exit_code(),
            kind: err.kind(),
            details: err.details(),
        }
    }
}
