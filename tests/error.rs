use std::path::PathBuf;

use task_tracker::error::{exit_codes, Error, JsonError};
use task_tracker::task::Status;

#[test]
fn exit_codes_map_correctly() {
    let validation = Error::Validation("empty".to_string());
    assert_eq!(validation.exit_code(), exit_codes::REJECTED);

    let transition = Error::InvalidTransition {
        from: Status::Done,
        to: Status::InProgress,
    };
    assert_eq!(transition.exit_code(), exit_codes::REJECTED);

    assert_eq!(Error::TaskNotFound(3).exit_code(), exit_codes::NOT_FOUND);

    let timeout = Error::LockTimeout {
        path: PathBuf::from("tasks.json.lock"),
        waited_ms: 5000,
    };
    assert_eq!(timeout.exit_code(), exit_codes::STORE_ERROR);

    let io = Error::Io(std::io::Error::new(std::io::ErrorKind::Other, "disk full"));
    assert_eq!(io.exit_code(), exit_codes::STORE_ERROR);
}

#[test]
fn only_lock_timeout_is_retryable() {
    let timeout = Error::LockTimeout {
        path: PathBuf::from("x.lock"),
        waited_ms: 1,
    };
    assert!(timeout.is_retryable());
    assert!(!Error::TaskNotFound(1).is_retryable());
    assert!(!Error::Validation("x".to_string()).is_retryable());
}

#[test]
fn json_error_includes_code_kind_and_details() {
    let err = Error::InvalidTransition {
        from: Status::Done,
        to: Status::InProgress,
    };
    let json = JsonError::from(&err);
    assert_eq!(json.code, exit_codes::REJECTED);
    assert_eq!(json.kind, "invalid_transition");
    assert_eq!(json.error, "Invalid state transition: done -> in_progress");

    let details = json.details.expect("details");
    assert_eq!(details["from"], "done");
    assert_eq!(details["to"], "in_progress");
}

#[test]
fn not_found_message_names_id() {
    let err = Error::TaskNotFound(42);
    assert_eq!(err.to_string(), "Task with ID 42 not found");
    assert_eq!(JsonError::from(&err).kind, "not_found");
}
