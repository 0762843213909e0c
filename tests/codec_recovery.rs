use std::fs;

use task_tracker::task::Status;
use task_tracker::TaskStore;
use tempfile::TempDir;

#[test]
fn malformed_records_are_skipped_and_dropped_on_next_write() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    let path = dir.path().join("tasks.json");
    fs::write(
        &path,
        r#"{
  "version": 1,
  "tasks": [
    {"id": 1, "description": "good", "status": "done",
     "created_at": "2024-05-01T12:00:00+00:00", "updated_at": "2024-05-02T12:00:00+00:00"},
    {"id": "not a number", "description": "bad id"},
    {"id": 5, "description": "unknown status", "status": "blocked"},
    "not even an object"
  ]
}"#,
    )?;

    let store = TaskStore::open(&path)?;
    let loaded = store.load()?;
    assert_eq!(loaded.report.skipped, 2);
    assert!(!loaded.report.reset);

    let tasks = store.list(None)?;
    assert_eq!(tasks.len(), 2);
    assert_eq!(tasks[0].id, 1);
    assert_eq!(tasks[0].status, Status::Done);
    assert_eq!(tasks[1].id, 5);
    assert_eq!(tasks[1].status, Status::Todo);

    // max(existing) + 1, ignoring the skipped record
    assert_eq!(store.add("next")?.id, 6);
    assert!(store.load()?.report.is_clean());
    Ok(())
}

#[test]
fn unparseable_store_reads_as_empty() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    let path = dir.path().join("tasks.json");
    fs::write(&path, "{\"version\": 1, \"tasks\": [{\"id\": 1,")?;

    let store = TaskStore::open(&path)?;
    assert!(store.list(None)?.is_empty());
    assert!(store.load()?.report.reset);
    Ok(())
}

#[test]
fn first_generation_store_is_upgraded_on_write() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    let path = dir.path().join("tasks.json");
    fs::write(
        &path,
        r#"[
    {"id": 1, "description": "legacy", "status": "in-progress",
     "createdAt": "2024-01-01T09:00:00.000001", "updatedAt": "2024-01-01T10:00:00"}
]"#,
    )?;

    let store = TaskStore::open(&path)?;
    let loaded = store.load()?;
    assert_eq!(loaded.version, 0);
    assert!(loaded.report.version_mismatch);
    assert_eq!(loaded.tasks[0].status, Status::InProgress);

    store.change_status(1, Status::Done)?;
    let text = fs::read_to_string(&path)?;
    assert!(text.starts_with("{\n  \"version\": 1,"));
    assert!(text.contains("\"created_at\": \"2024-01-01T09:00:00.000001+00:00\""));
    assert!(!text.contains("createdAt"));
    assert!(store.load()?.report.is_clean());
    Ok(())
}

#[test]
fn persisted_file_has_expected_shape() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    let store = TaskStore::open(dir.path().join("tasks.json"))?;
    store.add("Buy milk")?;

    let value: serde_json::Value = serde_json::from_slice(&fs::read(store.path())?)?;
    assert_eq!(value["version"], 1);
    let task = &value["tasks"][0];
    assert_eq!(task["id"], 1);
    assert_eq!(task["description"], "Buy milk");
    assert_eq!(task["status"], "todo");
    assert!(task["created_at"].is_string());
    assert_eq!(task["created_at"], task["updated_at"]);
    Ok(())
}

#[test]
fn records_with_odd_descriptions_survive_later_writes() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    let path = dir.path().join("tasks.json");
    fs::write(
        &path,
        r#"[
    {"id": 1, "status": "done"},
    {"id": 2, "description": null},
    {"id": 3, "description": ["a", "b"]}
]"#,
    )?;

    let store = TaskStore::open(&path)?;
    let tasks = store.list(None)?;
    assert_eq!(tasks.len(), 3);
    assert!(store.load()?.report.skipped == 0);

    assert_eq!(store.add("new")?.id, 4);

    let tasks = store.list(None)?;
    let described: Vec<(u64, &str)> = tasks
        .iter()
        .map(|t| (t.id, t.description.as_str()))
        .collect();
    assert_eq!(
        described,
        vec![(1, ""), (2, "null"), (3, r#"["a","b"]"#), (4, "new")]
    );

    // An empty description stays editable
    let fixed = store.update(1, "named at last")?;
    assert_eq!(fixed.status, Status::Done);
    assert_eq!(fixed.description, "named at last");
    Ok(())
}
