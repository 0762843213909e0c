//! Shared output formatting for task-tracker CLI commands.

use chrono::{DateTime, Local, Utc};
use serde::Serialize;

use crate::error::{Error, Result};
use crate::task::Task;

pub const SCHEMA_VERSION: &str = "task-tracker.v1";

/// Global flags that consume the next argument
const VALUE_FLAGS: [&str; 2] = ["--store", "--config"];

#[derive(Debug, Clone, Copy)]
pub struct OutputOptions {
    pub json: bool,
    pub quiet: bool,
}

#[derive(Debug, Clone)]
pub struct HumanOutput {
    header: String,
    details: Vec<String>,
    warnings: Vec<String>,
}

impl HumanOutput {
    pub fn new(header: impl Into<String>) -> Self {
        Self {
            header: header.into(),
            details: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn push_detail(&mut self, value: impl Into<String>) {
        self.details.push(value.into());
    }

    pub fn push_warning(&mut self, value: impl Into<String>) {
        self.warnings.push(value.into());
    }
}

pub fn emit_success<T: Serialize>(
    options: OutputOptions,
    command: &str,
    data: &T,
    human: Option<&HumanOutput>,
) -> Result<()> {
    if options.json {
        let warnings = human.map(|h| h.warnings.clone()).unwrap_or_default();

        #[derive(Serialize)]
        struct Envelope<'a, T: Serialize> {
            schema_version: &'static str,
            command: &'a str,
            status: &'static str,
            data: &'a T,
            #[serde(skip_serializing_if = "Vec::is_empty")]
            warnings: Vec<String>,
        }

        let payload = Envelope {
            schema_version: SCHEMA_VERSION,
            command,
            status: "success",
            data,
            warnings,
        };

        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }

    if options.quiet {
        return Ok(());
    }

    if let Some(human) = human {
        println!("{}", format_human(human));
    }

    Ok(())
}

pub fn emit_error(command: &str, err: &Error, json: bool) -> Result<()> {
    let hint = error_hint(err);
    if json {
        #[derive(Serialize)]
        struct Envelope<'a> {
            schema_version: &'static str,
            command: &'a str,
            status: &'static str,
            error: crate::error::JsonError,
            #[serde(skip_serializing_if = "Option::is_none")]
            hint: Option<String>,
        }

        let payload = Envelope {
            schema_version: SCHEMA_VERSION,
            command,
            status: "error",
            error: err.into(),
            hint,
        };

        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }

    eprintln!("error: {err}");
    if let Some(hint) = hint {
        eprintln!("hint: {hint}");
    }
    Ok(())
}

pub fn format_human(output: &HumanOutput) -> String {
    let mut lines = Vec::new();
    lines.push(output.header.clone());

    for detail in &output.details {
        lines.push(detail.clone());
    }
    for warning in &output.warnings {
        lines.push(format!("warning: {warning}"));
    }

    lines.join("\n")
}

/// Render tasks as a fixed-width table followed by a total line.
pub fn format_task_table(tasks: &[Task]) -> String {
    if tasks.is_empty() {
        return "No tasks found".to_string();
    }

    let mut lines = Vec::with_capacity(tasks.len() + 4);
    lines.push(format!(
        "{:<6}{:<15}{:<20}{:<20} Description",
        "ID", "Status", "Created", "Updated"
    ));
    lines.push("-".repeat(90));
    for task in tasks {
        lines.push(format!(
            "{:<6}{:<15}{:<20}{:<20} {}",
            task.id,
            task.status.as_str(),
            human_time(task.created_at),
            human_time(task.updated_at),
            task.description
        ));
    }
    lines.push(String::new());
    lines.push(format!("Total: {} task(s)", tasks.len()));
    lines.join("\n")
}

/// Local wall-clock time at minute precision
pub fn human_time(ts: DateTime<Utc>) -> String {
    ts.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string()
}

pub fn infer_command_name_from_args() -> String {
    command_name_from(std::env::args().skip(1))
}

fn command_name_from(args: impl IntoIterator<Item = String>) -> String {
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        if VALUE_FLAGS.contains(&arg.as_str()) {
            args.next();
            continue;
        }
        if arg.starts_with('-') {
            continue;
        }
        return arg;
    }
    "list".to_string()
}

fn error_hint(err: &Error) -> Option<String> {
    match err {
        Error::LockTimeout { path, .. } => {
            let holder = crate::lock::StoreLock::holder(path)
                .map(|h| format!(" (held by pid {} since {})", h.pid, h.acquired_at))
                .unwrap_or_default();
            Some(format!(
                "another process is modifying the store{holder}; retry, or remove {} if that process is gone",
                path.display()
            ))
        }
        Error::InvalidTransition { from, .. } => {
            let allowed: Vec<&str> = from.allowed_next().iter().map(|s| s.as_str()).collect();
            Some(format!("from {from} a task can move to: {}", allowed.join(", ")))
        }
        Error::TaskNotFound(_) => Some("task-tracker list".to_string()),
        Error::InvalidConfig(_) => Some(format!("fix {} then retry", crate::config::CONFIG_FILE)),
        _ => None,
    }
}
