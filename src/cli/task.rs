//! Task command implementations.

use serde::Serialize;

use crate::cli::Context;
use crate::error::{Error, Result};
use crate::output::{emit_success, format_task_table, HumanOutput};
use crate::task::{Status, Task};

#[derive(Serialize)]
struct TaskListOutput<'a> {
    total: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<Status>,
    tasks: &'a [Task],
}

#[derive(Serialize)]
struct DryRunOutput<'a> {
    dry_run: bool,
    action: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<Status>,
}

pub(crate) fn run_list(ctx: &Context, status: Option<Status>) -> Result<()> {
    let (tasks, report) = ctx.store.list_with_report(status)?;

    let output = TaskListOutput {
        total: tasks.len(),
        status,
        tasks: &tasks,
    };
    let mut human = HumanOutput::new(format_task_table(&tasks));
    if report.reset {
        human.push_warning("store could not be parsed; showing it as empty");
    }
    if report.skipped > 0 {
        human.push_warning(format!(
            "{} malformed record(s) ignored",
            report.skipped
        ));
    }
    emit_success(ctx.output, "list", &output, Some(&human))
}

pub(crate) fn run_add(ctx: &Context, description: &str) -> Result<()> {
    if ctx.dry_run {
        let human = HumanOutput::new(format!("[dry-run] would add: {description}"));
        let output = DryRunOutput {
            dry_run: true,
            action: "add",
            id: None,
            description: Some(description),
            status: None,
        };
        return emit_success(ctx.output, "add", &output, Some(&human));
    }

    let task = ctx.store.add(description)?;
    let human = HumanOutput::new(format!("Added task (ID: {})", task.id));
    emit_success(ctx.output, "add", &task, Some(&human))
}

pub(crate) fn run_update(ctx: &Context, id: u64, description: &str) -> Result<()> {
    if ctx.dry_run {
        ctx.store.get(id)?;
        let human = HumanOutput::new(format!("[dry-run] would update {id} -> {description}"));
        let output = DryRunOutput {
            dry_run: true,
            action: "update",
            id: Some(id),
            description: Some(description),
            status: None,
        };
        return emit_success(ctx.output, "update", &output, Some(&human));
    }

    let task = ctx.store.update(id, description)?;
    let human = HumanOutput::new(format!("Updated task {}", task.id));
    emit_success(ctx.output, "update", &task, Some(&human))
}

pub(crate) fn run_delete(ctx: &Context, id: u64) -> Result<()> {
    if ctx.dry_run {
        ctx.store.get(id)?;
        let human = HumanOutput::new(format!("[dry-run] would delete {id}"));
        let output = DryRunOutput {
            dry_run: true,
            action: "delete",
            id: Some(id),
            description: None,
            status: None,
        };
        return emit_success(ctx.output, "delete", &output, Some(&human));
    }

    let task = ctx.store.delete(id)?;
    let human = HumanOutput::new(format!("Deleted task {}", task.id));
    emit_success(ctx.output, "delete", &task, Some(&human))
}

pub(crate) fn run_status(ctx: &Context, id: u64, status: Status) -> Result<()> {
    let command = status_command(status);
    if ctx.dry_run {
        // Same checks the real change would make, without taking the lock
        let current = ctx.store.get(id)?.status;
        if current != status && !current.can_transition_to(status) {
            return Err(Error::InvalidTransition {
                from: current,
                to: status,
            });
        }
        let human = HumanOutput::new(format!("[dry-run] would mark {id} {}", status_label(status)));
        let output = DryRunOutput {
            dry_run: true,
            action: command,
            id: Some(id),
            description: None,
            status: Some(status),
        };
        return emit_success(ctx.output, command, &output, Some(&human));
    }

    let task = ctx.store.change_status(id, status)?;
    let human = HumanOutput::new(format!("Task {} marked {}", task.id, status_label(status)));
    emit_success(ctx.output, command, &task, Some(&human))
}

fn status_command(status: Status) -> &'static str {
    match status {
        Status::Todo => "todo",
        Status::InProgress => "start",
        Status::Done => "done",
    }
}

fn status_label(status: Status) -> &'static str {
    match status {
        Status::Todo => "todo",
        Status::InProgress => "in progress",
        Status::Done => "done",
    }
}
