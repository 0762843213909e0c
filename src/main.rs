//! task-tracker CLI
//!
//! Manages a list of tasks kept in a local JSON file. Concurrent invocations
//! are serialized by a lock file and every write is atomic.

use std::fs::{File, OpenOptions};
use std::sync::Mutex;

use clap::Parser;
use task_tracker::cli::Cli;
use task_tracker::config::LOG_FILE_ENV;
use task_tracker::output::{emit_error, infer_command_name_from_args};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn main() {
    let command = infer_command_name_from_args();
    let cli = Cli::parse();

    // RUST_LOG wins when set. Otherwise only warnings (store recovery) are
    // shown, or debug detail with --verbose.
    // Keep startup robust in CI/robot envs: ignore invalid/huge filters.
    let default_filter = if cli.verbose {
        "task_tracker=debug"
    } else {
        "task_tracker=warn"
    };
    let filter = std::env::var("RUST_LOG")
        .ok()
        .and_then(|raw| {
            let raw = raw.trim();
            if raw.is_empty() || raw.len() > 4096 {
                return None;
            }
            EnvFilter::try_new(raw).ok()
        })
        .unwrap_or_else(|| EnvFilter::new(default_filter));

    // Optional copy of the log in a file, appended across runs
    let file_layer = open_log_file().map(|file| {
        fmt::layer()
            .with_ansi(false)
            .with_writer(Mutex::new(file))
    });

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    let json = cli.json;
    if let Err(err) = cli.run() {
        let _ = emit_error(&command, &err, json);
        std::process::exit(err.exit_code());
    }
}

fn open_log_file() -> Option<File> {
    let path = std::env::var_os(LOG_FILE_ENV).filter(|p| !p.is_empty())?;
    match OpenOptions::new().create(true).append(true).open(&path) {
        Ok(file) => Some(file),
        Err(err) => {
            eprintln!(
                "warning: cannot open log file {}: {err}",
                std::path::Path::new(&path).display()
            );
            None
        }
    }
}
