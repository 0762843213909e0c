//! Command-line interface for task-tracker
//!
//! This module defines the CLI structure using clap derive macros. Command
//! handlers live in submodules and talk to the store only through
//! [`TaskStore`](crate::storage::TaskStore) operations.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::Config;
use crate::error::Result;
use crate::output::OutputOptions;
use crate::storage::TaskStore;
use crate::task::Status;

mod task;

/// task-tracker - a small task list kept in a JSON file
///
/// Every change is made under a lock file and written atomically, so
/// several invocations can safely work on the same store at once.
#[derive(Parser, Debug)]
#[command(name = "task-tracker")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the tasks store
    #[arg(long, global = true, env = "TASKS_FILE")]
    pub store: Option<PathBuf>,

    /// Configuration file (defaults to ./.task-tracker.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Show what would change without writing anything
    #[arg(long, global = true)]
    pub dry_run: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List tasks (the default command)
    List {
        /// Only show tasks with this status: todo, in_progress, done
        #[arg(long)]
        status: Option<Status>,
    },

    /// List todo tasks
    ListTodo,

    /// List in-progress tasks
    ListProgress,

    /// List done tasks
    ListDone,

    /// Add a new task
    Add {
        /// Task description
        #[arg(required = true, num_args = 1..)]
        description: Vec<String>,
    },

    /// Update a task's description
    Update {
        /// Task ID
        id: u64,

        /// New description
        #[arg(required = true, num_args = 1..)]
        description: Vec<String>,
    },

    /// Delete a task
    Delete {
        /// Task ID
        id: u64,
    },

    /// Mark a task in progress
    Start {
        /// Task ID
        id: u64,
    },

    /// Mark a task done
    Done {
        /// Task ID
        id: u64,
    },

    /// Mark a task todo (reopen)
    Todo {
        /// Task ID
        id: u64,
    },

    /// Run a quick check of the store and status lifecycle
    SelfTest,
}

/// What every command handler needs
pub(crate) struct Context {
    pub store: TaskStore,
    pub output: OutputOptions,
    pub dry_run: bool,
}

impl Cli {
    /// Resolve configuration: config file, then environment, then flags.
    pub fn resolve_config(&self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)?,
            None => Config::load_from_dir(&std::env::current_dir()?),
        };
        config.apply_env()?;
        if let Some(store) = &self.store {
            config.store_path = store.clone();
        }
        config.validate()?;
        Ok(config)
    }

    /// Execute the CLI command
    pub fn run(self) -> Result<()> {
        let config = self.resolve_config()?;
        let ctx = Context {
            store: TaskStore::with_config(&config)?,
            output: OutputOptions {
                json: self.json,
                quiet: self.quiet,
            },
            dry_run: self.dry_run,
        };

        match self.command.unwrap_or(Commands::List { status: None }) {
            Commands::List { status } => task::run_list(&ctx, status),
            Commands::ListTodo => task::run_list(&ctx, Some(Status::Todo)),
            Commands::ListProgress => task::run_list(&ctx, Some(Status::InProgress)),
            Commands::ListDone => task::run_list(&ctx, Some(Status::Done)),
            Commands::Add { description } => task::run_add(&ctx, &description.join(" ")),
            Commands::Update { id, description } => {
                task::run_update(&ctx, id, &description.join(" "))
            }
            Commands::Delete { id } => task::run_delete(&ctx, id),
            Commands::Start { id } => task::run_status(&ctx, id, Status::InProgress),
            Commands::Done { id } => task::run_status(&ctx, id, Status::Done),
            Commands::Todo { id } => task::run_status(&ctx, id, Status::Todo),
            Commands::SelfTest => self_test::run(&ctx),
        }
    }
}
